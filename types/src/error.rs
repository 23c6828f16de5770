// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Machine readable failure kind reported next to every user facing failure message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Parse,
    NotAMember,
    DepositRequired,
    AlreadyVoted,
    ProposalClosed,
    AlreadyExecuted,
    QuorumNotReached,
    Unauthorized,
    NotFound,
    RateLimitExceeded,
    Relay,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::NotAMember => "not_a_member",
            Self::DepositRequired => "deposit_required",
            Self::AlreadyVoted => "already_voted",
            Self::ProposalClosed => "proposal_closed",
            Self::AlreadyExecuted => "already_executed",
            Self::QuorumNotReached => "quorum_not_reached",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::Relay => "relay_error",
            Self::Internal => "internal_error",
        }
    }

    /// Whether the same request may succeed later without any other change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded | Self::Relay | Self::Internal)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
