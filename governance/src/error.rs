// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;
use treasury_ledger_api::LedgerError;
use treasury_relayer::RelayError;
use treasury_types::{ErrorKind, GroupId, ProposalId, WalletAddress};

pub type GovernanceResult<T> = std::result::Result<T, GovernanceError>;

#[derive(Error, Debug)]
pub enum GovernanceError {
    #[error("{wallet} is not an active member of group {group_id}")]
    NotAMember {
        group_id: GroupId,
        wallet: WalletAddress,
    },
    #[error("{wallet} has not paid the deposit of {required} to group {group_id}")]
    DepositRequired {
        group_id: GroupId,
        wallet: WalletAddress,
        required: u128,
    },
    #[error("deposit of {offered} is below the required {required}")]
    InsufficientDeposit { required: u128, offered: u128 },
    #[error("{voter} already voted on proposal {proposal_id}")]
    AlreadyVoted {
        proposal_id: ProposalId,
        voter: WalletAddress,
    },
    #[error("proposal {proposal_id} is closed: {reason}")]
    ProposalClosed {
        proposal_id: ProposalId,
        reason: String,
    },
    #[error("proposal {0} already executed")]
    AlreadyExecuted(ProposalId),
    #[error("proposal {proposal_id} has {votes_for} of {required} required votes")]
    QuorumNotReached {
        proposal_id: ProposalId,
        votes_for: u32,
        required: u32,
    },
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("group {0} not found")]
    GroupNotFound(GroupId),
    #[error("proposal {0} not found")]
    ProposalNotFound(ProposalId),
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),
    #[error("rate limit exceeded for {key}, retry after {retry_at}")]
    RateLimitExceeded { key: String, retry_at: u64 },
    #[error("ledger rejected the call: {0}")]
    Rejected(String),
    #[error("action of proposal {proposal_id} failed after execution was recorded: {source}")]
    ActionFailed {
        proposal_id: ProposalId,
        #[source]
        source: RelayError,
    },
    #[error(transparent)]
    Relay(RelayError),
    #[error("ledger read failed: {0}")]
    Ledger(LedgerError),
    #[error("internal error: {0:?}")]
    Internal(anyhow::Error),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAMember { .. } => ErrorKind::NotAMember,
            Self::DepositRequired { .. } | Self::InsufficientDeposit { .. } => {
                ErrorKind::DepositRequired
            }
            Self::AlreadyVoted { .. } => ErrorKind::AlreadyVoted,
            Self::ProposalClosed { .. } => ErrorKind::ProposalClosed,
            Self::AlreadyExecuted(_) => ErrorKind::AlreadyExecuted,
            Self::QuorumNotReached { .. } => ErrorKind::QuorumNotReached,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::GroupNotFound(_) | Self::ProposalNotFound(_) => ErrorKind::NotFound,
            Self::InvalidProposal(_) => ErrorKind::Parse,
            Self::RateLimitExceeded { .. } => ErrorKind::RateLimitExceeded,
            Self::Rejected(_) | Self::ActionFailed { .. } | Self::Relay(_) => ErrorKind::Relay,
            Self::Ledger(LedgerError::NotFound(_)) => ErrorKind::NotFound,
            Self::Ledger(_) => ErrorKind::Relay,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to show in the group chat, internal details stay in the log.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAMember { .. } => "Only active members of this group can do that.".to_string(),
            Self::DepositRequired { .. } => {
                "You need to pay the group deposit before voting or proposing.".to_string()
            }
            Self::InsufficientDeposit { .. } => {
                "The deposit does not cover the amount the group requires.".to_string()
            }
            Self::AlreadyVoted { proposal_id, .. } => {
                format!("You already voted on proposal #{}.", proposal_id)
            }
            Self::ProposalClosed {
                proposal_id,
                reason,
            } => format!("Proposal #{} is closed ({}).", proposal_id, reason),
            Self::AlreadyExecuted(proposal_id) => {
                format!("Proposal #{} has already been executed.", proposal_id)
            }
            Self::QuorumNotReached {
                proposal_id,
                required: 0,
                ..
            } => format!("Proposal #{} has not reached its quorum yet.", proposal_id),
            Self::QuorumNotReached {
                proposal_id,
                votes_for,
                required,
            } => format!(
                "Proposal #{} has {} of the {} votes it needs.",
                proposal_id, votes_for, required
            ),
            Self::Unauthorized(reason) => format!("Not allowed: {}.", reason),
            Self::GroupNotFound(_) => "This chat is not linked to a treasury group.".to_string(),
            Self::ProposalNotFound(proposal_id) => {
                format!("Proposal #{} does not exist.", proposal_id)
            }
            Self::InvalidProposal(reason) => format!("That proposal is not valid: {}.", reason),
            Self::RateLimitExceeded { .. } => {
                "Daily limit reached, please try again later.".to_string()
            }
            Self::ActionFailed { proposal_id, .. } => format!(
                "Proposal #{} was approved but its action failed, please check the treasury.",
                proposal_id
            ),
            Self::Relay(e) if e.is_timeout() => {
                "The network is slow, please check again in a moment before retrying.".to_string()
            }
            Self::Rejected(_) | Self::Relay(_) | Self::Ledger(_) => {
                "The request could not be submitted, please try again.".to_string()
            }
            Self::Internal(_) => {
                "Something went wrong handling that command, please try again.".to_string()
            }
        }
    }

    /// Map the failure of a relayed call on `proposal_id`.
    pub(crate) fn from_proposal_call(
        err: RelayError,
        proposal_id: ProposalId,
        by: WalletAddress,
    ) -> Self {
        match err.into_rejection() {
            Ok(LedgerError::AlreadyVoted) => Self::AlreadyVoted {
                proposal_id,
                voter: by,
            },
            Ok(LedgerError::AlreadyExecuted) => Self::AlreadyExecuted(proposal_id),
            Ok(LedgerError::ProposalClosed(reason)) => Self::ProposalClosed {
                proposal_id,
                reason,
            },
            Ok(LedgerError::QuorumNotReached) => Self::QuorumNotReached {
                proposal_id,
                votes_for: 0,
                required: 0,
            },
            Ok(LedgerError::NotFound(_)) => Self::ProposalNotFound(proposal_id),
            Ok(other) => Self::from_rejection(other),
            Err(err) => err.into(),
        }
    }

    fn from_rejection(err: LedgerError) -> Self {
        match err {
            LedgerError::Unauthorized(reason) => Self::Unauthorized(reason),
            LedgerError::Rejected(reason) => Self::Rejected(reason),
            other => Self::Rejected(other.to_string()),
        }
    }
}

impl From<RelayError> for GovernanceError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::RateLimitExceeded { key, retry_at, .. } => Self::RateLimitExceeded {
                key: key.to_string(),
                retry_at,
            },
            err => match err.into_rejection() {
                Ok(rejection) => Self::from_rejection(rejection),
                Err(err) => Self::Relay(err),
            },
        }
    }
}

impl From<LedgerError> for GovernanceError {
    fn from(err: LedgerError) -> Self {
        Self::Ledger(err)
    }
}
