// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::RelayOp;
use std::time::Duration;
use thiserror::Error;
use treasury_ledger_api::LedgerError;
use treasury_rate_limiter::RateLimitKey;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("rate limit exceeded for {key}, at most {limit} calls per {window:?}")]
    RateLimitExceeded {
        key: RateLimitKey,
        limit: u32,
        window: Duration,
        retry_at: u64,
    },
    #[error("relayed {op} failed: {source}")]
    Submission {
        op: RelayOp,
        #[source]
        source: LedgerError,
    },
    #[error("relayed {op} did not complete in {timeout:?}, its outcome is unknown")]
    Timeout { op: RelayOp, timeout: Duration },
    #[error("rate limit store failed: {0:?}")]
    Store(anyhow::Error),
}

impl RelayError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// The ledger rejection behind a failed submission.
    pub fn rejection(&self) -> Option<&LedgerError> {
        match self {
            Self::Submission { source, .. } if source.is_rejection() => Some(source),
            _ => None,
        }
    }

    pub fn into_rejection(self) -> Result<LedgerError, Self> {
        match self {
            Self::Submission { source, .. } if source.is_rejection() => Ok(source),
            other => Err(other),
        }
    }
}
