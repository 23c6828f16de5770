// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error;

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Errors of ledger calls.
///
/// All variants but `Transport` are authoritative rejections: the ledger
/// evaluated the call and refused it, no state was changed.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("already voted")]
    AlreadyVoted,
    #[error("proposal is closed: {0}")]
    ProposalClosed(String),
    #[error("proposal already executed")]
    AlreadyExecuted,
    #[error("quorum not reached")]
    QuorumNotReached,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("rejected: {0}")]
    Rejected(String),
    #[error("ledger transport error: {0:?}")]
    Transport(anyhow::Error),
}

impl LedgerError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }

    pub fn is_rejection(&self) -> bool {
        !self.is_transport()
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<anyhow::Error> for LedgerError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<Self>() {
            Ok(ledger_err) => ledger_err,
            Err(err) => LedgerError::Transport(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_conversion_keeps_rejection() {
        let err: LedgerError = anyhow::Error::from(LedgerError::AlreadyVoted).into();
        assert!(matches!(err, LedgerError::AlreadyVoted));
        assert!(err.is_rejection());

        let err: LedgerError = anyhow::format_err!("connection reset").into();
        assert!(err.is_transport());
        assert!(!err.is_rejection());
    }
}
