// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use treasury_ledger_api::{LedgerError, LedgerResult};

/// A failure to return from the next call of an operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    Transport(String),
    Rejected(String),
}

impl Fault {
    fn into_error(self) -> LedgerError {
        match self {
            Self::Transport(msg) => LedgerError::Transport(anyhow::format_err!(msg)),
            Self::Rejected(msg) => LedgerError::Rejected(msg),
        }
    }
}

/// Per operation call counters, one shot faults and delays.
#[derive(Default)]
pub(crate) struct FaultPlan {
    calls: Mutex<HashMap<&'static str, u64>>,
    faults: Mutex<HashMap<&'static str, Fault>>,
    delays: Mutex<HashMap<&'static str, Duration>>,
}

impl FaultPlan {
    pub fn fail_next(&self, op: &'static str, fault: Fault) {
        self.faults.lock().insert(op, fault);
    }

    pub fn set_delay(&self, op: &'static str, delay: Option<Duration>) {
        let mut delays = self.delays.lock();
        match delay {
            Some(delay) => delays.insert(op, delay),
            None => delays.remove(op),
        };
    }

    pub fn call_count(&self, op: &str) -> u64 {
        self.calls.lock().get(op).copied().unwrap_or_default()
    }

    /// Count the call, then wait the configured delay and return the pending fault.
    pub async fn enter(&self, op: &'static str) -> LedgerResult<()> {
        *self.calls.lock().entry(op).or_default() += 1;
        let delay = self.delays.lock().get(op).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let fault = self.faults.lock().remove(op);
        match fault {
            Some(fault) => Err(fault.into_error()),
            None => Ok(()),
        }
    }
}
