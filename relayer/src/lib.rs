// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use treasury_config::RelayConfig;
use treasury_ledger_api::{CallContext, LedgerResult};
use treasury_logger::prelude::*;
use treasury_rate_limiter::{
    CounterStore, LimitError, RateLimitKey, RateLimiter, UserGroupLimiter,
};
use treasury_time_service::TimeService;
use treasury_types::{GroupId, WalletAddress};

mod error;
mod metrics;
#[cfg(test)]
mod tests;

pub use error::RelayError;
pub use metrics::RelayerMetrics;

pub type RelayResult<T> = std::result::Result<T, RelayError>;

/// The kinds of calls the relay sponsors, used for logs and metric labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelayOp {
    SendMessage,
    CreateGroup,
    Deposit,
    CreateProposal,
    Vote,
    Execute,
    Cancel,
    ExternalAction,
}

impl RelayOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SendMessage => "send_message",
            Self::CreateGroup => "create_group",
            Self::Deposit => "deposit",
            Self::CreateProposal => "create_proposal",
            Self::Vote => "vote",
            Self::Execute => "execute",
            Self::Cancel => "cancel",
            Self::ExternalAction => "external_action",
        }
    }
}

impl fmt::Display for RelayOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submits ledger calls on behalf of members, paying with its own funding
/// identity. Every call first consumes the sender's quota, then the group's.
pub struct Relayer {
    limiter: UserGroupLimiter,
    fee_payer: WalletAddress,
    submit_timeout: Duration,
    metrics: Option<RelayerMetrics>,
}

impl Relayer {
    pub fn new(limiter: UserGroupLimiter, fee_payer: WalletAddress, submit_timeout: Duration) -> Self {
        Self {
            limiter,
            fee_payer,
            submit_timeout,
            metrics: None,
        }
    }

    pub fn from_config(
        config: &RelayConfig,
        store: Arc<dyn CounterStore>,
        time_service: Arc<dyn TimeService>,
    ) -> Self {
        let limiter = UserGroupLimiter::new(
            RateLimiter::new(store, time_service),
            config.user_quota().quota(),
            config.group_quota().quota(),
        );
        Self::new(limiter, config.fee_payer(), config.submit_timeout())
    }

    pub fn with_metrics(mut self, metrics: RelayerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn fee_payer(&self) -> WalletAddress {
        self.fee_payer
    }

    pub fn submit_timeout(&self) -> Duration {
        self.submit_timeout
    }

    pub fn context(&self, sender: WalletAddress) -> CallContext {
        CallContext::new(sender, self.fee_payer)
    }

    /// Consume quota of `sender` and `group` without submitting anything.
    pub async fn admit(
        &self,
        sender: WalletAddress,
        group: Option<GroupId>,
        op: RelayOp,
    ) -> RelayResult<()> {
        let user_key = RateLimitKey::user(sender);
        let checked = match group {
            Some(group) => self.limiter.check(&user_key, &RateLimitKey::group(group)).await,
            None => self.limiter.check_user(&user_key).await,
        };
        checked.map_err(|e| {
            self.record(op, "limited");
            match e {
                LimitError::Exceeded {
                    key,
                    limit,
                    window,
                    retry_at,
                } => {
                    warn!("[relay] {} by {} blocked, {} over quota", op, sender, key);
                    RelayError::RateLimitExceeded {
                        key,
                        limit,
                        window,
                        retry_at,
                    }
                }
                LimitError::Store(e) => {
                    error!("[relay] rate limit store failed for {}: {:?}", op, e);
                    RelayError::Store(e)
                }
            }
        })
    }

    /// Consume quota, then run `call` with the sponsored call context.
    ///
    /// Quota is not given back when the call fails. A call still running
    /// after the submit timeout is reported as `Timeout`; it may still land,
    /// callers re-read ledger state before acting on it.
    pub async fn submit<T, F, Fut>(
        &self,
        sender: WalletAddress,
        group: Option<GroupId>,
        op: RelayOp,
        call: F,
    ) -> RelayResult<T>
    where
        F: FnOnce(CallContext) -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        self.admit(sender, group, op).await?;
        self.submit_admitted(sender, op, call).await
    }

    /// Run `call` for quota consumed earlier through `admit`.
    pub async fn submit_admitted<T, F, Fut>(
        &self,
        sender: WalletAddress,
        op: RelayOp,
        call: F,
    ) -> RelayResult<T>
    where
        F: FnOnce(CallContext) -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let ctx = self.context(sender);
        let start = Instant::now();
        let result = tokio::time::timeout(self.submit_timeout, call(ctx)).await;
        if let Some(metrics) = self.metrics.as_ref() {
            metrics
                .submit_time
                .with_label_values(&[op.as_str()])
                .observe(start.elapsed().as_secs_f64());
        }
        match result {
            Ok(Ok(value)) => {
                self.record(op, "ok");
                debug!("[relay] {} by {} submitted", op, sender);
                Ok(value)
            }
            Ok(Err(source)) => {
                if source.is_rejection() {
                    self.record(op, "rejected");
                    warn!("[relay] {} by {} rejected: {}", op, sender, source);
                } else {
                    self.record(op, "failed");
                    error!("[relay] {} by {} failed: {:?}", op, sender, source);
                }
                Err(RelayError::Submission { op, source })
            }
            Err(_) => {
                self.record(op, "timeout");
                error!(
                    "[relay] {} by {} timed out after {:?}",
                    op, sender, self.submit_timeout
                );
                Err(RelayError::Timeout {
                    op,
                    timeout: self.submit_timeout,
                })
            }
        }
    }

    fn record(&self, op: RelayOp, outcome: &str) {
        if let Some(metrics) = self.metrics.as_ref() {
            metrics
                .relayed_calls
                .with_label_values(&[op.as_str(), outcome])
                .inc();
        }
    }
}
