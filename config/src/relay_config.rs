// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::api_quota::{QuotaConfig, QuotaDuration};
use crate::{ConfigModule, TreasuryOpt};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use treasury_types::WalletAddress;

pub const DEFAULT_USER_CALLS_PER_DAY: u32 = 100;
pub const DEFAULT_GROUP_CALLS_PER_DAY: u32 = 1000;
pub const DEFAULT_SUBMIT_TIMEOUT_SECS: u64 = 30;

fn per_day(calls: u32) -> QuotaConfig {
    QuotaConfig::new(
        NonZeroU32::new(calls).unwrap_or(NonZeroU32::MIN),
        QuotaDuration::Day,
    )
}

#[derive(Default, Clone, Debug, Eq, PartialEq, Deserialize, Serialize, clap::Args)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long = "relay-user-quota")]
    /// Relayed calls per user, `<count>/<s|m|h|d>`. default to 100/d
    user_quota: Option<QuotaConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long = "relay-group-quota")]
    /// Relayed calls per group, `<count>/<s|m|h|d>`. default to 1000/d
    group_quota: Option<QuotaConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long = "relay-submit-timeout-secs")]
    /// Seconds to wait for the ledger to accept a relayed call. default to 30
    submit_timeout_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long = "relay-fee-payer")]
    /// The funding account paying fees of relayed calls.
    fee_payer: Option<WalletAddress>,
}

impl RelayConfig {
    pub fn set_user_quota(&mut self, quota: QuotaConfig) {
        self.user_quota = Some(quota);
    }
    pub fn set_group_quota(&mut self, quota: QuotaConfig) {
        self.group_quota = Some(quota);
    }
    pub fn set_submit_timeout_secs(&mut self, secs: u64) {
        self.submit_timeout_secs = Some(secs);
    }
    pub fn set_fee_payer(&mut self, fee_payer: WalletAddress) {
        self.fee_payer = Some(fee_payer);
    }
    pub fn user_quota(&self) -> QuotaConfig {
        self.user_quota
            .unwrap_or_else(|| per_day(DEFAULT_USER_CALLS_PER_DAY))
    }
    pub fn group_quota(&self) -> QuotaConfig {
        self.group_quota
            .unwrap_or_else(|| per_day(DEFAULT_GROUP_CALLS_PER_DAY))
    }
    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(
            self.submit_timeout_secs
                .unwrap_or(DEFAULT_SUBMIT_TIMEOUT_SECS),
        )
    }
    pub fn fee_payer(&self) -> WalletAddress {
        self.fee_payer.unwrap_or(WalletAddress::ZERO)
    }
}

impl ConfigModule for RelayConfig {
    fn merge_with_opt(&mut self, opt: &TreasuryOpt) -> Result<()> {
        let relay_opt = &opt.relay;
        if let Some(m) = relay_opt.user_quota.as_ref() {
            self.user_quota = Some(*m);
        }
        if let Some(m) = relay_opt.group_quota.as_ref() {
            self.group_quota = Some(*m);
        }
        if let Some(m) = relay_opt.submit_timeout_secs.as_ref() {
            self.submit_timeout_secs = Some(*m);
        }
        if let Some(m) = relay_opt.fee_payer.as_ref() {
            self.fee_payer = Some(*m);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            !self.submit_timeout().is_zero(),
            "relay submit timeout must be greater than 0"
        );
        Ok(())
    }
}
