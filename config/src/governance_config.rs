// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{ConfigModule, TreasuryOpt};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use treasury_types::CurrencyTable;

pub const DEFAULT_VOTING_WINDOW_SECS: u64 = 48 * 60 * 60;
pub const DEFAULT_VOTE_THRESHOLD: u8 = 90;

#[derive(Default, Clone, Debug, Eq, PartialEq, Deserialize, Serialize, clap::Args)]
#[serde(deny_unknown_fields)]
pub struct GovernanceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long = "voting-window-secs")]
    /// Seconds a proposal accepts votes after creation. default to 172800 (48h)
    voting_window_secs: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(long = "vote-threshold")]
    /// Percentage of active members whose "for" vote passes a proposal. default to 90
    vote_threshold: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(skip)]
    /// Whether the group creator may cancel a proposal of another member. default to true
    creator_can_cancel: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[clap(skip)]
    /// Symbol to decimals of the currencies the treasury handles.
    currencies: Option<BTreeMap<String, u8>>,
}

impl GovernanceConfig {
    pub fn set_voting_window_secs(&mut self, secs: u64) {
        self.voting_window_secs = Some(secs);
    }
    pub fn set_vote_threshold(&mut self, threshold: u8) {
        self.vote_threshold = Some(threshold);
    }
    pub fn set_creator_can_cancel(&mut self, enable: bool) {
        self.creator_can_cancel = Some(enable);
    }
    pub fn voting_window_secs(&self) -> u64 {
        self.voting_window_secs
            .unwrap_or(DEFAULT_VOTING_WINDOW_SECS)
    }
    pub fn voting_window(&self) -> Duration {
        Duration::from_secs(self.voting_window_secs())
    }
    pub fn vote_threshold(&self) -> u8 {
        self.vote_threshold.unwrap_or(DEFAULT_VOTE_THRESHOLD)
    }
    pub fn creator_can_cancel(&self) -> bool {
        self.creator_can_cancel.unwrap_or(true)
    }
    pub fn currencies(&self) -> CurrencyTable {
        match self.currencies.as_ref() {
            Some(currencies) => CurrencyTable::new(currencies.clone()),
            None => CurrencyTable::default(),
        }
    }
}

impl ConfigModule for GovernanceConfig {
    fn merge_with_opt(&mut self, opt: &TreasuryOpt) -> Result<()> {
        let governance_opt = &opt.governance;
        if let Some(m) = governance_opt.voting_window_secs.as_ref() {
            self.voting_window_secs = Some(*m);
        }
        if let Some(m) = governance_opt.vote_threshold.as_ref() {
            self.vote_threshold = Some(*m);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            (1..=100).contains(&self.vote_threshold()),
            "vote threshold must be within 1..=100, got {}",
            self.vote_threshold()
        );
        ensure!(
            self.voting_window_secs() > 0,
            "voting window must be greater than 0"
        );
        for (symbol, decimals) in self.currencies.iter().flatten() {
            ensure!(
                *decimals <= treasury_types::amount::MAX_DECIMALS,
                "currency {} has too many decimals: {}",
                symbol,
                decimals
            );
        }
        Ok(())
    }
}
