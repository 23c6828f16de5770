// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{ConfigModule, TreasuryOpt};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

pub static DEFAULT_MENTIONS: [&str; 2] = ["@bot", "@treasury ai"];

#[derive(Default, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Tokens which address a chat message to the bot, matched case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    mentions: Option<Vec<String>>,
}

impl BotConfig {
    pub fn set_mentions(&mut self, mentions: Vec<String>) {
        self.mentions = Some(mentions);
    }

    pub fn mentions(&self) -> Vec<String> {
        match self.mentions.as_ref() {
            Some(mentions) => mentions.clone(),
            None => DEFAULT_MENTIONS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl ConfigModule for BotConfig {
    fn merge_with_opt(&mut self, opt: &TreasuryOpt) -> Result<()> {
        if let Some(mentions) = opt.bot_mention.as_ref() {
            self.mentions = Some(mentions.clone());
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let mentions = self.mentions();
        ensure!(!mentions.is_empty(), "bot needs at least one mention token");
        ensure!(
            mentions.iter().all(|m| !m.trim().is_empty()),
            "bot mention token must not be blank"
        );
        Ok(())
    }
}
