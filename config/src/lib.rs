// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::helper::{load_config, save_config, to_toml};
use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use treasury_logger::prelude::*;

mod api_quota;
mod bot_config;
mod governance_config;
mod helper;
mod logger_config;
mod relay_config;
#[cfg(test)]
mod tests;

pub use api_quota::{QuotaConfig, QuotaDuration};
pub use bot_config::{BotConfig, DEFAULT_MENTIONS};
pub use governance_config::{GovernanceConfig, DEFAULT_VOTE_THRESHOLD, DEFAULT_VOTING_WINDOW_SECS};
pub use logger_config::LoggerConfig;
pub use relay_config::{
    RelayConfig, DEFAULT_GROUP_CALLS_PER_DAY, DEFAULT_SUBMIT_TIMEOUT_SECS,
    DEFAULT_USER_CALLS_PER_DAY,
};

pub static CONFIG_FILE_NAME: &str = "treasury.toml";

#[derive(Clone, Debug, Default, Parser)]
#[clap(name = "treasury", about = "Group treasury governance bot")]
pub struct TreasuryOpt {
    #[clap(long, short = 'c', parse(from_os_str))]
    /// Path to the config file, a default one is generated when the file does not exist.
    pub config: Option<PathBuf>,

    #[clap(flatten)]
    pub governance: GovernanceConfig,

    #[clap(flatten)]
    pub relay: RelayConfig,

    #[clap(long = "bot-mention")]
    /// Token addressing a message to the bot, repeat for several tokens.
    pub bot_mention: Option<Vec<String>>,

    #[clap(long = "disable-std-log")]
    /// Disable std error log output.
    pub disable_std_log: bool,

    #[clap(long = "log-file", parse(from_os_str))]
    /// Also write the log to this file.
    pub log_file: Option<PathBuf>,

    #[clap(long = "log-level")]
    /// Global log level, the RUST_LOG env takes precedence.
    pub log_level: Option<String>,
}

pub trait ConfigModule: Sized {
    /// Overwrite config by the command line option.
    fn merge_with_opt(&mut self, _opt: &TreasuryOpt) -> Result<()> {
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Default, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TreasuryConfig {
    #[serde(default)]
    pub governance: GovernanceConfig,
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub logger: LoggerConfig,
}

impl std::fmt::Display for TreasuryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", to_toml(self).map_err(|_e| std::fmt::Error)?)
    }
}

impl TreasuryConfig {
    pub fn load_with_opt(opt: &TreasuryOpt) -> Result<Self> {
        let config = match opt.config.as_ref() {
            Some(config_file_path) if config_file_path.exists() => {
                // options only change the loaded config, the file is left as is
                info!("Load config from: {:?}", config_file_path);
                let mut config: TreasuryConfig = load_config(config_file_path)?;
                config.merge_with_opt(opt)?;
                config
            }
            Some(config_file_path) => {
                info!("Generate default config at: {:?}", config_file_path);
                let mut config = TreasuryConfig::default();
                config.merge_with_opt(opt)?;
                save_config(&config, config_file_path)?;
                config
            }
            None => {
                let mut config = TreasuryConfig::default();
                config.merge_with_opt(opt)?;
                config
            }
        };
        config.validate()?;
        debug!("Final config: {}", config);
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: TreasuryConfig = load_config(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        save_config(self, path.as_ref())
    }

    pub fn merge_with_opt(&mut self, opt: &TreasuryOpt) -> Result<()> {
        self.governance.merge_with_opt(opt)?;
        self.relay.merge_with_opt(opt)?;
        self.bot.merge_with_opt(opt)?;
        self.logger.merge_with_opt(opt)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.governance.validate()?;
        self.relay.validate()?;
        self.bot.validate()?;
        self.logger.validate()?;
        Ok(())
    }
}
