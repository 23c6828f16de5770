// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{ConfigModule, TreasuryOpt};
use anyhow::{format_err, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use treasury_logger::prelude::LevelFilter;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerConfig {
    pub enable_stderr: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    pub max_file_size: u64,
    pub max_backup: u32,
    pub level: String,
}

impl LoggerConfig {
    pub fn enable_file(&self) -> bool {
        self.log_file.is_some()
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.level
            .parse::<LevelFilter>()
            .map_err(|_| format_err!("invalid log level `{}`", self.level))
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            enable_stderr: true,
            log_file: None,
            max_file_size: 10 * 1024 * 1024,
            max_backup: 2,
            level: "info".to_string(),
        }
    }
}

impl ConfigModule for LoggerConfig {
    fn merge_with_opt(&mut self, opt: &TreasuryOpt) -> Result<()> {
        if opt.disable_std_log {
            self.enable_stderr = false;
        }
        if let Some(log_file) = opt.log_file.as_ref() {
            self.log_file = Some(log_file.clone());
        }
        if let Some(level) = opt.log_level.as_ref() {
            self.level = level.clone();
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        self.level_filter().map(|_| ())
    }
}
