// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{format_err, Result};
use log::LevelFilter;
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        rolling_file::policy::compound::{
            roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger, CompoundPolicy,
        },
        rolling_file::RollingFileAppender,
    },
    config::{Appender, Config, Logger, Root},
    encode::pattern::PatternEncoder,
    Handle,
};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::{Arc, Once};

#[cfg(test)]
mod tests;

/// Logger prelude which includes all logging macros.
pub mod prelude {
    pub use log::{debug, error, info, log_enabled, trace, warn, Level, LevelFilter};
}

/// A parsed `RUST_LOG` style spec: `debug,treasury_relayer=info,treasury_command=warn`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLevelSpec {
    pub global_level: Option<LevelFilter>,
    pub module_levels: Vec<(String, LevelFilter)>,
}

pub(crate) fn parse_spec(spec: &str) -> LogLevelSpec {
    let mut result = LogLevelSpec::default();
    for part in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let mut kv = part.splitn(2, '=');
        let first = kv.next().unwrap_or_default().trim();
        match kv.next() {
            Some(level) => match level.trim().parse::<LevelFilter>() {
                Ok(level) => result.module_levels.push((first.to_string(), level)),
                Err(_) => eprintln!("ignore invalid log level `{}` for module {}", level, first),
            },
            None => match first.parse::<LevelFilter>() {
                Ok(level) => result.global_level = Some(level),
                Err(_) => eprintln!("ignore invalid log level `{}`", first),
            },
        }
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LoggerConfigArg {
    enable_stderr: bool,
    level: LevelFilter,
    module_levels: Vec<(String, LevelFilter)>,
    log_path: Option<PathBuf>,
    max_file_size: u64,
    max_backup: u32,
}

impl LoggerConfigArg {
    pub fn new(enable_stderr: bool, spec: LogLevelSpec, default_level: LevelFilter) -> Self {
        Self {
            enable_stderr,
            level: spec.global_level.unwrap_or(default_level),
            module_levels: spec.module_levels,
            log_path: None,
            max_file_size: 0,
            max_backup: 0,
        }
    }
}

pub struct LoggerHandle {
    arg: Mutex<LoggerConfigArg>,
    handle: Handle,
}

impl LoggerHandle {
    fn new(arg: LoggerConfigArg, handle: Handle) -> Self {
        Self {
            arg: Mutex::new(arg),
            handle,
        }
    }

    pub fn enable_stderr(&self) {
        let mut arg = self.arg.lock().clone();
        arg.enable_stderr = true;
        self.update_logger(arg);
    }

    pub fn disable_stderr(&self) {
        let mut arg = self.arg.lock().clone();
        arg.enable_stderr = false;
        self.update_logger(arg);
    }

    pub fn enable_file(&self, log_path: PathBuf, max_file_size: u64, max_backup: u32) {
        let mut arg = self.arg.lock().clone();
        arg.log_path = Some(log_path);
        arg.max_file_size = max_file_size;
        arg.max_backup = max_backup;
        self.update_logger(arg);
    }

    pub fn update_level(&self, level: LevelFilter) {
        let mut arg = self.arg.lock().clone();
        arg.level = level;
        self.update_logger(arg);
    }

    fn update_logger(&self, arg: LoggerConfigArg) {
        let mut origin_arg = self.arg.lock();
        if *origin_arg != arg {
            match build_config(arg.clone()) {
                Ok(config) => {
                    *origin_arg = arg;
                    self.handle.set_config(config);
                }
                Err(e) => eprintln!("rebuild log config failed, keep the old one: {:?}", e),
            }
        }
    }

    /// Get log path
    pub fn log_path(&self) -> Option<PathBuf> {
        self.arg.lock().log_path.clone()
    }

    /// Check is stderr enabled
    pub fn stderr(&self) -> bool {
        self.arg.lock().enable_stderr
    }

    pub fn level(&self) -> LevelFilter {
        self.arg.lock().level
    }
}

const LOG_PATTERN: &str = "{d} {l} {M}::{f}::{L} - {m}{n}";

fn build_config(arg: LoggerConfigArg) -> Result<Config> {
    let LoggerConfigArg {
        enable_stderr,
        level,
        module_levels,
        log_path,
        max_file_size,
        max_backup,
    } = arg;
    let mut builder = Config::builder();
    let mut root_builder = Root::builder();
    if enable_stderr {
        let stderr = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .target(Target::Stderr)
            .build();
        builder = builder.appender(Appender::builder().build("stderr", Box::new(stderr)));
        root_builder = root_builder.appender("stderr");
    }
    if let Some(log_path) = log_path {
        let log_path_str = log_path
            .to_str()
            .ok_or_else(|| format_err!("invalid log path: {:?}", log_path))?;
        let log_file_backup_pattern = format!("{}.{{}}.gz", log_path_str);
        let file_appender = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(
                log_path.clone(),
                Box::new(CompoundPolicy::new(
                    Box::new(SizeTrigger::new(max_file_size)),
                    Box::new(
                        FixedWindowRoller::builder()
                            .build(log_file_backup_pattern.as_str(), max_backup)
                            .map_err(|e| format_err!("{:?}", e))?,
                    ),
                )),
            )?;

        builder = builder.appender(Appender::builder().build("file", Box::new(file_appender)));
        root_builder = root_builder.appender("file");
    }
    for (module, module_level) in module_levels {
        builder = builder.logger(Logger::builder().build(module, module_level));
    }

    builder
        .build(root_builder.build(level))
        .map_err(|e| e.into())
}

fn env_log_spec() -> LogLevelSpec {
    std::env::var("RUST_LOG")
        .map(|s| parse_spec(s.as_str()))
        .unwrap_or_default()
}

static LOGGER_HANDLE: Lazy<Mutex<Option<Arc<LoggerHandle>>>> = Lazy::new(|| Mutex::new(None));

static LOG_INIT: Once = Once::new();

pub fn init() -> Arc<LoggerHandle> {
    init_with_default_level(LevelFilter::Info)
}

/// Init the global logger once, the `RUST_LOG` env overrides `default_level`.
/// Later calls only update the level of the existing logger.
pub fn init_with_default_level(default_level: LevelFilter) -> Arc<LoggerHandle> {
    let spec = env_log_spec();
    let level = spec.global_level.unwrap_or(default_level);
    LOG_INIT.call_once(|| {
        let arg = LoggerConfigArg::new(true, spec, default_level);
        let handle = build_config(arg.clone())
            .and_then(|config| log4rs::init_config(config).map_err(anyhow::Error::from));
        match handle {
            Ok(handle) => {
                *LOGGER_HANDLE.lock() = Some(Arc::new(LoggerHandle::new(arg, handle)));
            }
            Err(e) => panic!("init logger failed: {:?}", e),
        }
    });

    let logger_handle = LOGGER_HANDLE
        .lock()
        .as_ref()
        .cloned()
        .expect("logger handle must has been set.");
    if logger_handle.level() != level {
        logger_handle.update_level(level);
    }
    logger_handle
}

pub fn init_for_test() -> Arc<LoggerHandle> {
    init_with_default_level(LevelFilter::Debug)
}
