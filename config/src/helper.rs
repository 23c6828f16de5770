// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{format_err, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Goes through `toml::Value` so section tables are written after plain keys.
pub(crate) fn to_toml<T: Serialize>(config: &T) -> Result<String> {
    Ok(toml::to_string(&toml::Value::try_from(config)?)?)
}

pub(crate) fn save_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    std::fs::write(path, to_toml(config)?)
        .map_err(|e| format_err!("write config {}: {}", path.display(), e))
}

pub(crate) fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format_err!("read config {}: {}", path.display(), e))?;
    parse(&contents)
}

pub(crate) fn parse<T: DeserializeOwned>(contents: &str) -> Result<T> {
    Ok(toml::from_str(contents)?)
}
