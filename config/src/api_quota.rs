// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Result};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use treasury_rate_limiter::Quota;

/// `<max calls>/<window>` such as `100/d`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaConfig {
    pub max_calls: NonZeroU32,
    pub duration: QuotaDuration,
}

impl QuotaConfig {
    pub fn new(max_calls: NonZeroU32, duration: QuotaDuration) -> Self {
        Self {
            max_calls,
            duration,
        }
    }

    pub fn quota(&self) -> Quota {
        Quota::new(self.max_calls, self.duration.as_duration())
    }
}

impl std::fmt::Display for QuotaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.max_calls, self.duration)
    }
}

impl FromStr for QuotaConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().splitn(2, '/').collect();
        if parts.len() != 2 {
            bail!("invalid quota format `{}`, expect <count>/<s|m|h|d>", s);
        }
        let max_calls = parts[0].parse::<NonZeroU32>()?;
        let duration = parts[1].parse::<QuotaDuration>()?;
        Ok(Self {
            max_calls,
            duration,
        })
    }
}

impl Serialize for QuotaConfig {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> Deserialize<'de> for QuotaConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let s = <String>::deserialize(deserializer)?;
        s.parse::<Self>().map_err(D::Error::custom)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum QuotaDuration {
    Second,
    Minute,
    Hour,
    Day,
}

impl QuotaDuration {
    pub fn as_duration(&self) -> Duration {
        match self {
            Self::Second => Duration::from_secs(1),
            Self::Minute => Duration::from_secs(60),
            Self::Hour => Duration::from_secs(60 * 60),
            Self::Day => Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl std::fmt::Display for QuotaDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Second => "s",
            Self::Minute => "m",
            Self::Hour => "h",
            Self::Day => "d",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for QuotaDuration {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let quota_duration = match s {
            "s" => Self::Second,
            "m" => Self::Minute,
            "h" => Self::Hour,
            "d" => Self::Day,
            _ => bail!("invalid quota duration `{}`", s),
        };
        Ok(quota_duration)
    }
}
