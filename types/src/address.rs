// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must have {expected} hex digits, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid hex in address {0}")]
    InvalidHex(String),
}

/// An externally owned or contract account, `0x` followed by 40 hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct WalletAddress([u8; WalletAddress::LENGTH]);

impl WalletAddress {
    pub const LENGTH: usize = 20;
    pub const ZERO: Self = Self([0u8; Self::LENGTH]);

    pub const fn new(bytes: [u8; Self::LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn from_hex_literal(literal: &str) -> Result<Self, AddressParseError> {
        let hex_part = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
            .ok_or_else(|| AddressParseError::MissingPrefix(literal.to_string()))?;
        if hex_part.len() != Self::LENGTH * 2 {
            return Err(AddressParseError::InvalidLength {
                expected: Self::LENGTH * 2,
                actual: hex_part.len(),
            });
        }
        let mut bytes = [0u8; Self::LENGTH];
        hex::decode_to_slice(hex_part, &mut bytes)
            .map_err(|_| AddressParseError::InvalidHex(literal.to_string()))?;
        Ok(Self(bytes))
    }

    pub fn to_hex_literal(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// `0x1234…abcd`, for chat replies.
    pub fn short_str(&self) -> String {
        let full = hex::encode(self.0);
        format!("0x{}…{}", &full[..4], &full[full.len() - 4..])
    }

    pub fn as_bytes(&self) -> &[u8; Self::LENGTH] {
        &self.0
    }
}

impl FromStr for WalletAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex_literal(s.trim())
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<[u8; WalletAddress::LENGTH]> for WalletAddress {
    fn from(bytes: [u8; WalletAddress::LENGTH]) -> Self {
        Self(bytes)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(self.to_hex_literal().as_str())
        } else {
            serializer.serialize_newtype_struct("WalletAddress", &self.0)
        }
    }
}

impl<'de> Deserialize<'de> for WalletAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        if deserializer.is_human_readable() {
            let s = <String>::deserialize(deserializer)?;
            s.parse::<Self>().map_err(D::Error::custom)
        } else {
            #[derive(Deserialize)]
            #[serde(rename = "WalletAddress")]
            struct Value([u8; WalletAddress::LENGTH]);

            let value = Value::deserialize(deserializer)?;
            Ok(Self(value.0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let literal = "0xAbCdEf0123456789abcdef0123456789ABCDEF01";
        let address: WalletAddress = literal.parse().unwrap();
        assert_eq!(
            address.to_string(),
            "0xabcdef0123456789abcdef0123456789abcdef01"
        );
        assert_eq!(address.short_str(), "0xabcd…ef01");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            "abcdef0123456789abcdef0123456789abcdef01".parse::<WalletAddress>(),
            Err(AddressParseError::MissingPrefix(_))
        ));
        assert!(matches!(
            "0x1234".parse::<WalletAddress>(),
            Err(AddressParseError::InvalidLength {
                expected: 40,
                actual: 4
            })
        ));
        assert!(matches!(
            "0xzzcdef0123456789abcdef0123456789abcdef01".parse::<WalletAddress>(),
            Err(AddressParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_bcs_is_fixed_length() {
        let address = WalletAddress::new([7u8; 20]);
        let bytes = bcs::to_bytes(&address).unwrap();
        assert_eq!(bytes.len(), WalletAddress::LENGTH);
        let decoded: WalletAddress = bcs::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, address);
    }
}
