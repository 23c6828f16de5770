// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// 10^38 is the largest power of ten that fits in u128.
pub const MAX_DECIMALS: u8 = 38;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("`{0}` is not a decimal amount")]
    Invalid(String),
    #[error("`{amount}` has more than {decimals} decimal places")]
    TooPrecise { amount: String, decimals: u8 },
    #[error("`{0}` is too large")]
    Overflow(String),
    #[error("unsupported currency {0}")]
    UnknownCurrency(String),
}

/// A user entered, non negative decimal number kept as text, `5`, `0.25`.
///
/// It is turned into integer base units only at the ledger boundary.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecimalAmount(String);

impl DecimalAmount {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn parts(&self) -> (&str, &str) {
        match self.0.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (self.0.as_str(), ""),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.chars().all(|c| c == '0' || c == '.')
    }

    pub fn to_base_units(&self, decimals: u8) -> Result<u128, AmountError> {
        if decimals > MAX_DECIMALS {
            return Err(AmountError::Overflow(self.0.clone()));
        }
        let (int_part, frac_part) = self.parts();
        let frac_part = frac_part.trim_end_matches('0');
        if frac_part.len() > decimals as usize {
            return Err(AmountError::TooPrecise {
                amount: self.0.clone(),
                decimals,
            });
        }
        let overflow = || AmountError::Overflow(self.0.clone());
        let scale = 10u128.pow(decimals as u32);
        let int_value = int_part
            .parse::<u128>()
            .map_err(|_| overflow())?
            .checked_mul(scale)
            .ok_or_else(overflow)?;
        let frac_value = if frac_part.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_part, width = decimals as usize);
            padded.parse::<u128>().map_err(|_| overflow())?
        };
        int_value.checked_add(frac_value).ok_or_else(overflow)
    }
}

impl FromStr for DecimalAmount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || AmountError::Invalid(s.to_string());
        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (s, None),
        };
        if int_part.is_empty() || !int_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        if let Some(frac_part) = frac_part {
            if frac_part.is_empty() || !frac_part.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Render integer base units as a decimal string without trailing zeros.
pub fn format_base_units(value: u128, decimals: u8) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    if decimals == 0 {
        return value.to_string();
    }
    let scale = 10u128.pow(decimals as u32);
    let int_part = value / scale;
    let frac_part = value % scale;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{:0>width$}", frac_part, width = decimals as usize);
    format!("{}.{}", int_part, frac.trim_end_matches('0'))
}

/// Upper case token symbol such as `ETH`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    pub fn new(symbol: &str) -> Self {
        Self(symbol.trim().to_ascii_uppercase())
    }

    pub fn symbol(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// Known currencies and their decimals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTable(BTreeMap<String, u8>);

impl Default for CurrencyTable {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        table.insert("ETH".to_string(), 18);
        table.insert("WETH".to_string(), 18);
        table.insert("USDC".to_string(), 6);
        table.insert("USDT".to_string(), 6);
        Self(table)
    }
}

impl CurrencyTable {
    pub fn new(table: BTreeMap<String, u8>) -> Self {
        Self(
            table
                .into_iter()
                .map(|(symbol, decimals)| (symbol.to_ascii_uppercase(), decimals))
                .collect(),
        )
    }

    pub fn decimals(&self, currency: &Currency) -> Option<u8> {
        self.0.get(currency.symbol()).copied()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Resolve a user typed symbol, failing for symbols the treasury can not price.
    pub fn resolve(&self, symbol: &str) -> Result<Currency, AmountError> {
        let currency = Currency::new(symbol);
        match self.decimals(&currency) {
            Some(_) => Ok(currency),
            None => Err(AmountError::UnknownCurrency(currency.0)),
        }
    }

    pub fn to_base_units(
        &self,
        amount: &DecimalAmount,
        currency: &Currency,
    ) -> Result<u128, AmountError> {
        let decimals = self
            .decimals(currency)
            .ok_or_else(|| AmountError::UnknownCurrency(currency.to_string()))?;
        amount.to_base_units(decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amount(s: &str) -> DecimalAmount {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_decimal_amount() {
        assert_eq!(amount("5").as_str(), "5");
        assert_eq!(amount(" 0.25 ").as_str(), "0.25");
        for bad in ["", ".5", "5.", "-1", "1e18", "1,5", "abc", "1.2.3"] {
            assert!(bad.parse::<DecimalAmount>().is_err(), "{} should fail", bad);
        }
    }

    #[test]
    fn test_to_base_units_is_exact() {
        assert_eq!(amount("5").to_base_units(18).unwrap(), 5_000_000_000_000_000_000);
        assert_eq!(amount("0.1").to_base_units(18).unwrap(), 100_000_000_000_000_000);
        assert_eq!(amount("1.234567").to_base_units(6).unwrap(), 1_234_567);
        assert_eq!(amount("1.50000000").to_base_units(6).unwrap(), 1_500_000);
        assert_eq!(
            amount("1.2345678").to_base_units(6),
            Err(AmountError::TooPrecise {
                amount: "1.2345678".to_string(),
                decimals: 6
            })
        );
        assert!(matches!(
            amount("340282366920938463463374607431768211456").to_base_units(0),
            Err(AmountError::Overflow(_))
        ));
        assert!(amount("0.000").is_zero());
    }

    #[test]
    fn test_format_base_units() {
        assert_eq!(format_base_units(5_000_000_000_000_000_000, 18), "5");
        assert_eq!(format_base_units(1_500_000, 6), "1.5");
        assert_eq!(format_base_units(1, 6), "0.000001");
        assert_eq!(format_base_units(42, 0), "42");
    }

    #[test]
    fn test_currency_table() {
        let table = CurrencyTable::default();
        assert_eq!(table.resolve("eth").unwrap(), Currency::new("ETH"));
        assert_eq!(
            table.resolve("doge"),
            Err(AmountError::UnknownCurrency("DOGE".to_string()))
        );
        assert_eq!(
            table
                .to_base_units(&amount("2.5"), &Currency::new("usdc"))
                .unwrap(),
            2_500_000
        );
    }
}
