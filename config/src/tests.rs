// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use super::*;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::time::Duration;
use treasury_types::{Currency, WalletAddress};

#[test]
fn test_default_config() -> Result<()> {
    let config = TreasuryConfig::load_with_opt(&TreasuryOpt::default())?;
    assert_eq!(config.governance.voting_window_secs(), 172_800);
    assert_eq!(config.governance.vote_threshold(), 90);
    assert!(config.governance.creator_can_cancel());
    assert_eq!(config.governance.currencies().decimals(&Currency::new("usdc")), Some(6));
    assert_eq!(config.relay.user_quota().to_string(), "100/d");
    assert_eq!(config.relay.group_quota().to_string(), "1000/d");
    assert_eq!(config.relay.submit_timeout(), Duration::from_secs(30));
    assert_eq!(
        config.bot.mentions(),
        vec!["@bot".to_string(), "@treasury ai".to_string()]
    );
    assert!(config.logger.enable_stderr);
    Ok(())
}

#[test]
fn test_generate_and_load() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(CONFIG_FILE_NAME);
    let opt = TreasuryOpt {
        config: Some(path.clone()),
        ..TreasuryOpt::default()
    };
    let config = TreasuryConfig::load_with_opt(&opt)?;
    assert!(path.exists());
    let config2 = TreasuryConfig::load_with_opt(&opt)?;
    assert_eq!(config, config2);
    assert_eq!(to_toml(&config)?, to_toml(&config2)?);
    Ok(())
}

#[test]
fn test_load_missing_file_names_path() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join("missing.toml");
    let err = TreasuryConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("missing.toml"));
    Ok(())
}

#[test]
fn test_opt_overrides_file() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let path = temp_dir.path().join(CONFIG_FILE_NAME);
    let mut config = TreasuryConfig::default();
    config.governance.set_vote_threshold(60);
    config.save(&path)?;

    let mut opt = TreasuryOpt {
        config: Some(path.clone()),
        bot_mention: Some(vec!["@vault".to_string()]),
        disable_std_log: true,
        ..TreasuryOpt::default()
    };
    opt.relay
        .set_user_quota(QuotaConfig::from_str("5/h")?);
    let loaded = TreasuryConfig::load_with_opt(&opt)?;
    assert_eq!(loaded.governance.vote_threshold(), 60);
    assert_eq!(loaded.relay.user_quota().max_calls.get(), 5);
    assert_eq!(loaded.relay.user_quota().duration, QuotaDuration::Hour);
    assert_eq!(loaded.bot.mentions(), vec!["@vault".to_string()]);
    assert!(!loaded.logger.enable_stderr);

    // the option is not written back to the file.
    let from_file = TreasuryConfig::load(&path)?;
    assert_eq!(from_file.relay.user_quota().to_string(), "100/d");
    Ok(())
}

#[test]
fn test_parse_toml_sections() -> Result<()> {
    let config: TreasuryConfig = helper::parse(
        r#"
        [governance]
        voting_window_secs = 3600
        vote_threshold = 51
        creator_can_cancel = false
        currencies = { ETH = 18, DAI = 18 }

        [relay]
        user_quota = "10/m"
        group_quota = "20/h"
        submit_timeout_secs = 5
        fee_payer = "0x00000000000000000000000000000000000000ff"

        [bot]
        mentions = ["@bot"]
        "#,
    )?;
    config.validate()?;
    assert_eq!(config.governance.voting_window(), Duration::from_secs(3600));
    assert!(!config.governance.creator_can_cancel());
    assert_eq!(config.governance.currencies().decimals(&Currency::new("dai")), Some(18));
    assert_eq!(config.governance.currencies().decimals(&Currency::new("usdc")), None);
    assert_eq!(
        config.relay.group_quota(),
        QuotaConfig::new(NonZeroU32::new(20).unwrap(), QuotaDuration::Hour)
    );
    assert_eq!(
        config.relay.fee_payer(),
        WalletAddress::from_hex_literal("0x00000000000000000000000000000000000000ff")?
    );
    Ok(())
}

#[test]
fn test_unknown_field_rejected() {
    let result: Result<TreasuryConfig> = helper::parse(
        r#"
        [governance]
        quorum = 3
        "#,
    );
    assert!(result.is_err());
}

#[test]
fn test_invalid_values() -> Result<()> {
    let mut config = TreasuryConfig::default();
    config.governance.set_vote_threshold(0);
    assert!(config.validate().is_err());
    config.governance.set_vote_threshold(101);
    assert!(config.validate().is_err());
    config.governance.set_vote_threshold(100);
    config.governance.set_voting_window_secs(0);
    assert!(config.validate().is_err());

    let mut config = TreasuryConfig::default();
    config.bot.set_mentions(vec![]);
    assert!(config.validate().is_err());

    let mut config = TreasuryConfig::default();
    config.logger.level = "loud".to_string();
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn test_quota_config_parse() {
    assert!(QuotaConfig::from_str("0/d").is_err());
    assert!(QuotaConfig::from_str("10").is_err());
    assert!(QuotaConfig::from_str("10/w").is_err());
    let quota = QuotaConfig::from_str("100/d").unwrap();
    assert_eq!(quota.quota().window, Duration::from_secs(86_400));
    assert_eq!(quota.quota().max_calls.get(), 100);
}
