// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{format_err, Result};
use clap::Parser;
use std::sync::Arc;
use treasury_command::TreasuryBot;
use treasury_config::{LoggerConfig, TreasuryConfig, TreasuryOpt};
use treasury_governance::ProposalEngine;
use treasury_ledger_api::TreasuryLedger;
use treasury_ledger_mock::{MockLedger, MockMarketplace};
use treasury_logger::prelude::*;
use treasury_logger::LoggerHandle;
use treasury_rate_limiter::InMemoryCounterStore;
use treasury_relayer::{Relayer, RelayerMetrics};
use treasury_time_service::{MockTimeService, RealTimeService, TimeService};
use treasury_types::{NewGroup, WalletAddress};

mod session;

use session::Session;

#[derive(Debug, Parser)]
#[clap(name = "treasury", about = "Run the treasury bot against an in-memory ledger")]
pub struct CliOpt {
    #[clap(flatten)]
    pub treasury: TreasuryOpt,

    #[clap(long = "group-name", default_value = "treasury")]
    /// Name of the group formed at start.
    pub group_name: String,

    #[clap(long = "creator")]
    /// Wallet of the group creator, `0x` followed by 40 hex digits.
    pub creator: WalletAddress,

    #[clap(long = "creator-name", default_value = "creator")]
    pub creator_name: String,

    #[clap(long = "member", parse(try_from_str = parse_member))]
    /// Initial member as `0x<address>=<display name>`, repeat for several members.
    pub members: Vec<(WalletAddress, String)>,

    #[clap(long = "required-deposit", default_value = "0")]
    /// Deposit in base units a member pays before voting.
    pub required_deposit: u128,
}

fn parse_member(s: &str) -> Result<(WalletAddress, String)> {
    let (wallet, name) = s
        .split_once('=')
        .ok_or_else(|| format_err!("member `{}` is not `0x<address>=<name>`", s))?;
    Ok((wallet.trim().parse()?, name.trim().to_string()))
}

fn apply_logger_config(handle: &LoggerHandle, config: &LoggerConfig) -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        handle.update_level(config.level_filter()?);
    }
    if let Some(log_file) = config.log_file.as_ref() {
        handle.enable_file(log_file.clone(), config.max_file_size, config.max_backup);
    }
    if !config.enable_stderr {
        handle.disable_stderr();
    }
    Ok(())
}

async fn run(opt: CliOpt, config: TreasuryConfig) -> Result<()> {
    let time_service = MockTimeService::new_with_value(RealTimeService::new().now_millis());
    let ledger = MockLedger::new_arc(time_service.clone());
    let marketplace = Arc::new(MockMarketplace::new(time_service.clone()));

    let metrics_registry = prometheus::Registry::new();
    let metrics = RelayerMetrics::register(&metrics_registry)?;
    let relayer = Arc::new(
        Relayer::from_config(
            &config.relay,
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(time_service.clone()),
        )
        .with_metrics(metrics),
    );
    let engine = Arc::new(ProposalEngine::new(
        ledger.clone(),
        marketplace.clone(),
        relayer.clone(),
        config.governance.clone(),
    ));
    let group_id = engine
        .registry()
        .create_group(
            opt.creator,
            NewGroup {
                name: opt.group_name.clone(),
                creator_display_name: opt.creator_name.clone(),
                required_deposit: opt.required_deposit,
                is_private: false,
            },
        )
        .await
        .map_err(|e| format_err!("form group: {}", e))?;
    // initial members are written straight to the in-memory ledger
    let ctx = relayer.context(opt.creator);
    for (wallet, name) in opt.members {
        ledger
            .add_member(&ctx, group_id, wallet, name.clone())
            .await
            .map_err(|e| format_err!("add member {}: {}", wallet, e))?;
        info!("{} ({}) joined group {}", name, wallet, group_id);
    }

    let bot = TreasuryBot::from_config(
        &config.bot,
        &config.governance,
        engine,
        ledger.clone() as Arc<dyn TreasuryLedger>,
    )?;
    let session = Session::new(
        bot,
        ledger,
        marketplace,
        time_service,
        metrics_registry,
        group_id,
    );
    session.run().await
}

fn main() -> Result<()> {
    let opt = CliOpt::parse();
    let logger_handle = treasury_logger::init();
    let config = TreasuryConfig::load_with_opt(&opt.treasury)?;
    apply_logger_config(&logger_handle, &config.logger)?;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .thread_name("treasury")
        .enable_all()
        .build()?;
    rt.block_on(run(opt, config))
}
