// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, format_err, Result};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use treasury_command::{DispatchOutcome, TreasuryBot};
use treasury_governance::GovernanceError;
use treasury_ledger_api::TreasuryLedger;
use treasury_ledger_mock::{MockLedger, MockMarketplace};
use treasury_logger::prelude::*;
use treasury_time_service::{MockTimeService, RealTimeService, TimeService};
use treasury_types::{DecimalAmount, GroupId, ProposalId, WalletAddress};

const USAGE: &str = "lines: <wallet> <message> | <wallet> /vote <id> yes|no | <wallet> /execute <id> \
| <wallet> /cancel <id> | <wallet> /deposit <amount> | /wait <secs> | /metrics";

/// Console loop feeding stdin lines to the bot and the engine.
pub struct Session {
    bot: TreasuryBot,
    ledger: Arc<MockLedger>,
    marketplace: Arc<MockMarketplace>,
    time_service: MockTimeService,
    metrics: prometheus::Registry,
    group_id: GroupId,
    /// Seconds skipped ahead of the wall clock with `/wait`.
    skipped_secs: u64,
}

impl Session {
    pub fn new(
        bot: TreasuryBot,
        ledger: Arc<MockLedger>,
        marketplace: Arc<MockMarketplace>,
        time_service: MockTimeService,
        metrics: prometheus::Registry,
        group_id: GroupId,
    ) -> Self {
        Self {
            bot,
            ledger,
            marketplace,
            time_service,
            metrics,
            group_id,
            skipped_secs: 0,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        println!("Group {} is ready. {}", self.group_id, USAGE);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.sync_clock();
            match self.handle_line(line).await {
                Ok(Some(reply)) => println!("{}", reply),
                Ok(None) => {}
                Err(e) => println!("[error] {}", e),
            }
        }
        info!(
            "Session ended, {} marketplace order(s) submitted",
            self.marketplace.submitted()
        );
        Ok(())
    }

    fn sync_clock(&self) {
        let now = RealTimeService::new().now_millis();
        self.time_service
            .set(now + Duration::from_secs(self.skipped_secs).as_millis() as u64);
    }

    async fn handle_line(&mut self, line: &str) -> Result<Option<String>> {
        if let Some(command) = line.strip_prefix('/') {
            return self.handle_global(command);
        }
        let (wallet, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| format_err!("expected `<wallet> <message>`"))?;
        let sender: WalletAddress = wallet.parse()?;
        let rest = rest.trim();
        match rest.strip_prefix('/') {
            Some(command) => self.handle_slash(sender, command).await.map(Some),
            None => Ok(self
                .bot
                .on_message(self.group_id, sender, rest)
                .await
                .map(|outcome| render_outcome(&outcome))),
        }
    }

    fn handle_global(&mut self, command: &str) -> Result<Option<String>> {
        let mut words = command.split_whitespace();
        match (words.next(), words.next()) {
            (Some("wait"), Some(secs)) => {
                self.skipped_secs += secs.parse::<u64>()?;
                self.sync_clock();
                Ok(Some(format!("[ok] clock moved {}s ahead", self.skipped_secs)))
            }
            (Some("metrics"), None) => {
                let mut buffer = vec![];
                TextEncoder::new().encode(&self.metrics.gather(), &mut buffer)?;
                Ok(Some(String::from_utf8(buffer)?))
            }
            _ => bail!("unknown command, {}", USAGE),
        }
    }

    async fn handle_slash(&self, sender: WalletAddress, command: &str) -> Result<String> {
        let engine = self.bot.engine();
        let words = command.split_whitespace().collect::<Vec<_>>();
        let proposal_id = |word: Option<&&str>| -> Result<ProposalId> {
            let word = word.ok_or_else(|| format_err!("missing proposal id"))?;
            Ok(ProposalId::new(word.trim_start_matches('#').parse()?))
        };
        let result = match words.first().copied() {
            Some("vote") => {
                let support = match words.get(2).map(|w| w.to_ascii_lowercase()) {
                    Some(w) if w == "yes" || w == "for" => true,
                    Some(w) if w == "no" || w == "against" => false,
                    _ => bail!("expected `/vote <id> yes|no`"),
                };
                engine
                    .vote(proposal_id(words.get(1))?, sender, support)
                    .await
                    .map(|view| format!("[ok] {}", view.summary()))
            }
            Some("execute") => engine
                .execute(proposal_id(words.get(1))?, sender)
                .await
                .map(|report| match report.receipt {
                    Some(receipt) => format!(
                        "[ok] proposal #{} executed: {} (tx {})",
                        report.proposal_id,
                        report.action.summary(),
                        receipt.tx_hash
                    ),
                    None => format!(
                        "[ok] proposal #{} executed: {}",
                        report.proposal_id,
                        report.action.summary()
                    ),
                }),
            Some("cancel") => engine
                .cancel(proposal_id(words.get(1))?, sender)
                .await
                .map(|view| format!("[ok] {}", view.summary())),
            Some("deposit") => {
                let amount: DecimalAmount = words
                    .get(1)
                    .ok_or_else(|| format_err!("expected `/deposit <amount>`"))?
                    .parse()?;
                let treasury = self.ledger.get_treasury(self.group_id).await?;
                let base_units = amount.to_base_units(treasury.decimals)?;
                engine
                    .registry()
                    .deposit(self.group_id, sender, base_units)
                    .await
                    .map(|_| format!("[ok] deposited {} {}", amount, treasury.currency))
            }
            _ => bail!("unknown command, {}", USAGE),
        };
        Ok(result.unwrap_or_else(|e| render_error(&e)))
    }
}

fn render_outcome(outcome: &DispatchOutcome) -> String {
    match outcome.error_kind {
        Some(kind) => format!("[{}] {}", kind, outcome.message),
        None => format!("[ok] {}", outcome.message),
    }
}

fn render_error(e: &GovernanceError) -> String {
    format!("[{}] {}", e.kind(), e.user_message())
}
