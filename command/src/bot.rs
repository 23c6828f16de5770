// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::dispatcher::{CommandDispatcher, DispatchContext, DispatchOutcome};
use crate::grammar::CommandRegistry;
use crate::parser::CommandParser;
use anyhow::Result;
use std::sync::Arc;
use treasury_config::{BotConfig, GovernanceConfig};
use treasury_governance::{GovernanceError, ProposalEngine};
use treasury_ledger_api::TreasuryLedger;
use treasury_logger::prelude::*;
use treasury_relayer::{RelayOp, Relayer};
use treasury_types::{GroupId, WalletAddress};

pub const HELP_HINT: &str = "I did not catch a command there, try `@bot help`.";

/// Chat entry point: every message of a group passes through `on_message`.
pub struct TreasuryBot {
    parser: CommandParser,
    dispatcher: CommandDispatcher,
    relayer: Arc<Relayer>,
}

impl TreasuryBot {
    pub fn new(parser: CommandParser, dispatcher: CommandDispatcher, relayer: Arc<Relayer>) -> Self {
        Self {
            parser,
            dispatcher,
            relayer,
        }
    }

    pub fn from_config(
        bot: &BotConfig,
        governance: &GovernanceConfig,
        engine: Arc<ProposalEngine>,
        ledger: Arc<dyn TreasuryLedger>,
    ) -> Result<Self> {
        let registry = Arc::new(CommandRegistry::treasury(governance.vote_threshold())?);
        let parser = CommandParser::new(registry.clone(), &bot.mentions())?;
        let relayer = engine.relayer().clone();
        let dispatcher = CommandDispatcher::new(registry, engine, ledger);
        Ok(Self::new(parser, dispatcher, relayer))
    }

    pub fn parser(&self) -> &CommandParser {
        &self.parser
    }

    pub fn engine(&self) -> &Arc<ProposalEngine> {
        self.dispatcher.engine()
    }

    /// Admit the message against the sender's and the group's quota, then
    /// answer it when it is addressed to the bot. `None` means no reply.
    pub async fn on_message(
        &self,
        group_id: GroupId,
        sender: WalletAddress,
        message: &str,
    ) -> Option<DispatchOutcome> {
        if let Err(e) = self
            .relayer
            .admit(sender, Some(group_id), RelayOp::SendMessage)
            .await
        {
            let e = GovernanceError::from(e);
            warn!("Message from {} in group {} refused: {}", sender, group_id, e);
            return Some(DispatchOutcome::failure(None, e.kind(), e.user_message()));
        }
        let parsed = self.parser.parse(message);
        match parsed.command {
            Some(matched) => {
                let ctx = DispatchContext {
                    group_id,
                    sender,
                    raw_message: message.to_string(),
                };
                let outcome = self
                    .dispatcher
                    .dispatch(matched.kind, &matched.args, &ctx)
                    .await;
                info!(
                    "{} from {} in group {}: success={} kind={}",
                    matched.kind,
                    sender,
                    group_id,
                    outcome.success,
                    outcome.error_kind.map(|k| k.as_str()).unwrap_or("none")
                );
                Some(outcome)
            }
            None if parsed.mentioned => Some(DispatchOutcome::reply(None, HELP_HINT)),
            None => None,
        }
    }
}
