// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::handlers::{self, Handler};
use anyhow::{ensure, Result};
use regex::Regex;
use std::fmt;
use treasury_types::ProposalType;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Buy,
    Sell,
    RentOut,
    Swap,
    Transfer,
    Balance,
    Proposals,
    AddMember,
    RemoveMember,
    Leave,
    Help,
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::RentOut => "rent out",
            Self::Swap => "swap",
            Self::Transfer => "transfer",
            Self::Balance => "balance",
            Self::Proposals => "proposals",
            Self::AddMember => "add member",
            Self::RemoveMember => "remove member",
            Self::Leave => "leave",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the command registry.
pub struct Command {
    pub kind: CommandKind,
    /// Word bounded, case insensitive patterns that select this command.
    pub triggers: Vec<Regex>,
    pub description: &'static str,
    pub usage: &'static str,
    pub requires_vote: bool,
    /// Percentage of active members whose vote passes the proposal.
    pub vote_threshold: Option<u8>,
    pub proposal_type: Option<ProposalType>,
    pub handler: Handler,
}

impl Command {
    /// A command answered right away.
    pub fn info(
        kind: CommandKind,
        triggers: &[&str],
        description: &'static str,
        usage: &'static str,
        handler: Handler,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            triggers: compile_triggers(triggers)?,
            description,
            usage,
            requires_vote: false,
            vote_threshold: None,
            proposal_type: None,
            handler,
        })
    }

    /// A command that opens a proposal of `proposal_type`.
    pub fn proposal(
        kind: CommandKind,
        triggers: &[&str],
        description: &'static str,
        usage: &'static str,
        proposal_type: ProposalType,
        vote_threshold: u8,
        handler: Handler,
    ) -> Result<Self> {
        Ok(Self {
            kind,
            triggers: compile_triggers(triggers)?,
            description,
            usage,
            requires_vote: true,
            vote_threshold: Some(vote_threshold),
            proposal_type: Some(proposal_type),
            handler,
        })
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("kind", &self.kind)
            .field("usage", &self.usage)
            .field("requires_vote", &self.requires_vote)
            .field("vote_threshold", &self.vote_threshold)
            .finish()
    }
}

/// Compile trigger phrases into `(?i)\b<phrase>\b`, words separated by any whitespace.
fn compile_triggers(phrases: &[&str]) -> Result<Vec<Regex>> {
    phrases
        .iter()
        .map(|phrase| {
            let words = phrase
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+");
            Ok(Regex::new(&format!(r"(?i)\b{}\b", words))?)
        })
        .collect()
}

/// Ordered, immutable set of commands. Order breaks ties between triggers
/// that start at the same offset and have the same length.
#[derive(Debug)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    pub fn from_commands(commands: Vec<Command>) -> Result<Self> {
        for (i, command) in commands.iter().enumerate() {
            ensure!(
                !command.triggers.is_empty(),
                "command {} has no trigger",
                command.kind
            );
            ensure!(
                commands[..i].iter().all(|c| c.kind != command.kind),
                "command {} registered twice",
                command.kind
            );
        }
        Ok(Self { commands })
    }

    /// The group treasury commands, proposals pass with `vote_threshold` percent.
    pub fn treasury(vote_threshold: u8) -> Result<Self> {
        ensure!(
            (1..=100).contains(&vote_threshold),
            "vote threshold {} is outside 1..=100",
            vote_threshold
        );
        Self::from_commands(vec![
            Command::proposal(
                CommandKind::Buy,
                &["buy"],
                "Propose buying an NFT with treasury funds",
                handlers::BUY_USAGE,
                ProposalType::BuyNft,
                vote_threshold,
                handlers::buy,
            )?,
            Command::proposal(
                CommandKind::Sell,
                &["sell"],
                "Propose listing a treasury NFT for sale",
                handlers::SELL_USAGE,
                ProposalType::SellNft,
                vote_threshold,
                handlers::sell,
            )?,
            Command::proposal(
                CommandKind::RentOut,
                &["rent out"],
                "Propose renting out a treasury NFT",
                handlers::RENT_OUT_USAGE,
                ProposalType::RentNft,
                vote_threshold,
                handlers::rent_out,
            )?,
            Command::proposal(
                CommandKind::Swap,
                &["swap"],
                "Propose swapping a treasury NFT for another one",
                handlers::SWAP_USAGE,
                ProposalType::SwapNft,
                vote_threshold,
                handlers::swap,
            )?,
            Command::proposal(
                CommandKind::Transfer,
                &["transfer"],
                "Propose sending treasury funds to an address",
                handlers::TRANSFER_USAGE,
                ProposalType::TransferFunds,
                vote_threshold,
                handlers::transfer,
            )?,
            Command::info(
                CommandKind::Balance,
                &["balance"],
                "Show the treasury balance",
                handlers::BALANCE_USAGE,
                handlers::balance,
            )?,
            Command::info(
                CommandKind::Proposals,
                &["proposals"],
                "List proposals open for voting",
                handlers::PROPOSALS_USAGE,
                handlers::proposals,
            )?,
            Command::proposal(
                CommandKind::AddMember,
                &["add member"],
                "Propose adding a member",
                handlers::ADD_MEMBER_USAGE,
                ProposalType::AddMember,
                vote_threshold,
                handlers::add_member,
            )?,
            Command::proposal(
                CommandKind::RemoveMember,
                &["remove member"],
                "Propose removing a member",
                handlers::REMOVE_MEMBER_USAGE,
                ProposalType::RemoveMember,
                vote_threshold,
                handlers::remove_member,
            )?,
            Command::proposal(
                CommandKind::Leave,
                &["i want to leave", "leave"],
                "Propose leaving the group",
                handlers::LEAVE_USAGE,
                ProposalType::WithdrawMember,
                vote_threshold,
                handlers::leave,
            )?,
            Command::info(
                CommandKind::Help,
                &["help"],
                "Show this help",
                handlers::HELP_USAGE,
                handlers::help,
            )?,
        ])
    }

    pub fn commands(&self) -> &[Command] {
        self.commands.as_slice()
    }

    pub fn get(&self, kind: CommandKind) -> Option<&Command> {
        self.commands.iter().find(|c| c.kind == kind)
    }

    pub fn help_text(&self) -> String {
        let mut text = String::from("Here is what I can do:");
        for command in &self.commands {
            text.push_str(&format!("\n  {}: {}", command.usage, command.description));
            if let Some(threshold) = command.vote_threshold {
                text.push_str(&format!(" ({}% vote)", threshold));
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_treasury_registry() {
        let registry = CommandRegistry::treasury(75).unwrap();
        assert_eq!(registry.commands().len(), 11);
        let buy = registry.get(CommandKind::Buy).unwrap();
        assert!(buy.requires_vote);
        assert_eq!(buy.vote_threshold, Some(75));
        assert_eq!(buy.proposal_type, Some(ProposalType::BuyNft));
        let balance = registry.get(CommandKind::Balance).unwrap();
        assert!(!balance.requires_vote);
        assert_eq!(balance.vote_threshold, None);
        assert!(registry.help_text().contains("(75% vote)"));
        assert!(CommandRegistry::treasury(0).is_err());
        assert!(CommandRegistry::treasury(101).is_err());
    }

    #[test]
    fn test_triggers_are_word_bounded() {
        let triggers = compile_triggers(&["rent out", "buy"]).unwrap();
        assert!(triggers[0].is_match("please RENT   out my ape"));
        assert!(!triggers[0].is_match("rentout"));
        assert!(!triggers[1].is_match("buyer"));
        assert!(triggers[1].is_match("Buy BAYC #1"));
    }

    #[test]
    fn test_duplicate_command_rejected() {
        let help = || {
            Command::info(
                CommandKind::Help,
                &["help"],
                "help",
                handlers::HELP_USAGE,
                handlers::help,
            )
            .unwrap()
        };
        assert!(CommandRegistry::from_commands(vec![help(), help()]).is_err());
    }
}
