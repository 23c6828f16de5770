// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::grammar::{CommandKind, CommandRegistry};
use anyhow::Result;
use regex::Regex;
use std::cmp::Reverse;
use std::sync::Arc;
use treasury_logger::prelude::*;

/// The command selected for a message and the text from its trigger on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandMatch {
    pub kind: CommandKind,
    pub args: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedMessage {
    pub is_command: bool,
    /// The bot was addressed, even if no command followed.
    pub mentioned: bool,
    pub command: Option<CommandMatch>,
    /// The message with mentions removed and whitespace collapsed.
    pub body: String,
}

impl ParsedMessage {
    fn not_a_command(mentioned: bool, body: String) -> Self {
        Self {
            is_command: false,
            mentioned,
            command: None,
            body,
        }
    }
}

pub struct CommandParser {
    registry: Arc<CommandRegistry>,
    mention: Option<Regex>,
}

impl CommandParser {
    /// Messages are candidates only when they contain one of `mentions`,
    /// compared case insensitively.
    pub fn new(registry: Arc<CommandRegistry>, mentions: &[String]) -> Result<Self> {
        let mut tokens = mentions
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect::<Vec<_>>();
        // longer tokens first, `@treasury ai` must not leave `ai` behind
        tokens.sort_by_key(|m| Reverse(m.len()));
        tokens.dedup();
        let mention = if tokens.is_empty() {
            None
        } else {
            let alternatives = tokens
                .iter()
                .map(|token| mention_pattern(token))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!("(?i)(?:{})", alternatives))?)
        };
        Ok(Self { registry, mention })
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.registry
    }

    pub fn is_mentioned(&self, message: &str) -> bool {
        self.mention
            .as_ref()
            .map(|m| m.is_match(message))
            .unwrap_or(false)
    }

    pub fn strip_mentions(&self, message: &str) -> String {
        let stripped = match &self.mention {
            Some(mention) => mention.replace_all(message, " "),
            None => message.into(),
        };
        stripped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Select the command of `message`: the first registered command with a
    /// matching trigger, unless a longer trigger of another command matches
    /// overlapping text (`rent out` over `rent`).
    pub fn parse(&self, message: &str) -> ParsedMessage {
        if !self.is_mentioned(message) {
            return ParsedMessage::not_a_command(false, message.trim().to_string());
        }
        let body = self.strip_mentions(message);
        let text = body.as_str();
        let matches = self
            .registry
            .commands()
            .iter()
            .filter_map(|command| {
                command
                    .triggers
                    .iter()
                    .filter_map(|trigger| trigger.find(text))
                    .min_by_key(|m| (m.start(), Reverse(m.len())))
                    .map(|m| (command.kind, m.range()))
            })
            .collect::<Vec<_>>();
        let best = matches.first().map(|(first_kind, first)| {
            matches
                .iter()
                .filter(|(_, range)| range.start < first.end && first.start < range.end)
                .fold((*first_kind, first.clone()), |best, (kind, range)| {
                    if range.len() > best.1.len() {
                        (*kind, range.clone())
                    } else {
                        best
                    }
                })
        });
        match best {
            Some((kind, range)) => {
                let args = body[range.start..].to_string();
                debug!("Message `{}` parsed as {} `{}`", message, kind, args);
                ParsedMessage {
                    is_command: true,
                    mentioned: true,
                    command: Some(CommandMatch { kind, args }),
                    body,
                }
            }
            None => {
                debug!("Message `{}` mentions the bot but names no command", message);
                ParsedMessage::not_a_command(true, body)
            }
        }
    }
}

fn mention_pattern(token: &str) -> String {
    let is_word = |c: Option<char>| c.map(|c| c.is_alphanumeric() || c == '_').unwrap_or(false);
    let body = token
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    format!(
        "{}{}{}",
        if is_word(token.chars().next()) { r"\b" } else { "" },
        body,
        if is_word(token.chars().last()) { r"\b" } else { "" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Command;
    use crate::handlers;

    fn parser() -> CommandParser {
        CommandParser::new(
            Arc::new(CommandRegistry::treasury(90).unwrap()),
            &["@bot".to_string(), "@treasury ai".to_string()],
        )
        .unwrap()
    }

    fn kind_of(parser: &CommandParser, message: &str) -> Option<CommandKind> {
        parser.parse(message).command.map(|m| m.kind)
    }

    #[test]
    fn test_mention_required() {
        let parser = parser();
        let parsed = parser.parse("buy BAYC #42");
        assert!(!parsed.is_command);
        assert!(!parsed.mentioned);
        assert!(!parser.is_mentioned("@botany buy BAYC #42"));
        assert!(parser.is_mentioned("hey @BOT"));
        assert!(parser.is_mentioned("@Treasury  AI balance"));
    }

    #[test]
    fn test_mentions_removed() {
        let parser = parser();
        assert_eq!(
            parser.strip_mentions("@treasury ai  buy BAYC #42 @bot"),
            "buy BAYC #42"
        );
        let parsed = parser.parse("@Treasury AI buy BAYC #42");
        assert_eq!(
            parsed.command,
            Some(CommandMatch {
                kind: CommandKind::Buy,
                args: "buy BAYC #42".to_string(),
            })
        );
    }

    #[test]
    fn test_mention_without_command() {
        let parsed = parser().parse("@bot good morning");
        assert!(!parsed.is_command);
        assert!(parsed.mentioned);
        assert_eq!(parsed.body, "good morning");
    }

    #[test]
    fn test_first_registered_command_wins() {
        let parser = parser();
        assert_eq!(
            parser.parse("@bot help me buy BAYC #42").command,
            Some(CommandMatch {
                kind: CommandKind::Buy,
                args: "buy BAYC #42".to_string(),
            })
        );
        assert_eq!(
            kind_of(&parser, "@bot sell my ape then buy BAYC #1"),
            Some(CommandKind::Buy)
        );
        assert_eq!(
            kind_of(&parser, "@bot I want to leave, what is the balance"),
            Some(CommandKind::Balance)
        );
        assert_eq!(
            parser.parse("@bot please, I want to leave").command,
            Some(CommandMatch {
                kind: CommandKind::Leave,
                args: "I want to leave".to_string(),
            })
        );
    }

    #[test]
    fn test_longer_overlapping_trigger_wins() {
        let registry = CommandRegistry::from_commands(vec![
            Command::info(
                CommandKind::Balance,
                &["rent"],
                "rent in",
                handlers::BALANCE_USAGE,
                handlers::balance,
            )
            .unwrap(),
            Command::proposal(
                CommandKind::RentOut,
                &["rent out"],
                "rent out",
                handlers::RENT_OUT_USAGE,
                treasury_types::ProposalType::RentNft,
                90,
                handlers::rent_out,
            )
            .unwrap(),
        ])
        .unwrap();
        let parser = CommandParser::new(Arc::new(registry), &["@bot".to_string()]).unwrap();
        assert_eq!(
            kind_of(&parser, "@bot rent out BAYC #1"),
            Some(CommandKind::RentOut)
        );
        assert_eq!(
            kind_of(&parser, "@bot rent BAYC #1"),
            Some(CommandKind::Balance)
        );
    }

    #[test]
    fn test_registry_order_breaks_remaining_ties() {
        let registry = CommandRegistry::from_commands(vec![
            Command::info(
                CommandKind::Proposals,
                &["show"],
                "first",
                handlers::PROPOSALS_USAGE,
                handlers::proposals,
            )
            .unwrap(),
            Command::info(
                CommandKind::Balance,
                &["show"],
                "second",
                handlers::BALANCE_USAGE,
                handlers::balance,
            )
            .unwrap(),
        ])
        .unwrap();
        let parser = CommandParser::new(Arc::new(registry), &["@bot".to_string()]).unwrap();
        assert_eq!(kind_of(&parser, "@bot show"), Some(CommandKind::Proposals));
    }

    #[test]
    fn test_no_mentions_configured() {
        let parser =
            CommandParser::new(Arc::new(CommandRegistry::treasury(90).unwrap()), &[]).unwrap();
        assert!(!parser.parse("@bot help").is_command);
    }
}
