// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::grammar::CommandKind;
use thiserror::Error;
use treasury_types::ErrorKind;

pub type CommandResult<T> = std::result::Result<T, CommandError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The message named a command but its arguments do not fit the command's format.
    #[error("can not parse {command} command, expected `{expected}`{}", detail_suffix(.detail))]
    Parse {
        command: CommandKind,
        expected: &'static str,
        detail: Option<String>,
    },
    #[error("no active member named @{0}")]
    UnknownMember(String),
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_ref()
        .map(|d| format!(": {}", d))
        .unwrap_or_default()
}

impl CommandError {
    pub fn parse(command: CommandKind, expected: &'static str) -> Self {
        Self::Parse {
            command,
            expected,
            detail: None,
        }
    }

    pub fn parse_with(command: CommandKind, expected: &'static str, detail: impl ToString) -> Self {
        Self::Parse {
            command,
            expected,
            detail: Some(detail.to_string()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Parse { .. } => ErrorKind::Parse,
            Self::UnknownMember(_) => ErrorKind::NotAMember,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Parse {
                expected,
                detail: Some(detail),
                ..
            } => format!("{}. Usage: {}", capitalize(detail), expected),
            Self::Parse { expected, .. } => format!("I could not read that. Usage: {}", expected),
            Self::UnknownMember(username) => {
                format!("@{} is not an active member of this group.", username)
            }
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
