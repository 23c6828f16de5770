// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

mod bot;
mod dispatcher;
mod error;
mod grammar;
pub mod handlers;
mod parser;

pub use bot::{TreasuryBot, HELP_HINT};
pub use dispatcher::{
    CommandDispatcher, DispatchContext, DispatchOutcome, GroupSnapshot, INTERNAL_ERROR_MESSAGE,
};
pub use error::{CommandError, CommandResult};
pub use grammar::{Command, CommandKind, CommandRegistry};
pub use parser::{CommandMatch, CommandParser, ParsedMessage};
