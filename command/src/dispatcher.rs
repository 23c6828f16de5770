// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::grammar::{CommandKind, CommandRegistry};
use crate::handlers::{HandlerContext, HandlerOutput};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use treasury_governance::{GovernanceError, GovernanceResult, ProposalEngine, ProposalView};
use treasury_ledger_api::TreasuryLedger;
use treasury_logger::prelude::*;
use treasury_types::{
    ErrorKind, Group, GroupId, Member, ProposalAction, ProposalId, ProposalType,
    TreasuryBalance, WalletAddress,
};

pub const INTERNAL_ERROR_MESSAGE: &str =
    "Something went wrong handling that command, please try again.";

/// Read-only view of a group handed to handlers.
#[derive(Clone, Debug)]
pub struct GroupSnapshot {
    pub group: Group,
    pub members: Vec<Member>,
    pub treasury: TreasuryBalance,
    pub open_proposals: Vec<ProposalView>,
}

impl GroupSnapshot {
    pub fn active_member_count(&self) -> usize {
        self.members
            .iter()
            .filter(|m| m.has_voting_rights(&self.group))
            .count()
    }

    /// Active member whose display name is `username`, `@` and case ignored.
    pub fn find_active_member(&self, username: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.is_active && m.matches_username(username))
    }
}

#[derive(Clone, Debug)]
pub struct DispatchContext {
    pub group_id: GroupId,
    pub sender: WalletAddress,
    pub raw_message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub message: String,
    pub command: Option<CommandKind>,
    pub proposal_required: bool,
    pub proposal_type: Option<ProposalType>,
    pub action: Option<ProposalAction>,
    pub proposal_id: Option<ProposalId>,
    pub error_kind: Option<ErrorKind>,
}

impl DispatchOutcome {
    pub fn reply(command: Option<CommandKind>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            command,
            proposal_required: false,
            proposal_type: None,
            action: None,
            proposal_id: None,
            error_kind: None,
        }
    }

    pub fn failure(command: Option<CommandKind>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            command,
            proposal_required: false,
            proposal_type: None,
            action: None,
            proposal_id: None,
            error_kind: Some(kind),
        }
    }

    fn with_action(mut self, action: ProposalAction) -> Self {
        self.proposal_required = true;
        self.proposal_type = Some(action.proposal_type());
        self.action = Some(action);
        self
    }
}

/// Runs the handler of a matched command against a fresh group snapshot and
/// opens the proposal a voting command asks for.
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
    engine: Arc<ProposalEngine>,
    ledger: Arc<dyn TreasuryLedger>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        engine: Arc<ProposalEngine>,
        ledger: Arc<dyn TreasuryLedger>,
    ) -> Self {
        Self {
            registry,
            engine,
            ledger,
        }
    }

    pub fn engine(&self) -> &Arc<ProposalEngine> {
        &self.engine
    }

    pub async fn snapshot(&self, group_id: GroupId) -> GovernanceResult<GroupSnapshot> {
        let group = self.engine.registry().group(group_id).await?;
        let members = self.ledger.get_group_members(group_id).await?;
        let treasury = self.ledger.get_treasury(group_id).await?;
        let open_proposals = self.engine.open_proposals(group_id).await?;
        Ok(GroupSnapshot {
            group,
            members,
            treasury,
            open_proposals,
        })
    }

    pub async fn dispatch(
        &self,
        kind: CommandKind,
        args: &str,
        ctx: &DispatchContext,
    ) -> DispatchOutcome {
        let command = match self.registry.get(kind) {
            Some(command) => command,
            None => {
                error!("Command {} is not registered", kind);
                return DispatchOutcome::failure(Some(kind), ErrorKind::Internal, INTERNAL_ERROR_MESSAGE);
            }
        };
        let snapshot = match self.snapshot(ctx.group_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Self::governance_failure(kind, ctx, e),
        };
        let currencies = self.engine.currencies();
        let handler_ctx = HandlerContext {
            group_id: ctx.group_id,
            sender: ctx.sender,
            args,
            snapshot: &snapshot,
            currencies,
            registry: &self.registry,
        };
        let output = match panic::catch_unwind(AssertUnwindSafe(|| (command.handler)(&handler_ctx))) {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                debug!("Command `{}` from {} rejected: {}", ctx.raw_message, ctx.sender, e);
                return DispatchOutcome::failure(Some(kind), e.kind(), e.user_message());
            }
            Err(_) => {
                error!(
                    "Handler of {} panicked on `{}` from {} in group {}",
                    kind, ctx.raw_message, ctx.sender, ctx.group_id
                );
                return DispatchOutcome::failure(Some(kind), ErrorKind::Internal, INTERNAL_ERROR_MESSAGE);
            }
        };
        match output {
            HandlerOutput::Reply(message) => DispatchOutcome::reply(Some(kind), message),
            HandlerOutput::Propose(action) => {
                let threshold = command
                    .vote_threshold
                    .unwrap_or_else(|| self.engine.config().vote_threshold());
                match self
                    .engine
                    .create(ctx.group_id, ctx.sender, action.clone(), threshold)
                    .await
                {
                    Ok(view) => {
                        let mut outcome = DispatchOutcome::reply(
                            Some(kind),
                            format!(
                                "Proposal #{} to {} is open: {} of {} member(s) must vote for it before {}.",
                                view.id(),
                                view.proposal.action.summary(),
                                view.required_votes,
                                view.active_members,
                                view.proposal.deadline
                            ),
                        )
                        .with_action(action);
                        outcome.proposal_id = Some(view.id());
                        outcome
                    }
                    Err(e) => Self::governance_failure(kind, ctx, e).with_action(action),
                }
            }
        }
    }

    fn governance_failure(kind: CommandKind, ctx: &DispatchContext, e: GovernanceError) -> DispatchOutcome {
        match e.kind() {
            ErrorKind::Relay | ErrorKind::Internal => error!(
                "Command {} from {} in group {} failed: {:?}",
                kind, ctx.sender, ctx.group_id, e
            ),
            _ => warn!(
                "Command {} from {} in group {} rejected: {}",
                kind, ctx.sender, ctx.group_id, e
            ),
        }
        DispatchOutcome::failure(Some(kind), e.kind(), e.user_message())
    }
}
