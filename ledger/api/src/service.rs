// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{CallContext, LedgerResult};
use treasury_types::{
    Group, GroupId, Member, NewGroup, NewProposal, ProposalId, ProposalRecord, TreasuryBalance,
    WalletAddress,
};

/// The authoritative store of groups, members, proposals, votes and balances.
///
/// The ledger serializes every mutating call and enforces the same rules the
/// engine checks up front, a rejected call changes nothing.
#[async_trait::async_trait]
pub trait TreasuryLedger: Send + Sync {
    /// Timestamp of the latest block in seconds, the clock of proposal deadlines.
    async fn block_time(&self) -> LedgerResult<u64>;

    /// Form a group, the caller becomes its creator and first member.
    async fn create_group(&self, ctx: &CallContext, group: NewGroup) -> LedgerResult<GroupId>;

    async fn get_group(&self, group_id: GroupId) -> LedgerResult<Option<Group>>;

    async fn get_member(
        &self,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> LedgerResult<Option<Member>>;

    /// All recorded members, including inactive ones.
    async fn get_group_members(&self, group_id: GroupId) -> LedgerResult<Vec<Member>>;

    async fn get_treasury(&self, group_id: GroupId) -> LedgerResult<TreasuryBalance>;

    /// Pay `amount` base units of the group's native currency into the treasury.
    async fn deposit(&self, ctx: &CallContext, group_id: GroupId, amount: u128)
        -> LedgerResult<()>;

    async fn create_proposal(
        &self,
        ctx: &CallContext,
        proposal: NewProposal,
    ) -> LedgerResult<ProposalId>;

    async fn get_proposal(&self, proposal_id: ProposalId) -> LedgerResult<Option<ProposalRecord>>;

    async fn list_proposals(&self, group_id: GroupId) -> LedgerResult<Vec<ProposalRecord>>;

    async fn has_voted(&self, proposal_id: ProposalId, voter: WalletAddress)
        -> LedgerResult<bool>;

    /// Record the caller's vote, a second vote of the same wallet is `AlreadyVoted`.
    async fn vote(&self, ctx: &CallContext, proposal_id: ProposalId, support: bool)
        -> LedgerResult<()>;

    /// Claim the proposal for execution. Succeeds at most once per proposal.
    async fn mark_executed(&self, ctx: &CallContext, proposal_id: ProposalId) -> LedgerResult<()>;

    async fn cancel_proposal(&self, ctx: &CallContext, proposal_id: ProposalId)
        -> LedgerResult<()>;

    async fn add_member(
        &self,
        ctx: &CallContext,
        group_id: GroupId,
        wallet: WalletAddress,
        display_name: String,
    ) -> LedgerResult<()>;

    async fn deactivate_member(
        &self,
        ctx: &CallContext,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> LedgerResult<()>;
}
