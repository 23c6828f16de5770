// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::fault::{Fault, FaultPlan};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use treasury_ledger_api::{CallContext, LedgerError, LedgerResult, TreasuryLedger};
use treasury_logger::prelude::*;
use treasury_time_service::{MockTimeService, TimeService};
use treasury_types::{
    required_votes, Currency, Group, GroupId, Member, NewGroup, NewProposal, ProposalId,
    ProposalRecord, TreasuryBalance, WalletAddress,
};

const NATIVE_CURRENCY: &str = "ETH";
const NATIVE_DECIMALS: u8 = 18;

struct GroupEntry {
    group: Group,
    members: Vec<Member>,
    native_balance: u128,
    nft_count: u64,
}

impl GroupEntry {
    fn member(&self, wallet: &WalletAddress) -> Option<&Member> {
        self.members.iter().find(|m| &m.wallet == wallet)
    }

    fn member_mut(&mut self, wallet: &WalletAddress) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| &m.wallet == wallet)
    }

    fn can_vote(&self, wallet: &WalletAddress) -> bool {
        self.member(wallet)
            .map(|m| m.has_voting_rights(&self.group))
            .unwrap_or(false)
    }

    fn voting_member_count(&self) -> u32 {
        self.members
            .iter()
            .filter(|m| m.has_voting_rights(&self.group))
            .count() as u32
    }

    fn refresh_member_count(&mut self) {
        self.group.member_count = self.members.iter().filter(|m| m.is_active).count() as u32;
    }
}

struct ProposalEntry {
    record: ProposalRecord,
    voters: HashSet<WalletAddress>,
}

#[derive(Default)]
struct LedgerState {
    next_group_id: u64,
    next_proposal_id: u64,
    groups: BTreeMap<GroupId, GroupEntry>,
    proposals: BTreeMap<ProposalId, ProposalEntry>,
}

impl LedgerState {
    fn group(&self, group_id: GroupId) -> LedgerResult<&GroupEntry> {
        self.groups
            .get(&group_id)
            .ok_or_else(|| LedgerError::not_found(format!("group {}", group_id)))
    }

    fn group_mut(&mut self, group_id: GroupId) -> LedgerResult<&mut GroupEntry> {
        self.groups
            .get_mut(&group_id)
            .ok_or_else(|| LedgerError::not_found(format!("group {}", group_id)))
    }

    fn proposal(&self, proposal_id: ProposalId) -> LedgerResult<&ProposalEntry> {
        self.proposals
            .get(&proposal_id)
            .ok_or_else(|| LedgerError::not_found(format!("proposal {}", proposal_id)))
    }
}

fn check_open(record: &ProposalRecord, now: u64) -> LedgerResult<()> {
    if record.executed {
        return Err(LedgerError::ProposalClosed("executed".to_string()));
    }
    if record.cancelled {
        return Err(LedgerError::ProposalClosed("cancelled".to_string()));
    }
    if now > record.deadline {
        return Err(LedgerError::ProposalClosed(format!(
            "voting ended at {}",
            record.deadline
        )));
    }
    Ok(())
}

/// In-memory ledger. One mutex serializes every transition, the block time
/// comes from a `MockTimeService` tests can move forward.
pub struct MockLedger {
    time_service: MockTimeService,
    state: Mutex<LedgerState>,
    faults: FaultPlan,
}

impl MockLedger {
    pub fn new(time_service: MockTimeService) -> Self {
        Self {
            time_service,
            state: Mutex::new(LedgerState {
                next_group_id: 1,
                next_proposal_id: 1,
                ..Default::default()
            }),
            faults: FaultPlan::default(),
        }
    }

    pub fn new_arc(time_service: MockTimeService) -> Arc<Self> {
        Arc::new(Self::new(time_service))
    }

    pub fn time_service(&self) -> &MockTimeService {
        &self.time_service
    }

    /// Make the next call of `op` (a `TreasuryLedger` method name) fail.
    pub fn fail_next(&self, op: &'static str, fault: Fault) {
        self.faults.fail_next(op, fault);
    }

    /// Delay every call of `op`, `None` removes the delay.
    pub fn set_delay(&self, op: &'static str, delay: Option<Duration>) {
        self.faults.set_delay(op, delay);
    }

    pub fn call_count(&self, op: &str) -> u64 {
        self.faults.call_count(op)
    }

    pub fn set_nft_count(&self, group_id: GroupId, nft_count: u64) -> LedgerResult<()> {
        self.state.lock().group_mut(group_id)?.nft_count = nft_count;
        Ok(())
    }

    fn now(&self) -> u64 {
        self.time_service.now_secs()
    }
}

#[async_trait::async_trait]
impl TreasuryLedger for MockLedger {
    async fn block_time(&self) -> LedgerResult<u64> {
        self.faults.enter("block_time").await?;
        Ok(self.now())
    }

    async fn create_group(&self, ctx: &CallContext, group: NewGroup) -> LedgerResult<GroupId> {
        self.faults.enter("create_group").await?;
        if group.name.trim().is_empty() {
            return Err(LedgerError::Rejected("group name is empty".to_string()));
        }
        let now = self.now();
        let mut state = self.state.lock();
        let group_id = GroupId::new(state.next_group_id);
        state.next_group_id += 1;
        let creator = Member {
            wallet: ctx.sender,
            display_name: group.creator_display_name,
            joined_at: now,
            deposit_amount: 0,
            has_deposited: group.required_deposit == 0,
            is_active: true,
        };
        state.groups.insert(
            group_id,
            GroupEntry {
                group: Group {
                    id: group_id,
                    name: group.name,
                    creator: ctx.sender,
                    required_deposit: group.required_deposit,
                    is_private: group.is_private,
                    member_count: 1,
                },
                members: vec![creator],
                native_balance: 0,
                nft_count: 0,
            },
        );
        info!("[mock-ledger] group {} created by {}", group_id, ctx.sender);
        Ok(group_id)
    }

    async fn get_group(&self, group_id: GroupId) -> LedgerResult<Option<Group>> {
        self.faults.enter("get_group").await?;
        Ok(self
            .state
            .lock()
            .groups
            .get(&group_id)
            .map(|entry| entry.group.clone()))
    }

    async fn get_member(
        &self,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> LedgerResult<Option<Member>> {
        self.faults.enter("get_member").await?;
        let state = self.state.lock();
        Ok(state.group(group_id)?.member(&wallet).cloned())
    }

    async fn get_group_members(&self, group_id: GroupId) -> LedgerResult<Vec<Member>> {
        self.faults.enter("get_group_members").await?;
        let state = self.state.lock();
        Ok(state.group(group_id)?.members.clone())
    }

    async fn get_treasury(&self, group_id: GroupId) -> LedgerResult<TreasuryBalance> {
        self.faults.enter("get_treasury").await?;
        let state = self.state.lock();
        let entry = state.group(group_id)?;
        Ok(TreasuryBalance {
            native_balance: entry.native_balance,
            currency: Currency::new(NATIVE_CURRENCY),
            decimals: NATIVE_DECIMALS,
            nft_count: entry.nft_count,
        })
    }

    async fn deposit(
        &self,
        ctx: &CallContext,
        group_id: GroupId,
        amount: u128,
    ) -> LedgerResult<()> {
        self.faults.enter("deposit").await?;
        let mut state = self.state.lock();
        let entry = state.group_mut(group_id)?;
        let required = entry.group.required_deposit;
        let member = entry
            .member_mut(&ctx.sender)
            .filter(|m| m.is_active)
            .ok_or_else(|| LedgerError::Unauthorized(format!("{} is not a member", ctx.sender)))?;
        let total = member.deposit_amount.saturating_add(amount);
        if !member.has_deposited && total < required {
            return Err(LedgerError::Rejected(format!(
                "deposit of {} is below the required {}",
                total, required
            )));
        }
        member.deposit_amount = total;
        member.has_deposited = true;
        entry.native_balance = entry.native_balance.saturating_add(amount);
        Ok(())
    }

    async fn create_proposal(
        &self,
        ctx: &CallContext,
        proposal: NewProposal,
    ) -> LedgerResult<ProposalId> {
        self.faults.enter("create_proposal").await?;
        let now = self.now();
        let mut state = self.state.lock();
        if !state.group(proposal.group_id)?.can_vote(&ctx.sender) {
            return Err(LedgerError::Unauthorized(format!(
                "{} may not propose in group {}",
                ctx.sender, proposal.group_id
            )));
        }
        if proposal.deadline <= now {
            return Err(LedgerError::Rejected("deadline is in the past".to_string()));
        }
        let proposal_id = ProposalId::new(state.next_proposal_id);
        state.next_proposal_id += 1;
        let record = ProposalRecord {
            id: proposal_id,
            group_id: proposal.group_id,
            proposer: ctx.sender,
            proposal_type: proposal.proposal_type,
            data: proposal.data,
            threshold_percent: proposal.threshold_percent,
            votes_for: 0,
            votes_against: 0,
            created_at: now,
            deadline: proposal.deadline,
            executed: false,
            cancelled: false,
        };
        state.proposals.insert(
            proposal_id,
            ProposalEntry {
                record,
                voters: HashSet::new(),
            },
        );
        Ok(proposal_id)
    }

    async fn get_proposal(&self, proposal_id: ProposalId) -> LedgerResult<Option<ProposalRecord>> {
        self.faults.enter("get_proposal").await?;
        Ok(self
            .state
            .lock()
            .proposals
            .get(&proposal_id)
            .map(|entry| entry.record.clone()))
    }

    async fn list_proposals(&self, group_id: GroupId) -> LedgerResult<Vec<ProposalRecord>> {
        self.faults.enter("list_proposals").await?;
        let state = self.state.lock();
        state.group(group_id)?;
        Ok(state
            .proposals
            .values()
            .filter(|entry| entry.record.group_id == group_id)
            .map(|entry| entry.record.clone())
            .collect())
    }

    async fn has_voted(
        &self,
        proposal_id: ProposalId,
        voter: WalletAddress,
    ) -> LedgerResult<bool> {
        self.faults.enter("has_voted").await?;
        let state = self.state.lock();
        Ok(state.proposal(proposal_id)?.voters.contains(&voter))
    }

    async fn vote(
        &self,
        ctx: &CallContext,
        proposal_id: ProposalId,
        support: bool,
    ) -> LedgerResult<()> {
        self.faults.enter("vote").await?;
        let now = self.now();
        let mut state = self.state.lock();
        let group_id = state.proposal(proposal_id)?.record.group_id;
        if !state.group(group_id)?.can_vote(&ctx.sender) {
            return Err(LedgerError::Unauthorized(format!(
                "{} may not vote in group {}",
                ctx.sender, group_id
            )));
        }
        let entry = state
            .proposals
            .get_mut(&proposal_id)
            .ok_or_else(|| LedgerError::not_found(format!("proposal {}", proposal_id)))?;
        check_open(&entry.record, now)?;
        if !entry.voters.insert(ctx.sender) {
            return Err(LedgerError::AlreadyVoted);
        }
        if support {
            entry.record.votes_for += 1;
        } else {
            entry.record.votes_against += 1;
        }
        Ok(())
    }

    async fn mark_executed(&self, ctx: &CallContext, proposal_id: ProposalId) -> LedgerResult<()> {
        self.faults.enter("mark_executed").await?;
        let now = self.now();
        let mut state = self.state.lock();
        let record = &state.proposal(proposal_id)?.record;
        if record.executed {
            return Err(LedgerError::AlreadyExecuted);
        }
        check_open(record, now)?;
        let group = state.group(record.group_id)?;
        if !group.can_vote(&ctx.sender) {
            return Err(LedgerError::Unauthorized(format!(
                "{} may not execute proposals of group {}",
                ctx.sender, record.group_id
            )));
        }
        let required = required_votes(record.threshold_percent, group.voting_member_count());
        if record.votes_for < required {
            return Err(LedgerError::QuorumNotReached);
        }
        if let Some(entry) = state.proposals.get_mut(&proposal_id) {
            entry.record.executed = true;
        }
        info!("[mock-ledger] proposal {} marked executed", proposal_id);
        Ok(())
    }

    async fn cancel_proposal(
        &self,
        ctx: &CallContext,
        proposal_id: ProposalId,
    ) -> LedgerResult<()> {
        self.faults.enter("cancel_proposal").await?;
        let now = self.now();
        let mut state = self.state.lock();
        let record = &state.proposal(proposal_id)?.record;
        check_open(record, now)?;
        let creator = state.group(record.group_id)?.group.creator;
        if ctx.sender != record.proposer && ctx.sender != creator {
            return Err(LedgerError::Unauthorized(format!(
                "{} may not cancel proposal {}",
                ctx.sender, proposal_id
            )));
        }
        if record.votes_for + record.votes_against > 0 {
            return Err(LedgerError::Rejected(
                "votes have been cast on the proposal".to_string(),
            ));
        }
        if let Some(entry) = state.proposals.get_mut(&proposal_id) {
            entry.record.cancelled = true;
        }
        Ok(())
    }

    async fn add_member(
        &self,
        _ctx: &CallContext,
        group_id: GroupId,
        wallet: WalletAddress,
        display_name: String,
    ) -> LedgerResult<()> {
        self.faults.enter("add_member").await?;
        let now = self.now();
        let mut state = self.state.lock();
        let entry = state.group_mut(group_id)?;
        let deposit_free = !entry.group.requires_deposit();
        let existing = entry.members.iter().position(|m| m.wallet == wallet);
        match existing {
            Some(index) if entry.members[index].is_active => {
                return Err(LedgerError::Rejected(format!(
                    "{} is already a member",
                    wallet
                )));
            }
            Some(index) => {
                let member = &mut entry.members[index];
                member.display_name = display_name;
                member.joined_at = now;
                member.deposit_amount = 0;
                member.has_deposited = deposit_free;
                member.is_active = true;
            }
            None => entry.members.push(Member {
                wallet,
                display_name,
                joined_at: now,
                deposit_amount: 0,
                has_deposited: deposit_free,
                is_active: true,
            }),
        }
        entry.refresh_member_count();
        Ok(())
    }

    async fn deactivate_member(
        &self,
        _ctx: &CallContext,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> LedgerResult<()> {
        self.faults.enter("deactivate_member").await?;
        let mut state = self.state.lock();
        let entry = state.group_mut(group_id)?;
        let member = entry
            .member_mut(&wallet)
            .filter(|m| m.is_active)
            .ok_or_else(|| LedgerError::not_found(format!("member {}", wallet)))?;
        member.is_active = false;
        entry.refresh_member_count();
        Ok(())
    }
}
