// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{GovernanceError, GovernanceResult};
use std::sync::Arc;
use treasury_ledger_api::TreasuryLedger;
use treasury_logger::prelude::*;
use treasury_relayer::{RelayError, RelayOp, Relayer};
use treasury_types::{
    Group, GroupId, Member, NewGroup, ProposalAction, ProposalId, WalletAddress,
};

/// Who may vote and propose in a group, and the membership transitions.
///
/// Reads go straight to the ledger, every write is relayed.
#[derive(Clone)]
pub struct MembershipRegistry {
    ledger: Arc<dyn TreasuryLedger>,
    relayer: Arc<Relayer>,
}

impl MembershipRegistry {
    pub fn new(ledger: Arc<dyn TreasuryLedger>, relayer: Arc<Relayer>) -> Self {
        Self { ledger, relayer }
    }

    pub async fn group(&self, group_id: GroupId) -> GovernanceResult<Group> {
        self.ledger
            .get_group(group_id)
            .await?
            .ok_or(GovernanceError::GroupNotFound(group_id))
    }

    pub async fn member(
        &self,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> GovernanceResult<Option<Member>> {
        Ok(self.ledger.get_member(group_id, wallet).await?)
    }

    /// Recorded, active and, when the group asks for one, deposited.
    pub async fn is_active_member(
        &self,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> GovernanceResult<bool> {
        let group = self.group(group_id).await?;
        Ok(self
            .member(group_id, wallet)
            .await?
            .map(|m| m.has_voting_rights(&group))
            .unwrap_or(false))
    }

    /// Fails with `NotAMember` or `DepositRequired` unless `wallet` may vote and propose.
    /// Entry points call it before taking any relay quota.
    pub async fn require_voting_rights(
        &self,
        group_id: GroupId,
        wallet: WalletAddress,
    ) -> GovernanceResult<Member> {
        let group = self.group(group_id).await?;
        let member = match self.member(group_id, wallet).await? {
            Some(member) if member.is_active => member,
            _ => return Err(GovernanceError::NotAMember { group_id, wallet }),
        };
        if !member.has_voting_rights(&group) {
            return Err(GovernanceError::DepositRequired {
                group_id,
                wallet,
                required: group.required_deposit,
            });
        }
        Ok(member)
    }

    /// Members with voting rights, the base of every quorum.
    pub async fn active_members(&self, group_id: GroupId) -> GovernanceResult<Vec<Member>> {
        let group = self.group(group_id).await?;
        Ok(self
            .ledger
            .get_group_members(group_id)
            .await?
            .into_iter()
            .filter(|m| m.has_voting_rights(&group))
            .collect())
    }

    pub async fn active_member_count(&self, group_id: GroupId) -> GovernanceResult<u32> {
        Ok(self.active_members(group_id).await?.len() as u32)
    }

    pub async fn create_group(
        &self,
        creator: WalletAddress,
        group: NewGroup,
    ) -> GovernanceResult<GroupId> {
        let ledger = &self.ledger;
        let group_id = self
            .relayer
            .submit(creator, None, RelayOp::CreateGroup, |ctx| async move {
                ledger.create_group(&ctx, group).await
            })
            .await?;
        info!("Group {} formed by {}", group_id, creator);
        Ok(group_id)
    }

    /// Pay `amount` base units, which must cover the group's required deposit
    /// unless the member has paid it already.
    pub async fn deposit(
        &self,
        group_id: GroupId,
        wallet: WalletAddress,
        amount: u128,
    ) -> GovernanceResult<Member> {
        let group = self.group(group_id).await?;
        let member = match self.member(group_id, wallet).await? {
            Some(member) if member.is_active => member,
            _ => return Err(GovernanceError::NotAMember { group_id, wallet }),
        };
        self.relayer
            .admit(wallet, Some(group_id), RelayOp::Deposit)
            .await?;
        if amount == 0 {
            return Err(GovernanceError::InsufficientDeposit {
                required: group.required_deposit,
                offered: amount,
            });
        }
        if !member.has_deposited && amount < group.required_deposit {
            return Err(GovernanceError::InsufficientDeposit {
                required: group.required_deposit,
                offered: amount,
            });
        }
        let ledger = &self.ledger;
        self.relayer
            .submit_admitted(wallet, RelayOp::Deposit, |ctx| async move {
                ledger.deposit(&ctx, group_id, amount).await
            })
            .await?;
        info!("{} deposited {} into group {}", wallet, amount, group_id);
        self.member(group_id, wallet)
            .await?
            .ok_or(GovernanceError::NotAMember { group_id, wallet })
    }

    /// Apply the membership change of an executed proposal. The quota was
    /// consumed when the execution was admitted.
    pub(crate) async fn apply_membership_action(
        &self,
        executor: WalletAddress,
        proposal_id: ProposalId,
        group_id: GroupId,
        action: &ProposalAction,
    ) -> GovernanceResult<()> {
        let ledger = &self.ledger;
        let action_failed = |source: RelayError| {
            error!(
                "Action of executed proposal {} failed: {}",
                proposal_id, source
            );
            GovernanceError::ActionFailed {
                proposal_id,
                source,
            }
        };
        match action {
            ProposalAction::AddMember { username, wallet } => {
                let (wallet, display_name) = (*wallet, username.clone());
                self.relayer
                    .submit_admitted(executor, RelayOp::ExternalAction, |ctx| async move {
                        ledger.add_member(&ctx, group_id, wallet, display_name).await
                    })
                    .await
                    .map_err(action_failed)?;
                info!("{} joined group {}", wallet, group_id);
            }
            ProposalAction::RemoveMember { wallet, .. }
            | ProposalAction::WithdrawMember { wallet } => {
                let wallet = *wallet;
                self.relayer
                    .submit_admitted(executor, RelayOp::ExternalAction, |ctx| async move {
                        ledger.deactivate_member(&ctx, group_id, wallet).await
                    })
                    .await
                    .map_err(action_failed)?;
                info!("{} left group {}", wallet, group_id);
            }
            other => {
                return Err(GovernanceError::InvalidProposal(format!(
                    "{} is not a membership change",
                    other.proposal_type()
                )))
            }
        }
        Ok(())
    }
}
