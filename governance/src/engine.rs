// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{GovernanceError, GovernanceResult, MembershipRegistry};
use std::sync::Arc;
use treasury_config::GovernanceConfig;
use treasury_ledger_api::{MarketOrder, Marketplace, TreasuryLedger, TxReceipt};
use treasury_logger::prelude::*;
use treasury_relayer::{RelayOp, Relayer};
use treasury_types::{
    Currency, CurrencyTable, DecimalAmount, GroupId, NewProposal, Proposal, ProposalAction,
    ProposalId, ProposalRecord, ProposalState, WalletAddress,
};

/// A proposal together with its state derived at `now`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalView {
    pub proposal: Proposal,
    pub state: ProposalState,
    pub required_votes: u32,
    pub active_members: u32,
    pub now: u64,
}

impl ProposalView {
    pub fn id(&self) -> ProposalId {
        self.proposal.id
    }

    pub fn summary(&self) -> String {
        format!(
            "#{} {} [{}] {}/{} votes, {} against",
            self.proposal.id,
            self.proposal.action.summary(),
            self.state,
            self.proposal.votes_for,
            self.required_votes,
            self.proposal.votes_against
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionReport {
    pub proposal_id: ProposalId,
    pub action: ProposalAction,
    /// Marketplace receipt, membership changes have none.
    pub receipt: Option<TxReceipt>,
}

/// Proposal lifecycle: create, vote, execute and cancel.
///
/// State is never cached, each operation re-reads the proposal, the block
/// time and the active member count and lets the ledger decide the race.
pub struct ProposalEngine {
    ledger: Arc<dyn TreasuryLedger>,
    marketplace: Arc<dyn Marketplace>,
    relayer: Arc<Relayer>,
    registry: MembershipRegistry,
    config: GovernanceConfig,
    currencies: CurrencyTable,
}

impl ProposalEngine {
    pub fn new(
        ledger: Arc<dyn TreasuryLedger>,
        marketplace: Arc<dyn Marketplace>,
        relayer: Arc<Relayer>,
        config: GovernanceConfig,
    ) -> Self {
        let registry = MembershipRegistry::new(ledger.clone(), relayer.clone());
        let currencies = config.currencies();
        Self {
            ledger,
            marketplace,
            relayer,
            registry,
            config,
            currencies,
        }
    }

    pub fn registry(&self) -> &MembershipRegistry {
        &self.registry
    }

    pub fn relayer(&self) -> &Arc<Relayer> {
        &self.relayer
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    pub fn currencies(&self) -> &CurrencyTable {
        &self.currencies
    }

    /// Open a proposal for `action`, voting ends `voting_window` after the current block time.
    pub async fn create(
        &self,
        group_id: GroupId,
        proposer: WalletAddress,
        action: ProposalAction,
        threshold_percent: u8,
    ) -> GovernanceResult<ProposalView> {
        self.registry
            .require_voting_rights(group_id, proposer)
            .await?;
        self.relayer
            .admit(proposer, Some(group_id), RelayOp::CreateProposal)
            .await?;
        if !(1..=100).contains(&threshold_percent) {
            return Err(GovernanceError::InvalidProposal(format!(
                "threshold {}% is outside 1..=100",
                threshold_percent
            )));
        }
        self.validate_action(group_id, proposer, &action).await?;

        let now = self.ledger.block_time().await?;
        let deadline = now.saturating_add(self.config.voting_window_secs());
        let new_proposal = NewProposal {
            group_id,
            proposer,
            proposal_type: action.proposal_type(),
            data: action.encode().map_err(GovernanceError::Internal)?,
            threshold_percent,
            deadline,
        };
        let ledger = &self.ledger;
        let proposal_id = self
            .relayer
            .submit_admitted(proposer, RelayOp::CreateProposal, |ctx| async move {
                ledger.create_proposal(&ctx, new_proposal).await
            })
            .await?;
        info!(
            "Proposal {} ({}) opened in group {} by {}, voting ends at {}",
            proposal_id,
            action.proposal_type(),
            group_id,
            proposer,
            deadline
        );
        self.proposal(proposal_id).await
    }

    /// Record a vote. Votes are accepted until the deadline while the proposal
    /// is neither executed nor cancelled, reaching quorum does not execute it.
    pub async fn vote(
        &self,
        proposal_id: ProposalId,
        voter: WalletAddress,
        support: bool,
    ) -> GovernanceResult<ProposalView> {
        let record = self.record(proposal_id).await?;
        self.registry
            .require_voting_rights(record.group_id, voter)
            .await?;
        self.relayer
            .admit(voter, Some(record.group_id), RelayOp::Vote)
            .await?;
        let now = self.ledger.block_time().await?;
        if let Some(reason) = record.status().closed_reason(now) {
            return Err(GovernanceError::ProposalClosed {
                proposal_id,
                reason: reason.to_string(),
            });
        }
        if self.ledger.has_voted(proposal_id, voter).await? {
            return Err(GovernanceError::AlreadyVoted { proposal_id, voter });
        }
        let ledger = &self.ledger;
        self.relayer
            .submit_admitted(voter, RelayOp::Vote, |ctx| async move {
                ledger.vote(&ctx, proposal_id, support).await
            })
            .await
            .map_err(|e| GovernanceError::from_proposal_call(e, proposal_id, voter))?;
        info!(
            "{} voted {} on proposal {}",
            voter,
            if support { "for" } else { "against" },
            proposal_id
        );
        self.proposal(proposal_id).await
    }

    /// Execute a passed proposal. Marking the proposal executed on the ledger
    /// is the claim; the action is dispatched only after the claim succeeded,
    /// so it runs at most once however many executions race.
    pub async fn execute(
        &self,
        proposal_id: ProposalId,
        executor: WalletAddress,
    ) -> GovernanceResult<ExecutionReport> {
        let view = self.proposal(proposal_id).await?;
        let group_id = view.proposal.group_id;
        self.registry
            .require_voting_rights(group_id, executor)
            .await?;
        self.relayer
            .admit(executor, Some(group_id), RelayOp::Execute)
            .await?;
        match view.state {
            ProposalState::Passed => {}
            ProposalState::Executed => return Err(GovernanceError::AlreadyExecuted(proposal_id)),
            ProposalState::Open | ProposalState::Failed => {
                return Err(GovernanceError::QuorumNotReached {
                    proposal_id,
                    votes_for: view.proposal.votes_for,
                    required: view.required_votes,
                })
            }
            ProposalState::Cancelled | ProposalState::Expired => {
                return Err(GovernanceError::ProposalClosed {
                    proposal_id,
                    reason: view.state.to_string(),
                })
            }
        }
        let action = view.proposal.action;
        let order = self.market_order(&action)?;
        // quota of the action is taken before the claim, a claimed proposal
        // must not be stopped by the rate limit.
        self.relayer
            .admit(executor, Some(group_id), RelayOp::ExternalAction)
            .await?;

        let ledger = &self.ledger;
        self.relayer
            .submit_admitted(executor, RelayOp::Execute, |ctx| async move {
                ledger.mark_executed(&ctx, proposal_id).await
            })
            .await
            .map_err(|e| GovernanceError::from_proposal_call(e, proposal_id, executor))?;
        info!("Proposal {} claimed for execution by {}", proposal_id, executor);

        let receipt = match order {
            Some(order) => {
                let marketplace = &self.marketplace;
                let receipt = self
                    .relayer
                    .submit_admitted(executor, RelayOp::ExternalAction, |ctx| async move {
                        marketplace.submit(&ctx, group_id, order).await
                    })
                    .await
                    .map_err(|source| {
                        error!("Action of executed proposal {} failed: {}", proposal_id, source);
                        GovernanceError::ActionFailed {
                            proposal_id,
                            source,
                        }
                    })?;
                Some(receipt)
            }
            None => {
                self.registry
                    .apply_membership_action(executor, proposal_id, group_id, &action)
                    .await?;
                None
            }
        };
        info!("Proposal {} executed: {}", proposal_id, action.summary());
        Ok(ExecutionReport {
            proposal_id,
            action,
            receipt,
        })
    }

    /// Withdraw an open proposal nobody voted on. Allowed to the proposer and,
    /// when configured, to the group creator.
    pub async fn cancel(
        &self,
        proposal_id: ProposalId,
        by: WalletAddress,
    ) -> GovernanceResult<ProposalView> {
        let view = self.proposal(proposal_id).await?;
        let group_id = view.proposal.group_id;
        self.registry.require_voting_rights(group_id, by).await?;
        self.relayer
            .admit(by, Some(group_id), RelayOp::Cancel)
            .await?;
        if let Some(reason) = view.proposal.status().closed_reason(view.now) {
            return Err(GovernanceError::ProposalClosed {
                proposal_id,
                reason: reason.to_string(),
            });
        }
        let group = self.registry.group(group_id).await?;
        let may_cancel = by == view.proposal.proposer
            || (self.config.creator_can_cancel() && by == group.creator);
        if !may_cancel {
            return Err(GovernanceError::Unauthorized(
                "only the proposer can cancel a proposal".to_string(),
            ));
        }
        if view.proposal.status().total_votes() > 0 {
            return Err(GovernanceError::Unauthorized(
                "a proposal with votes can not be cancelled".to_string(),
            ));
        }
        let ledger = &self.ledger;
        self.relayer
            .submit_admitted(by, RelayOp::Cancel, |ctx| async move {
                ledger.cancel_proposal(&ctx, proposal_id).await
            })
            .await
            .map_err(|e| GovernanceError::from_proposal_call(e, proposal_id, by))?;
        info!("Proposal {} cancelled by {}", proposal_id, by);
        self.proposal(proposal_id).await
    }

    pub async fn proposal(&self, proposal_id: ProposalId) -> GovernanceResult<ProposalView> {
        let record = self.record(proposal_id).await?;
        let now = self.ledger.block_time().await?;
        let active_members = self.registry.active_member_count(record.group_id).await?;
        Self::view(record, now, active_members)
    }

    /// Proposals of the group still accepting votes, oldest first.
    pub async fn open_proposals(&self, group_id: GroupId) -> GovernanceResult<Vec<ProposalView>> {
        let records = self.ledger.list_proposals(group_id).await?;
        let now = self.ledger.block_time().await?;
        let active_members = self.registry.active_member_count(group_id).await?;
        let mut views = records
            .into_iter()
            .filter(|record| record.status().closed_reason(now).is_none())
            .map(|record| Self::view(record, now, active_members))
            .collect::<GovernanceResult<Vec<_>>>()?;
        views.sort_by_key(|view| view.proposal.id);
        Ok(views)
    }

    async fn record(&self, proposal_id: ProposalId) -> GovernanceResult<ProposalRecord> {
        self.ledger
            .get_proposal(proposal_id)
            .await?
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    fn view(
        record: ProposalRecord,
        now: u64,
        active_members: u32,
    ) -> GovernanceResult<ProposalView> {
        let status = record.status();
        let proposal = Proposal::try_from(record).map_err(GovernanceError::Internal)?;
        Ok(ProposalView {
            state: status.state(now, active_members),
            required_votes: status.required_votes(active_members),
            active_members,
            now,
            proposal,
        })
    }

    async fn validate_action(
        &self,
        group_id: GroupId,
        proposer: WalletAddress,
        action: &ProposalAction,
    ) -> GovernanceResult<()> {
        match action {
            ProposalAction::AddMember { wallet, .. } => {
                if let Some(member) = self.registry.member(group_id, *wallet).await? {
                    if member.is_active {
                        return Err(GovernanceError::InvalidProposal(format!(
                            "{} is already a member",
                            wallet.short_str()
                        )));
                    }
                }
            }
            ProposalAction::RemoveMember { wallet, .. } => {
                let active = self
                    .registry
                    .member(group_id, *wallet)
                    .await?
                    .map(|m| m.is_active)
                    .unwrap_or(false);
                if !active {
                    return Err(GovernanceError::InvalidProposal(format!(
                        "{} is not a member",
                        wallet.short_str()
                    )));
                }
            }
            ProposalAction::WithdrawMember { wallet } => {
                if *wallet != proposer {
                    return Err(GovernanceError::InvalidProposal(
                        "members can only withdraw themselves".to_string(),
                    ));
                }
            }
            _ => {
                self.market_order(action)?;
            }
        }
        Ok(())
    }

    /// The marketplace order of `action` with amounts in base units, `None`
    /// for membership changes.
    pub fn market_order(&self, action: &ProposalAction) -> GovernanceResult<Option<MarketOrder>> {
        let to_base_units = |amount: &DecimalAmount, currency: &Currency| {
            self.currencies
                .to_base_units(amount, currency)
                .map_err(|e| GovernanceError::InvalidProposal(e.to_string()))
        };
        let order = match action {
            ProposalAction::BuyNft {
                collection,
                token_id,
            } => MarketOrder::Buy {
                collection: collection.clone(),
                token_id: token_id.clone(),
            },
            ProposalAction::SellNft {
                collection,
                token_id,
                price,
                currency,
            } => MarketOrder::ListForSale {
                collection: collection.clone(),
                token_id: token_id.clone(),
                price: to_base_units(price, currency)?,
                currency: currency.clone(),
            },
            ProposalAction::RentNft {
                collection,
                token_id,
                price_per_day,
                currency,
                min_days,
                max_days,
            } => {
                if *min_days == 0 || min_days > max_days {
                    return Err(GovernanceError::InvalidProposal(format!(
                        "rent days {}..{} are not a valid range",
                        min_days, max_days
                    )));
                }
                MarketOrder::ListForRent {
                    collection: collection.clone(),
                    token_id: token_id.clone(),
                    price_per_day: to_base_units(price_per_day, currency)?,
                    currency: currency.clone(),
                    min_days: *min_days,
                    max_days: *max_days,
                }
            }
            ProposalAction::SwapNft {
                offered_collection,
                offered_token_id,
                wanted_collection,
                wanted_token,
            } => MarketOrder::Swap {
                offered_collection: offered_collection.clone(),
                offered_token_id: offered_token_id.clone(),
                wanted_collection: wanted_collection.clone(),
                wanted_token: wanted_token.clone(),
            },
            ProposalAction::TransferFunds {
                amount,
                currency,
                recipient,
            } => MarketOrder::Transfer {
                amount: to_base_units(amount, currency)?,
                currency: currency.clone(),
                recipient: *recipient,
            },
            ProposalAction::AddMember { .. }
            | ProposalAction::RemoveMember { .. }
            | ProposalAction::WithdrawMember { .. } => return Ok(None),
        };
        Ok(Some(order))
    }
}
