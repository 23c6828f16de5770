// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::address::WalletAddress;
use crate::amount::{Currency, DecimalAmount};
use crate::{GroupId, ProposalId};
use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalType {
    BuyNft,
    SellNft,
    RentNft,
    SwapNft,
    TransferFunds,
    AddMember,
    RemoveMember,
    WithdrawMember,
}

impl ProposalType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuyNft => "BUY_NFT",
            Self::SellNft => "SELL_NFT",
            Self::RentNft => "RENT_NFT",
            Self::SwapNft => "SWAP_NFT",
            Self::TransferFunds => "TRANSFER_FUNDS",
            Self::AddMember => "ADD_MEMBER",
            Self::RemoveMember => "REMOVE_MEMBER",
            Self::WithdrawMember => "WITHDRAW_MEMBER",
        }
    }

    pub fn is_membership_change(&self) -> bool {
        matches!(
            self,
            Self::AddMember | Self::RemoveMember | Self::WithdrawMember
        )
    }
}

impl fmt::Display for ProposalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An NFT collection, by name or by contract address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionRef {
    Named(String),
    Address(WalletAddress),
}

impl CollectionRef {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name.as_str()),
            Self::Address(_) => None,
        }
    }

    pub fn contract_address(&self) -> Option<&WalletAddress> {
        match self {
            Self::Named(_) => None,
            Self::Address(address) => Some(address),
        }
    }
}

impl fmt::Display for CollectionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Address(address) => write!(f, "{}", address),
        }
    }
}

/// Token id as decimal digits, ids are uint256 on chain.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(String);

impl TokenId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for TokenId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().trim_start_matches('#');
        ensure!(
            !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()),
            "invalid token id `{}`",
            s
        );
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The token asked for in a swap. `Any` is not token id 0.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WantedToken {
    Any,
    Id(TokenId),
}

impl fmt::Display for WantedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Id(id) => write!(f, "#{}", id),
        }
    }
}

/// The typed payload of a proposal, one variant per `ProposalType`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalAction {
    BuyNft {
        collection: CollectionRef,
        token_id: TokenId,
    },
    SellNft {
        collection: CollectionRef,
        token_id: TokenId,
        price: DecimalAmount,
        currency: Currency,
    },
    RentNft {
        collection: CollectionRef,
        token_id: TokenId,
        price_per_day: DecimalAmount,
        currency: Currency,
        min_days: u32,
        max_days: u32,
    },
    SwapNft {
        offered_collection: CollectionRef,
        offered_token_id: TokenId,
        wanted_collection: CollectionRef,
        wanted_token: WantedToken,
    },
    TransferFunds {
        amount: DecimalAmount,
        currency: Currency,
        recipient: WalletAddress,
    },
    AddMember {
        username: String,
        wallet: WalletAddress,
    },
    RemoveMember {
        username: String,
        wallet: WalletAddress,
    },
    WithdrawMember {
        wallet: WalletAddress,
    },
}

impl ProposalAction {
    pub fn proposal_type(&self) -> ProposalType {
        match self {
            Self::BuyNft { .. } => ProposalType::BuyNft,
            Self::SellNft { .. } => ProposalType::SellNft,
            Self::RentNft { .. } => ProposalType::RentNft,
            Self::SwapNft { .. } => ProposalType::SwapNft,
            Self::TransferFunds { .. } => ProposalType::TransferFunds,
            Self::AddMember { .. } => ProposalType::AddMember,
            Self::RemoveMember { .. } => ProposalType::RemoveMember,
            Self::WithdrawMember { .. } => ProposalType::WithdrawMember,
        }
    }

    /// The bytes stored in the ledger's proposal record.
    pub fn encode(&self) -> Result<Vec<u8>> {
        bcs::to_bytes(self).map_err(|e| e.into())
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bcs::from_bytes(bytes).map_err(|e| e.into())
    }

    /// One line human description used in chat replies.
    pub fn summary(&self) -> String {
        match self {
            Self::BuyNft {
                collection,
                token_id,
            } => format!("buy {} #{}", collection, token_id),
            Self::SellNft {
                collection,
                token_id,
                price,
                currency,
            } => format!("sell {} #{} for {} {}", collection, token_id, price, currency),
            Self::RentNft {
                collection,
                token_id,
                price_per_day,
                currency,
                min_days,
                max_days,
            } => format!(
                "rent out {} #{} for {} {}/day ({}-{} days)",
                collection, token_id, price_per_day, currency, min_days, max_days
            ),
            Self::SwapNft {
                offered_collection,
                offered_token_id,
                wanted_collection,
                wanted_token,
            } => format!(
                "swap {} #{} for {} {}",
                offered_collection, offered_token_id, wanted_collection, wanted_token
            ),
            Self::TransferFunds {
                amount,
                currency,
                recipient,
            } => format!("transfer {} {} to {}", amount, currency, recipient),
            Self::AddMember { username, wallet } => {
                format!("add member @{} ({})", username, wallet.short_str())
            }
            Self::RemoveMember { username, wallet } => {
                format!("remove member @{} ({})", username, wallet.short_str())
            }
            Self::WithdrawMember { wallet } => format!("let {} leave", wallet.short_str()),
        }
    }
}

/// Minimum count of "for" votes, `ceil(threshold% * active_members)` and at least one.
pub fn required_votes(threshold_percent: u8, active_members: u32) -> u32 {
    let threshold = threshold_percent.min(100) as u64;
    let required = (threshold * active_members as u64 + 99) / 100;
    required.max(1) as u32
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalState {
    Open,
    Passed,
    Failed,
    Expired,
    Executed,
    Cancelled,
}

impl ProposalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Cancelled)
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Expired => "expired",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Why a proposal no longer accepts votes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClosedReason {
    Executed,
    Cancelled,
    Expired { deadline: u64 },
}

impl fmt::Display for ClosedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Executed => f.write_str("already executed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Expired { deadline } => write!(f, "voting ended at {}", deadline),
        }
    }
}

/// The tally and flags shared by the wire record and the typed proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProposalStatus {
    pub threshold_percent: u8,
    pub votes_for: u32,
    pub votes_against: u32,
    pub deadline: u64,
    pub executed: bool,
    pub cancelled: bool,
}

impl ProposalStatus {
    pub fn required_votes(&self, active_members: u32) -> u32 {
        required_votes(self.threshold_percent, active_members)
    }

    pub fn quorum_reached(&self, active_members: u32) -> bool {
        self.votes_for >= self.required_votes(active_members)
    }

    /// Derive the state at ledger time `now`, there is no timer moving proposals.
    pub fn state(&self, now: u64, active_members: u32) -> ProposalState {
        if self.executed {
            return ProposalState::Executed;
        }
        if self.cancelled {
            return ProposalState::Cancelled;
        }
        if now > self.deadline {
            return ProposalState::Expired;
        }
        let required = self.required_votes(active_members);
        if self.votes_for >= required {
            return ProposalState::Passed;
        }
        let outstanding = active_members.saturating_sub(self.votes_for + self.votes_against);
        if self.votes_for + outstanding < required {
            ProposalState::Failed
        } else {
            ProposalState::Open
        }
    }

    /// Votes are accepted until the deadline unless the proposal reached a terminal state.
    pub fn closed_reason(&self, now: u64) -> Option<ClosedReason> {
        if self.executed {
            Some(ClosedReason::Executed)
        } else if self.cancelled {
            Some(ClosedReason::Cancelled)
        } else if now > self.deadline {
            Some(ClosedReason::Expired {
                deadline: self.deadline,
            })
        } else {
            None
        }
    }

    pub fn total_votes(&self) -> u32 {
        self.votes_for + self.votes_against
    }
}

/// A proposal to be written by the ledger, the action already encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProposal {
    pub group_id: GroupId,
    pub proposer: WalletAddress,
    pub proposal_type: ProposalType,
    pub data: Vec<u8>,
    pub threshold_percent: u8,
    pub deadline: u64,
}

/// The proposal as the ledger stores it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRecord {
    pub id: ProposalId,
    pub group_id: GroupId,
    pub proposer: WalletAddress,
    pub proposal_type: ProposalType,
    pub data: Vec<u8>,
    pub threshold_percent: u8,
    pub votes_for: u32,
    pub votes_against: u32,
    pub created_at: u64,
    pub deadline: u64,
    pub executed: bool,
    pub cancelled: bool,
}

impl ProposalRecord {
    pub fn status(&self) -> ProposalStatus {
        ProposalStatus {
            threshold_percent: self.threshold_percent,
            votes_for: self.votes_for,
            votes_against: self.votes_against,
            deadline: self.deadline,
            executed: self.executed,
            cancelled: self.cancelled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub id: ProposalId,
    pub group_id: GroupId,
    pub proposer: WalletAddress,
    pub action: ProposalAction,
    pub threshold_percent: u8,
    pub votes_for: u32,
    pub votes_against: u32,
    pub created_at: u64,
    pub deadline: u64,
    pub executed: bool,
    pub cancelled: bool,
}

impl Proposal {
    pub fn proposal_type(&self) -> ProposalType {
        self.action.proposal_type()
    }

    pub fn status(&self) -> ProposalStatus {
        ProposalStatus {
            threshold_percent: self.threshold_percent,
            votes_for: self.votes_for,
            votes_against: self.votes_against,
            deadline: self.deadline,
            executed: self.executed,
            cancelled: self.cancelled,
        }
    }
}

impl TryFrom<ProposalRecord> for Proposal {
    type Error = anyhow::Error;

    fn try_from(record: ProposalRecord) -> Result<Self> {
        let action = ProposalAction::decode(record.data.as_slice())?;
        ensure!(
            action.proposal_type() == record.proposal_type,
            "proposal {} is recorded as {} but carries a {} payload",
            record.id,
            record.proposal_type,
            action.proposal_type()
        );
        Ok(Self {
            id: record.id,
            group_id: record.group_id,
            proposer: record.proposer,
            action,
            threshold_percent: record.threshold_percent,
            votes_for: record.votes_for,
            votes_against: record.votes_against,
            created_at: record.created_at,
            deadline: record.deadline,
            executed: record.executed,
            cancelled: record.cancelled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(votes_for: u32, votes_against: u32) -> ProposalStatus {
        ProposalStatus {
            threshold_percent: 90,
            votes_for,
            votes_against,
            deadline: 100,
            executed: false,
            cancelled: false,
        }
    }

    #[test]
    fn test_required_votes_rounds_up() {
        assert_eq!(required_votes(90, 8), 8);
        assert_eq!(required_votes(90, 10), 9);
        assert_eq!(required_votes(90, 11), 10);
        assert_eq!(required_votes(50, 3), 2);
        assert_eq!(required_votes(100, 5), 5);
        assert_eq!(required_votes(90, 1), 1);
        assert_eq!(required_votes(90, 0), 1);
    }

    #[test]
    fn test_quorum_of_eight_members() {
        assert!(!status(7, 0).quorum_reached(8));
        assert!(status(8, 0).quorum_reached(8));
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(status(0, 0).state(50, 8), ProposalState::Open);
        assert_eq!(status(8, 0).state(50, 8), ProposalState::Passed);
        assert_eq!(status(8, 0).state(100, 8), ProposalState::Passed);
        assert_eq!(status(8, 0).state(101, 8), ProposalState::Expired);
        // 7 for needs one more, one against leaves nobody to provide it
        assert_eq!(status(7, 1).state(50, 8), ProposalState::Failed);
        assert_eq!(status(6, 1).state(50, 8), ProposalState::Failed);
        assert_eq!(status(7, 0).state(50, 8), ProposalState::Open);

        let mut executed = status(8, 0);
        executed.executed = true;
        assert_eq!(executed.state(1_000, 8), ProposalState::Executed);
        assert_eq!(executed.closed_reason(0), Some(ClosedReason::Executed));

        let mut cancelled = status(0, 0);
        cancelled.cancelled = true;
        assert_eq!(cancelled.state(0, 8), ProposalState::Cancelled);
        assert!(ProposalState::Cancelled.is_terminal());
        assert_eq!(
            status(0, 0).closed_reason(101),
            Some(ClosedReason::Expired { deadline: 100 })
        );
        assert_eq!(status(8, 0).closed_reason(100), None);
    }

    #[test]
    fn test_record_decodes_to_typed_proposal() {
        let action = ProposalAction::SwapNft {
            offered_collection: CollectionRef::Named("BAYC".to_string()),
            offered_token_id: "1".parse().unwrap(),
            wanted_collection: CollectionRef::Named("MAYC".to_string()),
            wanted_token: WantedToken::Any,
        };
        let mut record = ProposalRecord {
            id: ProposalId::new(3),
            group_id: GroupId::new(1),
            proposer: WalletAddress::new([9u8; 20]),
            proposal_type: ProposalType::SwapNft,
            data: action.encode().unwrap(),
            threshold_percent: 90,
            votes_for: 0,
            votes_against: 0,
            created_at: 0,
            deadline: 10,
            executed: false,
            cancelled: false,
        };
        let proposal = Proposal::try_from(record.clone()).unwrap();
        assert_eq!(proposal.action, action);
        assert_eq!(proposal.proposal_type(), ProposalType::SwapNft);

        record.proposal_type = ProposalType::BuyNft;
        assert!(Proposal::try_from(record.clone()).is_err());
        record.data = vec![0xff, 0xff];
        assert!(Proposal::try_from(record).is_err());
    }

    #[test]
    fn test_wanted_any_is_not_token_zero() {
        let zero = WantedToken::Id("0".parse().unwrap());
        assert_ne!(zero, WantedToken::Any);
        assert_eq!(zero.to_string(), "#0");
        assert_eq!(WantedToken::Any.to_string(), "any");
        assert!("#12".parse::<TokenId>().is_ok());
        assert!("any".parse::<TokenId>().is_err());
    }
}
