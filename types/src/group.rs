// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::address::WalletAddress;
use crate::amount::{format_base_units, Currency};
use crate::GroupId;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub creator: WalletAddress,
    /// Deposit in ledger base units, 0 means no deposit is required.
    pub required_deposit: u128,
    pub is_private: bool,
    /// Count of members whose `is_active` flag is set.
    pub member_count: u32,
}

impl Group {
    pub fn requires_deposit(&self) -> bool {
        self.required_deposit > 0
    }
}

/// Parameters of group formation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroup {
    pub name: String,
    pub creator_display_name: String,
    pub required_deposit: u128,
    pub is_private: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub wallet: WalletAddress,
    pub display_name: String,
    pub joined_at: u64,
    pub deposit_amount: u128,
    pub has_deposited: bool,
    pub is_active: bool,
}

impl Member {
    /// Whether the member may vote and propose in `group`.
    pub fn has_voting_rights(&self, group: &Group) -> bool {
        self.is_active && (!group.requires_deposit() || self.has_deposited)
    }

    pub fn matches_username(&self, username: &str) -> bool {
        self.display_name
            .trim_start_matches('@')
            .eq_ignore_ascii_case(username.trim_start_matches('@'))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryBalance {
    pub native_balance: u128,
    pub currency: Currency,
    pub decimals: u8,
    pub nft_count: u64,
}

impl TreasuryBalance {
    pub fn native_balance_str(&self) -> String {
        format_base_units(self.native_balance, self.decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(required_deposit: u128) -> Group {
        Group {
            id: GroupId::new(1),
            name: "apes".to_string(),
            creator: WalletAddress::new([1u8; 20]),
            required_deposit,
            is_private: false,
            member_count: 1,
        }
    }

    fn member(has_deposited: bool, is_active: bool) -> Member {
        Member {
            wallet: WalletAddress::new([2u8; 20]),
            display_name: "Alice".to_string(),
            joined_at: 0,
            deposit_amount: 0,
            has_deposited,
            is_active,
        }
    }

    #[test]
    fn test_voting_rights() {
        assert!(member(false, true).has_voting_rights(&group(0)));
        assert!(!member(false, true).has_voting_rights(&group(100)));
        assert!(member(true, true).has_voting_rights(&group(100)));
        assert!(!member(true, false).has_voting_rights(&group(0)));
    }

    #[test]
    fn test_matches_username() {
        let member = member(true, true);
        assert!(member.matches_username("alice"));
        assert!(member.matches_username("@ALICE"));
        assert!(!member.matches_username("alic"));
    }
}
