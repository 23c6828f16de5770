// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod address;
pub mod amount;
pub mod error;
pub mod group;
pub mod proposal;

pub use address::WalletAddress;
pub use amount::{Currency, CurrencyTable, DecimalAmount};
pub use error::ErrorKind;
pub use group::{Group, Member, NewGroup, TreasuryBalance};
pub use proposal::{
    required_votes, ClosedReason, CollectionRef, NewProposal, Proposal, ProposalAction,
    ProposalRecord, ProposalState, ProposalStatus, ProposalType, TokenId, WantedToken,
};

macro_rules! id_type {
    ($name:ident) => {
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

id_type!(GroupId);
id_type!(ProposalId);
