// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::{CallContext, LedgerResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use treasury_types::{CollectionRef, Currency, GroupId, TokenId, WalletAddress, WantedToken};

/// An order against the treasury's token-bound account, amounts in base units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketOrder {
    Buy {
        collection: CollectionRef,
        token_id: TokenId,
    },
    ListForSale {
        collection: CollectionRef,
        token_id: TokenId,
        price: u128,
        currency: Currency,
    },
    ListForRent {
        collection: CollectionRef,
        token_id: TokenId,
        price_per_day: u128,
        currency: Currency,
        min_days: u32,
        max_days: u32,
    },
    Swap {
        offered_collection: CollectionRef,
        offered_token_id: TokenId,
        wanted_collection: CollectionRef,
        wanted_token: WantedToken,
    },
    Transfer {
        amount: u128,
        currency: Currency,
        recipient: WalletAddress,
    },
}

impl MarketOrder {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Buy { .. } => "buy",
            Self::ListForSale { .. } => "list_for_sale",
            Self::ListForRent { .. } => "list_for_rent",
            Self::Swap { .. } => "swap",
            Self::Transfer { .. } => "transfer",
        }
    }
}

impl fmt::Display for MarketOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: String,
    pub submitted_at: u64,
}

#[async_trait::async_trait]
pub trait Marketplace: Send + Sync {
    /// Submit `order` on behalf of the treasury of `group_id`.
    async fn submit(
        &self,
        ctx: &CallContext,
        group_id: GroupId,
        order: MarketOrder,
    ) -> LedgerResult<TxReceipt>;
}
