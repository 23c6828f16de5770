// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use treasury_types::WalletAddress;

pub mod error;
pub mod market;
pub mod service;

pub use error::{LedgerError, LedgerResult};
pub use market::{MarketOrder, Marketplace, TxReceipt};
pub use service::TreasuryLedger;

/// Identity of a relayed call: the member on whose behalf it is made and the
/// funding account that pays for it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallContext {
    pub sender: WalletAddress,
    pub fee_payer: WalletAddress,
}

impl CallContext {
    pub fn new(sender: WalletAddress, fee_payer: WalletAddress) -> Self {
        Self { sender, fee_payer }
    }
}
