// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

mod fault;
mod mock_ledger;
mod mock_marketplace;

pub use fault::Fault;
pub use mock_ledger::MockLedger;
pub use mock_marketplace::MockMarketplace;
