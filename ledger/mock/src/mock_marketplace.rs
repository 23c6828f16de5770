// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use crate::fault::{Fault, FaultPlan};
use parking_lot::Mutex;
use std::time::Duration;
use treasury_ledger_api::{CallContext, LedgerResult, MarketOrder, Marketplace, TxReceipt};
use treasury_logger::prelude::*;
use treasury_time_service::{MockTimeService, TimeService};
use treasury_types::GroupId;

const SUBMIT: &str = "submit";

/// Marketplace double which accepts every order and keeps it for inspection.
pub struct MockMarketplace {
    time_service: MockTimeService,
    orders: Mutex<Vec<(GroupId, MarketOrder)>>,
    faults: FaultPlan,
}

impl MockMarketplace {
    pub fn new(time_service: MockTimeService) -> Self {
        Self {
            time_service,
            orders: Mutex::new(vec![]),
            faults: FaultPlan::default(),
        }
    }

    pub fn orders(&self) -> Vec<(GroupId, MarketOrder)> {
        self.orders.lock().clone()
    }

    pub fn submitted(&self) -> usize {
        self.orders.lock().len()
    }

    pub fn fail_next(&self, fault: Fault) {
        self.faults.fail_next(SUBMIT, fault);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        self.faults.set_delay(SUBMIT, delay);
    }
}

#[async_trait::async_trait]
impl Marketplace for MockMarketplace {
    async fn submit(
        &self,
        ctx: &CallContext,
        group_id: GroupId,
        order: MarketOrder,
    ) -> LedgerResult<TxReceipt> {
        self.faults.enter(SUBMIT).await?;
        let mut orders = self.orders.lock();
        debug!(
            "[mock-market] {} order for group {} by {}",
            order, group_id, ctx.sender
        );
        orders.push((group_id, order));
        Ok(TxReceipt {
            tx_hash: format!("0x{:064x}", orders.len()),
            submitted_at: self.time_service.now_secs(),
        })
    }
}
