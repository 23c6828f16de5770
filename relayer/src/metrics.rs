// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use prometheus::core::Collector;
use prometheus::{Error as PrometheusError, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

fn register<C: Collector + Clone + 'static>(c: C, registry: &Registry) -> Result<C, PrometheusError> {
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

#[derive(Clone)]
pub struct RelayerMetrics {
    pub relayed_calls: IntCounterVec,
    pub submit_time: HistogramVec,
}

impl RelayerMetrics {
    pub fn register(registry: &Registry) -> Result<Self, PrometheusError> {
        let relayed_calls = register(
            IntCounterVec::new(
                Opts::new(
                    "relayed_calls",
                    "Count of relayed calls by operation and outcome ok|limited|rejected|failed|timeout",
                )
                .namespace("treasury"),
                &["op", "outcome"],
            )?,
            registry,
        )?;
        let submit_time = register(
            HistogramVec::new(
                HistogramOpts::new(
                    "relay_submit_time",
                    "relay submit time in seconds, measure the time usage of the ledger",
                )
                .namespace("treasury"),
                &["op"],
            )?,
            registry,
        )?;
        Ok(Self {
            relayed_calls,
            submit_time,
        })
    }
}
