// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use super::*;
use prometheus::Registry;
use std::num::NonZeroU32;
use treasury_config::QuotaConfig;
use treasury_ledger_api::{LedgerError, TreasuryLedger};
use treasury_ledger_mock::{Fault, MockLedger};
use treasury_rate_limiter::{InMemoryCounterStore, Quota};
use treasury_time_service::MockTimeService;
use treasury_types::NewGroup;

fn wallet(i: u8) -> WalletAddress {
    WalletAddress::new([i; 20])
}

fn relayer(user_calls: u32, group_calls: u32, time_service: &MockTimeService) -> Relayer {
    let limiter = UserGroupLimiter::new(
        RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(time_service.clone()),
        ),
        Quota::per_day(NonZeroU32::new(user_calls).unwrap()),
        Quota::per_day(NonZeroU32::new(group_calls).unwrap()),
    );
    Relayer::new(limiter, wallet(0xfe), Duration::from_millis(200))
}

fn new_group() -> NewGroup {
    NewGroup {
        name: "apes".to_string(),
        creator_display_name: "alice".to_string(),
        required_deposit: 0,
        is_private: false,
    }
}

#[tokio::test]
async fn test_user_quota_then_window_reset() {
    treasury_logger::init_for_test();
    let time_service = MockTimeService::new_with_value(1_000_000);
    let relayer = relayer(3, 1000, &time_service);
    let group = Some(GroupId::new(1));
    for _ in 0..3 {
        relayer.admit(wallet(1), group, RelayOp::Vote).await.unwrap();
    }
    let err = relayer
        .admit(wallet(1), group, RelayOp::Vote)
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
    // another member of the same group is not affected
    relayer.admit(wallet(2), group, RelayOp::Vote).await.unwrap();

    time_service.increase(Duration::from_secs(24 * 60 * 60));
    relayer.admit(wallet(1), group, RelayOp::Vote).await.unwrap();
}

#[tokio::test]
async fn test_group_quota_is_shared() {
    treasury_logger::init_for_test();
    let time_service = MockTimeService::new_with_value(1_000_000);
    let relayer = relayer(10, 2, &time_service);
    let group = Some(GroupId::new(7));
    relayer.admit(wallet(1), group, RelayOp::Vote).await.unwrap();
    relayer.admit(wallet(2), group, RelayOp::Vote).await.unwrap();
    match relayer.admit(wallet(3), group, RelayOp::Vote).await {
        Err(RelayError::RateLimitExceeded { key, limit, .. }) => {
            assert_eq!(key, RateLimitKey::group(GroupId::new(7)));
            assert_eq!(limit, 2);
        }
        other => panic!("unexpected result: {:?}", other),
    }
    // calls without a group only count against the user
    relayer
        .admit(wallet(3), None, RelayOp::CreateGroup)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_submit_with_sponsored_context() {
    treasury_logger::init_for_test();
    let time_service = MockTimeService::new_with_value(1_000_000);
    let relayer = relayer(10, 10, &time_service);
    let ledger = MockLedger::new(time_service.clone());
    let group_id = relayer
        .submit(wallet(1), None, RelayOp::CreateGroup, |ctx| {
            assert_eq!(ctx.fee_payer, wallet(0xfe));
            assert_eq!(ctx.sender, wallet(1));
            let ledger = &ledger;
            async move { ledger.create_group(&ctx, new_group()).await }
        })
        .await
        .unwrap();
    let group = ledger.get_group(group_id).await.unwrap().unwrap();
    assert_eq!(group.creator, wallet(1));
}

#[tokio::test]
async fn test_failure_keeps_cause_and_consumes_quota() {
    treasury_logger::init_for_test();
    let time_service = MockTimeService::new_with_value(1_000_000);
    let relayer = relayer(2, 10, &time_service);
    let ledger = MockLedger::new(time_service.clone());
    ledger.fail_next("create_group", Fault::Transport("node offline".to_string()));
    let err = relayer
        .submit(wallet(1), None, RelayOp::CreateGroup, |ctx| {
            let ledger = &ledger;
            async move { ledger.create_group(&ctx, new_group()).await }
        })
        .await
        .unwrap_err();
    match &err {
        RelayError::Submission { op, source } => {
            assert_eq!(*op, RelayOp::CreateGroup);
            assert!(source.is_transport());
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.rejection().is_none());

    ledger.fail_next("create_group", Fault::Rejected("paused".to_string()));
    let err = relayer
        .submit(wallet(1), None, RelayOp::CreateGroup, |ctx| {
            let ledger = &ledger;
            async move { ledger.create_group(&ctx, new_group()).await }
        })
        .await
        .unwrap_err();
    assert!(matches!(err.rejection(), Some(LedgerError::Rejected(_))));

    // both failed calls used up the quota
    let err = relayer
        .admit(wallet(1), None, RelayOp::CreateGroup)
        .await
        .unwrap_err();
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn test_submit_timeout() {
    treasury_logger::init_for_test();
    let time_service = MockTimeService::new_with_value(1_000_000);
    let relayer = relayer(10, 10, &time_service);
    let ledger = MockLedger::new(time_service.clone());
    ledger.set_delay("create_group", Some(Duration::from_secs(2)));
    let err = relayer
        .submit(wallet(1), None, RelayOp::CreateGroup, |ctx| {
            let ledger = &ledger;
            async move { ledger.create_group(&ctx, new_group()).await }
        })
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(matches!(
        err,
        RelayError::Timeout {
            op: RelayOp::CreateGroup,
            ..
        }
    ));
}

#[tokio::test]
async fn test_metrics() {
    treasury_logger::init_for_test();
    let registry = Registry::new();
    let metrics = RelayerMetrics::register(&registry).unwrap();
    let time_service = MockTimeService::new_with_value(1_000_000);
    let relayer = relayer(1, 10, &time_service).with_metrics(metrics.clone());
    let ledger = MockLedger::new(time_service.clone());
    relayer
        .submit(wallet(1), None, RelayOp::CreateGroup, |ctx| {
            let ledger = &ledger;
            async move { ledger.create_group(&ctx, new_group()).await }
        })
        .await
        .unwrap();
    assert!(relayer
        .admit(wallet(1), None, RelayOp::CreateGroup)
        .await
        .is_err());
    assert_eq!(
        metrics
            .relayed_calls
            .with_label_values(&["create_group", "ok"])
            .get(),
        1
    );
    assert_eq!(
        metrics
            .relayed_calls
            .with_label_values(&["create_group", "limited"])
            .get(),
        1
    );
    assert!(!registry.gather().is_empty());
}

#[test]
fn test_metrics_register_twice() {
    let registry = Registry::new();
    RelayerMetrics::register(&registry).unwrap();
    assert!(matches!(
        RelayerMetrics::register(&registry),
        Err(prometheus::Error::AlreadyReg)
    ));
}

#[test]
fn test_from_config() {
    let mut config = RelayConfig::default();
    config.set_fee_payer(wallet(0xaa));
    config.set_user_quota("5/h".parse::<QuotaConfig>().unwrap());
    let relayer = Relayer::from_config(
        &config,
        Arc::new(InMemoryCounterStore::new()),
        Arc::new(MockTimeService::new()),
    );
    assert_eq!(relayer.fee_payer(), wallet(0xaa));
    assert_eq!(relayer.submit_timeout(), Duration::from_secs(30));
    assert_eq!(relayer.context(wallet(1)).fee_payer, wallet(0xaa));
}
