// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use treasury_logger::prelude::*;
use treasury_time_service::TimeService;

/// A limit of `max_calls` inside a rolling window of `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub max_calls: NonZeroU32,
    pub window: Duration,
}

impl Quota {
    pub fn new(max_calls: NonZeroU32, window: Duration) -> Self {
        Self { max_calls, window }
    }

    pub fn per_day(max_calls: NonZeroU32) -> Self {
        Self::new(max_calls, Duration::from_secs(24 * 60 * 60))
    }

    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }
}

/// Counter key, either `user:<wallet>` or `group:<group id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn user(wallet: impl fmt::Display) -> Self {
        Self(format!("user:{}", wallet))
    }

    pub fn group(group_id: impl fmt::Display) -> Self {
        Self(format!("group:{}", group_id))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounter {
    pub count: u64,
    /// Unix seconds at which the current window ends.
    pub reset_at: u64,
}

/// Backing store of the rolling window counters.
///
/// A deployment with more than one relay instance must share one store,
/// so `increment` has to be atomic in the store itself.
#[async_trait::async_trait]
pub trait CounterStore: Send + Sync {
    /// Bump the counter of `key` and return its value after the increment.
    /// A missing or expired counter restarts at 1 with a window ending at `now_secs + window_secs`.
    async fn increment(&self, key: &str, now_secs: u64, window_secs: u64) -> Result<WindowCounter>;

    async fn get(&self, key: &str) -> Result<Option<WindowCounter>>;
}

/// Process local counters, only valid for a single instance deployment and tests.
#[derive(Debug, Default)]
pub struct InMemoryCounterStore {
    counters: DashMap<String, WindowCounter>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }
}

#[async_trait::async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, now_secs: u64, window_secs: u64) -> Result<WindowCounter> {
        let fresh = WindowCounter {
            count: 1,
            reset_at: now_secs.saturating_add(window_secs),
        };
        let counter = match self.counters.entry(key.to_string()) {
            Entry::Occupied(mut o) => {
                let counter = o.get_mut();
                if now_secs >= counter.reset_at {
                    *counter = fresh;
                } else {
                    counter.count = counter.count.saturating_add(1);
                }
                *counter
            }
            Entry::Vacant(v) => *v.insert(fresh),
        };
        Ok(counter)
    }

    async fn get(&self, key: &str) -> Result<Option<WindowCounter>> {
        Ok(self.counters.get(key).map(|c| *c))
    }
}

#[derive(Error, Debug)]
pub enum LimitError {
    #[error("rate limit exceeded for {key}: at most {limit} calls per {window:?}, retry after {retry_at}")]
    Exceeded {
        key: RateLimitKey,
        limit: u32,
        window: Duration,
        retry_at: u64,
    },
    #[error("rate limit counter store failed: {0:?}")]
    Store(anyhow::Error),
}

impl LimitError {
    pub fn is_exceeded(&self) -> bool {
        matches!(self, Self::Exceeded { .. })
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    time_service: Arc<dyn TimeService>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, time_service: Arc<dyn TimeService>) -> Self {
        Self {
            store,
            time_service,
        }
    }

    /// Consume one call of `key`, return false once the quota of the current window is used up.
    pub async fn check_and_consume(&self, key: &RateLimitKey, quota: &Quota) -> Result<bool> {
        self.consume(key, quota).await.map(|c| c.count <= quota.max_calls.get() as u64)
    }

    async fn consume(&self, key: &RateLimitKey, quota: &Quota) -> Result<WindowCounter> {
        let now = self.time_service.now_secs();
        self.store
            .increment(key.as_str(), now, quota.window_secs())
            .await
    }

    async fn check_key(&self, key: &RateLimitKey, quota: &Quota) -> Result<(), LimitError> {
        let counter = self.consume(key, quota).await.map_err(LimitError::Store)?;
        if counter.count > quota.max_calls.get() as u64 {
            debug!(
                "{} used {} calls of {} in window ending at {}",
                key, counter.count, quota.max_calls, counter.reset_at
            );
            return Err(LimitError::Exceeded {
                key: key.clone(),
                limit: quota.max_calls.get(),
                window: quota.window,
                retry_at: counter.reset_at,
            });
        }
        Ok(())
    }
}

/// Per user and per group quota, a call must pass both.
#[derive(Clone)]
pub struct UserGroupLimiter {
    limiter: RateLimiter,
    user_quota: Quota,
    group_quota: Quota,
}

impl UserGroupLimiter {
    pub fn new(limiter: RateLimiter, user_quota: Quota, group_quota: Quota) -> Self {
        Self {
            limiter,
            user_quota,
            group_quota,
        }
    }

    pub fn user_quota(&self) -> Quota {
        self.user_quota
    }

    pub fn group_quota(&self) -> Quota {
        self.group_quota
    }

    /// The user counter is consumed first, a call rejected by the group quota still costs user quota.
    pub async fn check(
        &self,
        user: &RateLimitKey,
        group: &RateLimitKey,
    ) -> Result<(), LimitError> {
        self.limiter.check_key(user, &self.user_quota).await?;
        self.limiter.check_key(group, &self.group_quota).await?;
        Ok(())
    }

    /// Only the user counter, for calls not bound to a group yet.
    pub async fn check_user(&self, user: &RateLimitKey) -> Result<(), LimitError> {
        self.limiter.check_key(user, &self.user_quota).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_time_service::MockTimeService;

    fn quota(n: u32, window_secs: u64) -> Quota {
        Quota::new(NonZeroU32::new(n).unwrap(), Duration::from_secs(window_secs))
    }

    fn limiter() -> (RateLimiter, MockTimeService) {
        let time_service = MockTimeService::new_with_value(1_000_000);
        let limiter = RateLimiter::new(
            Arc::new(InMemoryCounterStore::new()),
            Arc::new(time_service.clone()),
        );
        (limiter, time_service)
    }

    #[tokio::test]
    async fn test_limit_then_window_reset() {
        let (limiter, time_service) = limiter();
        let key = RateLimitKey::user("0xabc");
        let quota = Quota::per_day(NonZeroU32::new(3).unwrap());
        for _ in 0..3 {
            assert!(limiter.check_and_consume(&key, &quota).await.unwrap());
        }
        assert!(!limiter.check_and_consume(&key, &quota).await.unwrap());
        assert!(!limiter.check_and_consume(&key, &quota).await.unwrap());

        time_service.increase(Duration::from_secs(24 * 60 * 60 - 1));
        assert!(!limiter.check_and_consume(&key, &quota).await.unwrap());

        time_service.increase(Duration::from_secs(1));
        assert!(limiter.check_and_consume(&key, &quota).await.unwrap());
        assert!(limiter.check_and_consume(&key, &quota).await.unwrap());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _) = limiter();
        let quota = quota(1, 60);
        let alice = RateLimitKey::user("alice");
        let bob = RateLimitKey::user("bob");
        assert!(limiter.check_and_consume(&alice, &quota).await.unwrap());
        assert!(!limiter.check_and_consume(&alice, &quota).await.unwrap());
        assert!(limiter.check_and_consume(&bob, &quota).await.unwrap());
        assert_eq!(alice.as_str(), "user:alice");
        assert_eq!(RateLimitKey::group(7).to_string(), "group:7");
    }

    #[tokio::test]
    async fn test_user_group_limiter() {
        let (limiter, _) = limiter();
        let limiter = UserGroupLimiter::new(limiter, quota(2, 60), quota(3, 60));
        let group = RateLimitKey::group(1);
        let alice = RateLimitKey::user("alice");
        let bob = RateLimitKey::user("bob");

        limiter.check(&alice, &group).await.unwrap();
        limiter.check(&alice, &group).await.unwrap();
        let err = limiter.check(&alice, &group).await.unwrap_err();
        match err {
            LimitError::Exceeded { key, limit, .. } => {
                assert_eq!(key, alice);
                assert_eq!(limit, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        limiter.check(&bob, &group).await.unwrap();
        let err = limiter.check(&bob, &group).await.unwrap_err();
        assert!(err.is_exceeded());
        assert!(err.to_string().contains("group:1"));
    }

    #[tokio::test]
    async fn test_concurrent_increments_are_counted_once_each() {
        let store = Arc::new(InMemoryCounterStore::new());
        let tasks = (0..50).map(|_| {
            let store = store.clone();
            async move { store.increment("group:9", 10, 60).await.unwrap() }
        });
        let mut counts: Vec<u64> = futures::future::join_all(tasks)
            .await
            .into_iter()
            .map(|c| c.count)
            .collect();
        counts.sort_unstable();
        assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
        assert_eq!(store.get("group:9").await.unwrap().unwrap().count, 50);
        assert_eq!(store.len(), 1);
    }
}
