// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait TimeService: Send + Sync {
    /// Seconds since the unix epoch.
    fn now_secs(&self) -> u64 {
        self.now_millis() / 1000
    }

    /// Milliseconds since the unix epoch.
    fn now_millis(&self) -> u64;
}

#[derive(Default, Debug, Clone)]
pub struct RealTimeService;

impl RealTimeService {
    pub fn new() -> Self {
        Self
    }
}

impl TimeService for RealTimeService {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// A manually driven clock, time only moves by `increase` or `set`.
#[derive(Debug, Clone, Default)]
pub struct MockTimeService {
    millis: Arc<AtomicU64>,
}

impl MockTimeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_with_value(millis: u64) -> Self {
        Self {
            millis: Arc::new(AtomicU64::new(millis)),
        }
    }

    pub fn increase(&self, duration: Duration) {
        self.millis
            .fetch_add(duration.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeService for MockTimeService {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_time_service() {
        let time_service = MockTimeService::new_with_value(1_000);
        assert_eq!(time_service.now_secs(), 1);
        let shared = time_service.clone();
        shared.increase(Duration::from_secs(10));
        assert_eq!(time_service.now_millis(), 11_000);
        time_service.set(0);
        assert_eq!(shared.now_secs(), 0);
    }

    #[test]
    fn test_real_time_service() {
        let time_service = RealTimeService::new();
        let t1 = time_service.now_millis();
        assert!(t1 > 0);
        assert!(time_service.now_millis() >= t1);
    }
}
