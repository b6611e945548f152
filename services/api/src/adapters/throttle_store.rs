//! services/api/src/adapters/throttle_store.rs
//!
//! In-memory implementation of the `ThrottleStore` port, backing the
//! per-client rate limit and debounce window for single-instance
//! deployments. A multi-instance deployment would swap in a shared store
//! behind the same port.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use sintgpt_core::{
    domain::RateLimitRecord,
    ports::ThrottleStore,
    throttle::{decide, AdmitDecision, RateLimitPolicy},
};

/// Per-client throttle state: the fixed-window counter plus the timestamp
/// of the last admitted request.
#[derive(Debug, Clone, Copy)]
struct ClientEntry {
    record: RateLimitRecord,
    last_request: DateTime<Utc>,
}

/// In-memory per-client throttle store on a concurrent map.
#[derive(Default)]
pub struct InMemoryThrottleStore {
    entries: DashMap<String, ClientEntry>,
}

impl InMemoryThrottleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ThrottleStore for InMemoryThrottleStore {
    async fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.entries.get(key).map(|entry| entry.record)
    }

    async fn try_admit(
        &self,
        key: &str,
        policy: &RateLimitPolicy,
        now: DateTime<Utc>,
    ) -> AdmitDecision {
        // The entry guard holds a per-key lock, making decision + commit
        // atomic: two concurrent requests from one client serialize here.
        match self.entries.entry(key.to_string()) {
            dashmap::Entry::Occupied(mut occupied) => {
                let state = occupied.get_mut();
                let decision = decide(
                    Some(&state.record),
                    Some(state.last_request),
                    policy,
                    now,
                );
                if let AdmitDecision::Admitted { record } = &decision {
                    state.record = *record;
                    state.last_request = now;
                }
                decision
            }
            dashmap::Entry::Vacant(vacant) => {
                let decision = decide(None, None, policy, now);
                if let AdmitDecision::Admitted { record } = &decision {
                    vacant.insert(ClientEntry {
                        record: *record,
                        last_request: now,
                    });
                }
                decision
            }
        }
    }

    async fn sweep(&self, now: DateTime<Utc>) {
        // Keep an entry while its window is live or its debounce history is
        // recent enough to still matter.
        let debounce_horizon = Duration::hours(1);
        self.entries.retain(|_, entry| {
            entry.record.reset_at > now || now - entry.last_request < debounce_horizon
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sintgpt_core::ports::ThrottleStore as _;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 5, 18, 0, 0).unwrap()
    }

    fn policy() -> RateLimitPolicy {
        RateLimitPolicy::default()
    }

    #[tokio::test]
    async fn admits_three_requests_then_rejects_the_fourth() {
        let store = InMemoryThrottleStore::new();
        let policy = policy();
        let mut now = t0();

        for expected_count in 1..=3u32 {
            match store.try_admit("1.2.3.4", &policy, now).await {
                AdmitDecision::Admitted { record } => assert_eq!(record.count, expected_count),
                other => panic!("request {} should be admitted, got {:?}", expected_count, other),
            }
            now += Duration::minutes(1);
        }

        match store.try_admit("1.2.3.4", &policy, now).await {
            AdmitDecision::LimitReached { hours_remaining } => assert!(hours_remaining > 0),
            other => panic!("fourth request should hit the limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn clients_are_throttled_independently() {
        let store = InMemoryThrottleStore::new();
        let policy = policy();

        assert!(matches!(
            store.try_admit("1.1.1.1", &policy, t0()).await,
            AdmitDecision::Admitted { .. }
        ));
        // A different client is not affected by the first one's debounce.
        assert!(matches!(
            store.try_admit("2.2.2.2", &policy, t0()).await,
            AdmitDecision::Admitted { .. }
        ));
    }

    #[tokio::test]
    async fn debounce_rejects_a_quick_second_request() {
        let store = InMemoryThrottleStore::new();
        let policy = policy();

        store.try_admit("1.2.3.4", &policy, t0()).await;
        match store.try_admit("1.2.3.4", &policy, t0() + Duration::seconds(3)).await {
            AdmitDecision::TooSoon { retry_after_secs } => assert_eq!(retry_after_secs, 7),
            other => panic!("expected debounce rejection, got {:?}", other),
        }

        // A debounce rejection must not consume rate-limit budget.
        let record = store.get("1.2.3.4").await.unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_counter() {
        let store = InMemoryThrottleStore::new();
        let policy = policy();
        let mut now = t0();

        for _ in 0..3 {
            store.try_admit("1.2.3.4", &policy, now).await;
            now += Duration::minutes(1);
        }
        now = t0() + policy.window + Duration::seconds(1);
        match store.try_admit("1.2.3.4", &policy, now).await {
            AdmitDecision::Admitted { record } => assert_eq!(record.count, 1),
            other => panic!("expected a fresh window, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn sweep_evicts_only_stale_entries() {
        let store = InMemoryThrottleStore::new();
        let policy = policy();

        store.try_admit("stale", &policy, t0()).await;
        let later = t0() + Duration::hours(20);
        store.try_admit("fresh", &policy, later).await;

        // Past the stale client's window and debounce horizon, inside the
        // fresh client's window.
        store.sweep(t0() + Duration::hours(26)).await;

        assert!(store.get("stale").await.is_none());
        assert!(store.get("fresh").await.is_some());
    }
}
