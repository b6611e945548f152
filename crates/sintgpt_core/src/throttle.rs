//! crates/sintgpt_core/src/throttle.rs
//!
//! Pure admission logic for the per-client rate limit and debounce window.
//! The decision is separated from storage so any `ThrottleStore` backend
//! can apply it under its own atomicity primitive.

use chrono::{DateTime, Duration, Utc};

use crate::domain::RateLimitRecord;

/// The knobs of the fixed-window rate limit and the debounce spacing.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    /// Maximum admitted requests per window.
    pub max_requests: u32,
    /// Length of the fixed window.
    pub window: Duration,
    /// Minimum spacing between consecutive accepted requests.
    pub debounce: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::hours(24),
            debounce: Duration::seconds(10),
        }
    }
}

/// Outcome of one admission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmitDecision {
    /// The request may proceed; `record` is the state the store must
    /// commit (counter already incremented for this request).
    Admitted { record: RateLimitRecord },
    /// Rejected by the debounce window.
    TooSoon { retry_after_secs: i64 },
    /// Rejected by the rate limit; `hours_remaining` is strictly positive.
    LimitReached { hours_remaining: i64 },
}

/// Decides whether one request from a client is admitted.
///
/// The debounce check runs first and never touches the counter. A missing
/// or expired window admits the request with a fresh counter of 1; an
/// active window at the limit rejects; otherwise the returned record
/// carries the incremented count. Stores must commit the returned record
/// and the debounce timestamp atomically with this decision.
pub fn decide(
    record: Option<&RateLimitRecord>,
    last_request: Option<DateTime<Utc>>,
    policy: &RateLimitPolicy,
    now: DateTime<Utc>,
) -> AdmitDecision {
    if let Some(last) = last_request {
        let elapsed = now - last;
        if elapsed < policy.debounce {
            let retry_after_secs = (policy.debounce - elapsed).num_seconds().max(1);
            return AdmitDecision::TooSoon { retry_after_secs };
        }
    }

    match record {
        Some(rec) if rec.reset_at > now => {
            if rec.count >= policy.max_requests {
                let remaining = rec.reset_at - now;
                // Whole hours, rounded up, so the caller never sees zero
                // while the limit still applies.
                let hours_remaining = ((remaining.num_seconds() + 3599) / 3600).max(1);
                AdmitDecision::LimitReached { hours_remaining }
            } else {
                AdmitDecision::Admitted {
                    record: RateLimitRecord {
                        count: rec.count + 1,
                        reset_at: rec.reset_at,
                    },
                }
            }
        }
        // First request from this client, or the window has expired:
        // start a new window counting the current request.
        _ => AdmitDecision::Admitted {
            record: RateLimitRecord {
                count: 1,
                reset_at: now + policy.window,
            },
        },
    }
}
