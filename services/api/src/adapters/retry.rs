//! services/api/src/adapters/retry.rs
//!
//! Bounded retry around establishing a provider call. Only errors the
//! classifier marks as transient are retried; everything else propagates
//! on the first attempt.

use std::future::Future;
use std::time::Duration;

use sintgpt_core::ports::{PortError, PortResult};
use tracing::{info, warn};

/// A fixed-delay retry budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Runs `op` until it succeeds, the classifier declares the error
    /// permanent, or the attempt budget is spent.
    pub async fn run<T, F, Fut, C>(&self, mut op: F, is_transient: C) -> PortResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PortResult<T>>,
        C: Fn(&PortError) -> bool,
    {
        let mut attempt = 1;
        loop {
            info!("Attempt {} of {}", attempt, self.max_attempts);
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && attempt < self.max_attempts => {
                    warn!(
                        "Transient provider error, retrying in {:?} (attempt {}/{}): {}",
                        self.delay, attempt, self.max_attempts, err
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Classifier for the provider's transient "overloaded" condition.
pub fn is_overloaded(err: &PortError) -> bool {
    match err {
        PortError::Provider { status, message } => {
            *status == 503
                || message.to_lowercase().contains("overloaded")
                || message.contains("UNAVAILABLE")
        }
        _ => false,
    }
}
