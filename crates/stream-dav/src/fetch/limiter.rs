//! Token-bucket rate limiter for outbound fetches.

use super::FetchError;
use log::trace;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Bounds how often fetches may start.
///
/// Holds up to `burst` permits and refills at `rate` permits per second.
/// Waiters reserve a permit up front and sleep until it is due, so permits
/// are handed out in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    bucket: Option<Mutex<Bucket>>,
}

#[derive(Debug)]
struct Bucket {
    rate: f64,
    burst: f64,
    tokens: f64,
    last: Instant,
}

impl Bucket {
    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.burst);
        self.last = now;
    }
}

impl RateLimiter {
    /// `rate` permits per second with a bucket of `burst` permits.
    ///
    /// `rate` must be positive; a `burst` of zero is treated as one.
    pub fn new(rate: f64, burst: u32) -> Self {
        let burst = f64::from(burst.max(1));
        Self {
            bucket: Some(Mutex::new(Bucket {
                rate,
                burst,
                tokens: burst,
                last: Instant::now(),
            })),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self { bucket: None }
    }

    /// Wait for a permit, or fail with [`FetchError::Cancelled`] if `cancel`
    /// fires first.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<(), FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let Some(bucket) = &self.bucket else {
            return Ok(());
        };

        let wait = {
            let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            bucket.refill(Instant::now());
            bucket.tokens -= 1.0;
            if bucket.tokens >= 0.0 {
                return Ok(());
            }
            Duration::from_secs_f64(-bucket.tokens / bucket.rate)
        };

        trace!("Waiting {:?} for fetch permit", wait);

        tokio::select! {
            _ = tokio::time::sleep(wait) => Ok(()),
            _ = cancel.cancelled() => {
                // Hand the reserved permit back.
                let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
                bucket.refill(Instant::now());
                bucket.tokens = (bucket.tokens + 1.0).min(bucket.burst);
                Err(FetchError::Cancelled)
            }
        }
    }
}
