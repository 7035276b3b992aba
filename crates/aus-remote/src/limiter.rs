//! Token-bucket throttling for outbound requests.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{RemoteError, Result};

/// Requests per second the public review servers tolerate for a logged-in
/// user.
pub const DEFAULT_RATE_PER_SECOND: u32 = 8;

/// Requests that may be issued back to back before throttling starts.
pub const DEFAULT_BURST: u32 = 4;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket shared by every request a client makes.
///
/// The bucket starts full (`burst` tokens) and refills at `rate` tokens per
/// second, never exceeding `burst`. Waiters are served in arrival order
/// because the bucket lock is a fair tokio mutex held across the wait.
#[derive(Debug)]
pub struct RateLimiter {
    rate: f64,
    burst: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(rate_per_second: u32, burst: u32) -> Result<Self> {
        if rate_per_second == 0 {
            return Err(RemoteError::InvalidLimit(
                "rate must be at least one request per second".into(),
            ));
        }
        if burst == 0 {
            return Err(RemoteError::InvalidLimit("burst must be at least 1".into()));
        }
        Ok(Self::with_limits(rate_per_second, burst))
    }

    fn with_limits(rate_per_second: u32, burst: u32) -> Self {
        let burst = f64::from(burst);
        Self {
            rate: f64::from(rate_per_second),
            burst,
            bucket: Mutex::new(Bucket {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn rate_per_second(&self) -> f64 {
        self.rate
    }

    pub fn burst(&self) -> f64 {
        self.burst
    }

    /// Wait until a token is available and take it.
    pub async fn acquire(&self) {
        let mut bucket = self.bucket.lock().await;
        self.refill(&mut bucket);
        if bucket.tokens < 1.0 {
            let wait = Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate);
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limited");
            tokio::time::sleep(wait).await;
            self.refill(&mut bucket);
            // The sleep covered exactly the missing fraction.
            bucket.tokens = bucket.tokens.max(1.0);
        }
        bucket.tokens -= 1.0;
    }

    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.burst);
        bucket.last_refill = now;
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::with_limits(DEFAULT_RATE_PER_SECOND, DEFAULT_BURST)
    }
}
