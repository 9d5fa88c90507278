//! Token-bucket rate limiter
//!
//! Bounds how often outgoing cloud updates leave the engine. The bucket starts full,
//! refills continuously at `rate` tokens per second and never holds more than `rate`
//! tokens. A refused caller keeps its message and asks again later.

use crate::util::timer::SharedClock;
use std::time::Duration;
use tracing::trace;

/// Token bucket over an injectable clock.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    /// Bucket capacity, equal to the refill rate
    capacity: f64,
    /// Tokens refilled per second
    rate: f64,
    /// Tokens currently available, always within `[0, capacity]`
    tokens: f64,
    /// Clock reading at the last refill
    last_refill: Duration,
    clock: SharedClock,
}

impl RateLimiter {
    /// Create a limiter allowing `rate` sends per second, starting with a full bucket.
    pub fn new(
        rate: u32,
        clock: SharedClock,
    ) -> Self {
        let rate = f64::from(rate);
        let last_refill = clock.now();
        Self {
            capacity: rate,
            rate,
            tokens: rate,
            last_refill,
            clock,
        }
    }

    /// Refill from elapsed time, then take one token if there is one.
    pub fn okay_to_send(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            trace!(tokens = self.tokens, "rate limiter refused send");
            false
        }
    }

    /// Tokens available right now (after a lazy refill).
    pub fn available(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    /// Bucket capacity
    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    fn refill(&mut self) {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_refill).as_secs_f64();
        self.last_refill = now;
        self.tokens = (self.tokens + elapsed * self.rate).clamp(0.0, self.capacity);
    }
}
