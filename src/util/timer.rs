//! Time sources
//!
//! Everything in the engine that measures elapsed time goes through [`Clock`], so a host
//! (or a test) can swap the wall clock for one it advances by hand.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Shared clock handle, cloned into every component that measures time.
pub type SharedClock = Arc<dyn Clock>;

/// Wall clock backed by [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Create a clock whose origin is now
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Create a shared handle to a new wall clock
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
///
/// Stored as whole microseconds so it can be shared across threads without a lock.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    /// Create a clock stopped at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock stopped at zero, ready to be shared
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Move the clock forward
    pub fn advance(
        &self,
        by: Duration,
    ) {
        self.micros
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(
        &self,
        at: Duration,
    ) {
        self.micros.store(at.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }
}

/// Stopwatch reading from a [`Clock`].
#[derive(Debug, Clone)]
pub struct Timer {
    clock: SharedClock,
    started: Duration,
}

impl Timer {
    /// Start a stopwatch now
    pub fn start(clock: SharedClock) -> Self {
        let started = clock.now();
        Self { clock, started }
    }

    /// Time since the stopwatch was (re)started
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_sub(self.started)
    }

    /// Restart from zero
    pub fn restart(&mut self) {
        self.started = self.clock.now();
    }
}
