//! Project timer

use super::{IoContext, IoDevice};
use crate::util::timer::SharedClock;
use std::time::Duration;

/// Pause or resume the project timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockEvent {
    pub paused: bool,
}

/// The timer read by the `timer` reporter
#[derive(Debug, Clone)]
pub struct ProjectClock {
    clock: SharedClock,
    origin: Duration,
    paused_at: Option<Duration>,
}

impl ProjectClock {
    pub fn new(clock: SharedClock) -> Self {
        let origin = clock.now();
        Self {
            clock,
            origin,
            paused_at: None,
        }
    }

    /// Seconds since the last reset, not counting paused time
    pub fn project_timer(&self) -> f64 {
        let now = self.paused_at.unwrap_or_else(|| self.clock.now());
        now.saturating_sub(self.origin).as_secs_f64()
    }

    pub fn reset(&mut self) {
        let now = self.clock.now();
        self.origin = now;
        if self.paused_at.is_some() {
            self.paused_at = Some(now);
        }
    }

    pub fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(self.clock.now());
        }
    }

    pub fn resume(&mut self) {
        if let Some(paused_at) = self.paused_at.take() {
            self.origin += self.clock.now().saturating_sub(paused_at);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }
}

impl IoDevice for ProjectClock {
    type Data = ClockEvent;

    fn post_data(
        &mut self,
        data: ClockEvent,
        _cx: &mut IoContext<'_>,
    ) {
        if data.paused {
            self.pause();
        } else {
            self.resume();
        }
    }
}
