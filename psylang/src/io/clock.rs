//! Time sources for the host loop.
//!
//! Both clocks report time elapsed since the run started, which is the time
//! base the scheduler works in.

use std::thread;
use std::time::{Duration, Instant};

/// Monotonic time plus the ability to wait for a later instant.
pub trait Clock {
    /// Time elapsed since the run started.
    fn now(&self) -> Duration;
    /// Block until `now() >= deadline`. Returns immediately if already past.
    fn sleep_until(&mut self, deadline: Duration);
}

/// Real monotonic time.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn sleep_until(&mut self, deadline: Duration) {
        if let Some(remaining) = deadline.checked_sub(self.now()) {
            thread::sleep(remaining);
        }
    }
}

/// Simulated time that jumps straight to each requested deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct VirtualClock {
    now: Duration,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `delta`, e.g. to inject jitter in tests.
    pub fn advance(&mut self, delta: Duration) {
        self.now += delta;
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep_until(&mut self, deadline: Duration) {
        self.now = self.now.max(deadline);
    }
}
