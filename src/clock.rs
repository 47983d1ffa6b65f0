//! Time source abstraction.
//!
//! The probers sleep between measurements and compare elapsed wall time
//! against `t_max`/`t_wait`/binary-search midpoints. Routing both through a
//! `Clock` trait (rather than calling `std::time::Instant`/`thread::sleep`
//! directly) lets the scenario tests in `hard_timeout`/`idle_timeout` run a
//! `t_max = 60` probe without burning sixty real seconds per test.

use std::cell::Cell;
use std::time::{Duration, Instant};

pub trait Clock {
    /// Elapsed time since this clock was created.
    fn now(&self) -> Duration;
    fn sleep(&self, d: Duration);
}

pub struct RealClock {
    start: Instant,
}

impl RealClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for RealClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RealClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// A clock with no real delay: `sleep` just advances the counter.
#[cfg(test)]
pub struct VirtualClock {
    elapsed: Cell<Duration>,
}

#[cfg(test)]
impl VirtualClock {
    pub fn new() -> Self {
        Self { elapsed: Cell::new(Duration::ZERO) }
    }
}

#[cfg(test)]
impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        self.elapsed.get()
    }

    fn sleep(&self, d: Duration) {
        self.elapsed.set(self.elapsed.get() + d);
    }
}
