//! Time source for busy-wait polling.
//!
//! Every wait in the endpoint goes through a [`Clock`], so tests can run the
//! timeout logic against [`ManualClock`] without sleeping.

use std::time::Duration;

/// Source of delays for polling loops.
pub trait Clock {
    /// Block for `duration`.
    fn sleep(&mut self, duration: Duration);
}

/// Wall-clock delays via `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Records requested delays without sleeping.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    elapsed: Duration,
    sleeps: usize,
}

impl ManualClock {
    /// Create a clock at zero elapsed time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of sleep calls.
    pub fn sleeps(&self) -> usize {
        self.sleeps
    }
}

impl Clock for ManualClock {
    fn sleep(&mut self, duration: Duration) {
        self.elapsed += duration;
        self.sleeps += 1;
    }
}

/// Bounded busy-wait parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Delay between polls of the transport.
    pub poll_interval: Duration,
    /// Consecutive idle polls allowed before a timeout.
    pub max_passes: u32,
}

impl WaitPolicy {
    /// Longest time a wait can stay idle.
    pub fn budget(&self) -> Duration {
        self.poll_interval * self.max_passes
    }
}
