//! Deadline timer driven by tick time.
//!
//! Pure elapsed-time comparison: nothing is scheduled, the owner advances the clock and
//! asks whether the deadline has passed.

use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Deadline {
    /// Monotonic time accumulated through `advance`.
    now: Duration,
    deadline: Duration,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, dt: Duration) {
        self.now += dt;
    }

    /// Arm the deadline `duration` from now. A zero duration is already elapsed.
    pub fn set(&mut self, duration: Duration) {
        self.deadline = self.now + duration;
    }

    pub fn clear(&mut self) {
        self.set(Duration::ZERO);
    }

    #[inline]
    pub fn elapsed(&self) -> bool {
        self.now >= self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_sub(self.now)
    }
}
