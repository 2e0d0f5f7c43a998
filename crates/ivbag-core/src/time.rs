//! Monotonic time source
//!
//! The monitor asks a [`Clock`] for the current instant instead of calling
//! `Instant::now()` directly, so the upload schedule can be driven with
//! explicit instants in tests.

use embassy_time::Instant;

/// Source of monotonic time.
pub trait Clock {
    /// Current instant. Must never go backwards.
    fn now(&self) -> Instant;
}

/// Clock backed by the embassy time driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
