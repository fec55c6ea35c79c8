//! Time sources
//!
//! Both counters are free-running 32-bit values that wrap: milliseconds
//! after ~49.7 days, microseconds after ~71.6 minutes.

use core::cell::Cell;

/// Monotonic clock read by the message engine
pub trait Clock {
    /// Milliseconds since an unspecified starting point
    fn now_millis(&self) -> u32;

    /// Microseconds since an unspecified starting point
    fn now_micros(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now_millis(&self) -> u32 {
        (**self).now_millis()
    }

    fn now_micros(&self) -> u32 {
        (**self).now_micros()
    }
}

/// Clock that only moves when told to
///
/// Keeps a 64-bit microsecond count internally and truncates on read,
/// so both views wrap the way a hardware counter does.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: Cell<u64>,
}

impl ManualClock {
    /// Create a clock reading zero
    pub const fn new() -> Self {
        Self {
            micros: Cell::new(0),
        }
    }

    /// Create a clock reading `ms` milliseconds
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::new();
        clock.set_millis(ms);
        clock
    }

    /// Jump to an absolute millisecond value
    pub fn set_millis(&self, ms: u32) {
        self.micros.set(u64::from(ms) * 1000);
    }

    /// Move forward by `ms` milliseconds
    pub fn advance_millis(&self, ms: u32) {
        self.advance_micros(u64::from(ms) * 1000);
    }

    /// Move forward by `us` microseconds
    pub fn advance_micros(&self, us: u64) {
        self.micros.set(self.micros.get().wrapping_add(us));
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u32 {
        (self.micros.get() / 1000) as u32
    }

    fn now_micros(&self) -> u32 {
        self.micros.get() as u32
    }
}
