//! Device clock backed by the embassy time driver

use embassy_time::Instant;

use tether_hal::Clock;

/// Time since boot, truncated to the engine's 32-bit counters
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_millis(&self) -> u32 {
        Instant::now().as_millis() as u32
    }

    fn now_micros(&self) -> u32 {
        Instant::now().as_micros() as u32
    }
}
