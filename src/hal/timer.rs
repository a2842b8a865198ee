//! Timer Abstractions
//!
//! Blocking clock over `embassy_time` for sample deadlines and frame pacing.

use embassy_time::{block_for, Instant};

use crate::timing::{Clock, Timestamp};

/// Monotonic clock backed by the embassy time driver
///
/// Microsecond resolution; waits busy-spin so they can be used from a
/// blocking main loop.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(Instant::now().as_micros().saturating_mul(1_000))
    }

    fn sleep_until(&self, deadline: Timestamp) {
        let target = Instant::from_micros(deadline.as_nanos() / 1_000);
        let now = Instant::now();
        if target > now {
            block_for(target - now);
        }
    }
}

impl defmt::Format for EmbassyClock {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "EmbassyClock({}us)", Instant::now().as_micros());
    }
}

