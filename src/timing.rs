//! Time Abstractions
//!
//! Monotonic timestamps, the clock trait the acquisition and pipeline code
//! are written against, and the deadline helpers used for sample timing and
//! frame pacing.

use core::time::Duration;

use crate::config::RATE_EMA_WEIGHT;
use crate::types::SampleRate;

/// Monotonic instant in nanoseconds since an arbitrary origin
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Origin
    pub const ZERO: Self = Self(0);

    /// Create a timestamp from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Nanoseconds since the origin
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Timestamp `nanos` later, saturating
    #[must_use]
    pub const fn add_nanos(self, nanos: u64) -> Self {
        Self(self.0.saturating_add(nanos))
    }

    /// Timestamp `duration` later, saturating
    #[must_use]
    pub fn add(self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.add_nanos(nanos)
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Timestamp {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}us", self.0 / 1_000);
    }
}

/// Monotonic time source with a blocking wait
pub trait Clock {
    /// Current time
    fn now(&self) -> Timestamp;

    /// Block until `deadline`; returns immediately if it has passed
    fn sleep_until(&self, deadline: Timestamp);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }

    fn sleep_until(&self, deadline: Timestamp) {
        (**self).sleep_until(deadline);
    }
}

/// Sample deadlines for a fixed rate
///
/// Deadline `i` is `origin + i / rate`, computed from the origin every time so
/// that rounding never accumulates into drift.
#[derive(Clone, Copy, Debug)]
pub struct SampleTicker {
    origin: Timestamp,
    rate_hz: u64,
    index: u64,
}

impl SampleTicker {
    /// Start a ticker whose first deadline is `origin`
    #[must_use]
    pub const fn new(origin: Timestamp, rate: SampleRate) -> Self {
        Self {
            origin,
            rate_hz: rate.as_hz() as u64,
            index: 0,
        }
    }

    /// Deadline of sample `index`
    #[must_use]
    pub const fn deadline(&self, index: u64) -> Timestamp {
        self.origin.add_nanos(index * 1_000_000_000 / self.rate_hz)
    }

    /// Samples issued so far
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.index
    }
}

impl Iterator for SampleTicker {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        let deadline = self.deadline(self.index);
        self.index += 1;
        Some(deadline)
    }
}

/// Fixed-period frame pacing
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    period: Duration,
    frame_start: Timestamp,
}

impl FramePacer {
    /// Create a pacer for a fixed frame period
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self {
            period,
            frame_start: Timestamp::ZERO,
        }
    }

    /// Frame period
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Mark the start of a frame
    pub fn start_frame(&mut self, now: Timestamp) {
        self.frame_start = now;
    }

    /// Time left in the current frame at `now`
    #[must_use]
    pub fn remaining(&self, now: Timestamp) -> Duration {
        self.period
            .saturating_sub(now.saturating_duration_since(self.frame_start))
    }

    /// Sleep out the rest of the frame; returns the time slept
    pub fn wait<C: Clock + ?Sized>(&self, clock: &C) -> Duration {
        let remaining = self.remaining(clock.now());
        if !remaining.is_zero() {
            clock.sleep_until(self.frame_start.add(self.period));
        }
        remaining
    }
}

/// Frame-to-frame rate measurement
#[derive(Clone, Copy, Debug, Default)]
pub struct FpsMeter {
    last: Option<Timestamp>,
    fps: f32,
}

impl FpsMeter {
    /// Create a meter with no history
    #[must_use]
    pub const fn new() -> Self {
        Self { last: None, fps: 0.0 }
    }

    /// Record a frame at `now`; the rate updates from the second frame on
    pub fn record(&mut self, now: Timestamp) -> f32 {
        if let Some(last) = self.last {
            let interval = now.saturating_duration_since(last).as_nanos();
            if interval > 0 {
                self.fps = 1e9 / interval as f32;
            }
        }
        self.last = Some(now);
        self.fps
    }

    /// Most recent rate in frames per second
    #[must_use]
    pub const fn fps(&self) -> f32 {
        self.fps
    }

    /// Forget history
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Fold a new per-buffer rate into the moving average
///
/// The first measurement (previous value zero) is taken as-is.
#[must_use]
pub fn smooth_rate(previous_hz: f32, measured_hz: f32) -> f32 {
    if previous_hz <= 0.0 {
        measured_hz
    } else {
        previous_hz * (1.0 - RATE_EMA_WEIGHT) + measured_hz * RATE_EMA_WEIGHT
    }
}

/// Sample rate implied by `samples` arriving over `elapsed`
#[must_use]
pub fn rate_from_interval(samples: usize, elapsed: Duration) -> Option<f32> {
    let nanos = elapsed.as_nanos();
    (nanos > 0).then(|| samples as f32 * 1e9 / nanos as f32)
}
