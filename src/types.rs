//! Shared types used across the analyzer firmware
//!
//! Domain newtypes that enforce their invariants at construction, plus the
//! acquisition status and counter types read by the pipeline.

use core::fmt;

use crate::config::{AMPLITUDE_MAX_DBM, AMPLITUDE_MIN_DBM};

/// Sampling rate in Hertz with validation
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleRate(u32);

impl SampleRate {
    /// Lowest accepted sampling rate
    pub const MIN_HZ: u32 = 1_000;

    /// Highest accepted sampling rate (ADC conversion limit with margin)
    pub const MAX_HZ: u32 = 2_000_000;

    /// Create a sample rate from Hz, returns None if out of range
    #[must_use]
    pub const fn from_hz(hz: u32) -> Option<Self> {
        if hz >= Self::MIN_HZ && hz <= Self::MAX_HZ {
            Some(Self(hz))
        } else {
            None
        }
    }

    /// Get the rate in Hz
    #[must_use]
    pub const fn as_hz(self) -> u32 {
        self.0
    }

    /// Get the rate in Hz as floating point
    #[must_use]
    pub fn as_f32(self) -> f32 {
        self.0 as f32
    }

    /// Sample period in nanoseconds (truncated)
    #[must_use]
    pub const fn period_ns(self) -> u64 {
        1_000_000_000 / self.0 as u64
    }

    /// Time to fill `samples` consecutive samples, in nanoseconds
    #[must_use]
    pub const fn fill_time_ns(self, samples: usize) -> u64 {
        samples as u64 * 1_000_000_000 / self.0 as u64
    }

    /// Width of one transform bin in Hz for an `fft_size`-point transform
    #[must_use]
    pub fn bin_width_hz(self, fft_size: usize) -> f32 {
        self.as_f32() / fft_size as f32
    }
}

impl fmt::Debug for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SampleRate({} Hz)", self.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for SampleRate {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} Hz", self.0);
    }
}

/// Displayable amplitude window in dBm
///
/// Every published level lies in `floor..=ceiling`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayRange {
    floor_dbm: f32,
    ceiling_dbm: f32,
}

impl DisplayRange {
    /// Range shown by the analyzer display
    pub const DEFAULT: Self = Self {
        floor_dbm: AMPLITUDE_MIN_DBM,
        ceiling_dbm: AMPLITUDE_MAX_DBM,
    };

    /// Create a range, returns None unless both bounds are finite and floor < ceiling
    #[must_use]
    pub fn new(floor_dbm: f32, ceiling_dbm: f32) -> Option<Self> {
        if floor_dbm.is_finite() && ceiling_dbm.is_finite() && floor_dbm < ceiling_dbm {
            Some(Self {
                floor_dbm,
                ceiling_dbm,
            })
        } else {
            None
        }
    }

    /// Lower bound in dBm
    #[must_use]
    pub const fn floor(self) -> f32 {
        self.floor_dbm
    }

    /// Upper bound in dBm
    #[must_use]
    pub const fn ceiling(self) -> f32 {
        self.ceiling_dbm
    }

    /// Height of the range in dB
    #[must_use]
    pub fn span_db(self) -> f32 {
        self.ceiling_dbm - self.floor_dbm
    }

    /// Saturate a level into the range; non-finite input maps to the floor
    #[must_use]
    pub fn clamp(self, dbm: f32) -> f32 {
        if !dbm.is_finite() {
            return self.floor_dbm;
        }
        dbm.clamp(self.floor_dbm, self.ceiling_dbm)
    }

    /// Position of a level inside the range, 0.0 at the floor and 1.0 at the ceiling
    #[must_use]
    pub fn normalize(self, dbm: f32) -> f32 {
        (self.clamp(dbm) - self.floor_dbm) / self.span_db()
    }

    /// Bar height in pixels for a display column `height` pixels tall
    #[must_use]
    pub fn bar_height(self, dbm: f32, height: u16) -> u16 {
        let h = (self.normalize(dbm) * f32::from(height)) as u16;
        h.min(height.saturating_sub(1))
    }
}

impl Default for DisplayRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DisplayRange {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{} to {} dBm", self.floor_dbm, self.ceiling_dbm);
    }
}

/// How the sampling buffers are filled
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AcquisitionMode {
    /// Software loop reads the converter at timed deadlines
    Polled,
    /// Peripheral transfer fills buffers and signals completion by interrupt
    #[default]
    Driven,
}

impl AcquisitionMode {
    /// Short display name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Polled => "polled",
            Self::Driven => "driven",
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for AcquisitionMode {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

/// Observable state of the acquisition core
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AcquisitionStatus {
    /// Not sampling
    #[default]
    Idle,
    /// Filling the write buffer, nothing pending
    Sampling,
    /// A completed buffer is waiting for the consumer
    DataReady,
    /// Transfer fault; cleared only by stop followed by start
    Error,
}

#[cfg(feature = "embedded")]
impl defmt::Format for AcquisitionStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "Idle"),
            Self::Sampling => defmt::write!(f, "Sampling"),
            Self::DataReady => defmt::write!(f, "DataReady"),
            Self::Error => defmt::write!(f, "Error"),
        }
    }
}

/// Snapshot of the acquisition performance counters
///
/// `total_samples` wraps at `u32::MAX`, roughly nine hours at 128 kHz.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AcquisitionCounters {
    /// Samples delivered since the last reset
    pub total_samples: u32,
    /// Ready buffers overwritten before the consumer took them
    pub overruns: u32,
    /// Exponential moving average of the per-buffer sample rate
    pub measured_rate_hz: f32,
}

#[cfg(feature = "embedded")]
impl defmt::Format for AcquisitionCounters {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "samples={} overruns={} rate={}Hz",
            self.total_samples,
            self.overruns,
            self.measured_rate_hz
        );
    }
}

/// Frequency axis scaling for display mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FrequencyScale {
    /// Equal Hz per column
    #[default]
    Linear,
    /// Equal ratio per column
    Log,
}

#[cfg(feature = "embedded")]
impl defmt::Format for FrequencyScale {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Linear => defmt::write!(f, "Linear"),
            Self::Log => defmt::write!(f, "Log"),
        }
    }
}
