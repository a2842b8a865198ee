//! Error types
//!
//! Configuration errors are fatal at init. Processing errors are counted by
//! the pipeline and never stop it.

use core::fmt;

/// Result alias for configuration and init operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result alias for per-frame processing
pub type ProcessResult<T> = Result<T, ProcessError>;

/// Fatal configuration or resource-acquisition failure
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The sampling transfer channel could not be claimed
    ChannelUnavailable,
    /// Sample rate is zero or not reachable by the sample clock
    InvalidSampleRate,
    /// Frame rate is zero
    InvalidFrameRate,
    /// ADC resolution outside 1..=16 bits
    InvalidResolution,
    /// Reference voltage not finite and positive
    InvalidReferenceVoltage,
    /// An impedance is not finite and positive
    InvalidImpedance,
    /// Display floor is not below the ceiling
    InvalidDisplayRange,
    /// Polled acquisition cannot fill a buffer inside one frame period
    FrameBudgetTooShort,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChannelUnavailable => write!(f, "sampling transfer channel unavailable"),
            Self::InvalidSampleRate => write!(f, "invalid sample rate"),
            Self::InvalidFrameRate => write!(f, "invalid frame rate"),
            Self::InvalidResolution => write!(f, "invalid ADC resolution"),
            Self::InvalidReferenceVoltage => write!(f, "invalid ADC reference voltage"),
            Self::InvalidImpedance => write!(f, "invalid impedance"),
            Self::InvalidDisplayRange => write!(f, "display floor must be below ceiling"),
            Self::FrameBudgetTooShort => write!(f, "buffer fill time exceeds frame period"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ConfigError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::ChannelUnavailable => defmt::write!(f, "ChannelUnavailable"),
            Self::InvalidSampleRate => defmt::write!(f, "InvalidSampleRate"),
            Self::InvalidFrameRate => defmt::write!(f, "InvalidFrameRate"),
            Self::InvalidResolution => defmt::write!(f, "InvalidResolution"),
            Self::InvalidReferenceVoltage => defmt::write!(f, "InvalidReferenceVoltage"),
            Self::InvalidImpedance => defmt::write!(f, "InvalidImpedance"),
            Self::InvalidDisplayRange => defmt::write!(f, "InvalidDisplayRange"),
            Self::FrameBudgetTooShort => defmt::write!(f, "FrameBudgetTooShort"),
        }
    }
}

/// Failure of a single Process step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessError {
    /// Readiness was signalled but no buffer could be taken
    NoData,
    /// Buffer length does not match the transform size
    ShortBuffer {
        /// Samples required
        expected: usize,
        /// Samples provided
        actual: usize,
    },
    /// The producer recycled the buffer while it was being read
    BufferOverwritten,
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoData => write!(f, "no ready buffer"),
            Self::ShortBuffer { expected, actual } => {
                write!(f, "buffer has {actual} samples, expected {expected}")
            }
            Self::BufferOverwritten => write!(f, "buffer overwritten during processing"),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for ProcessError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::NoData => defmt::write!(f, "NoData"),
            Self::ShortBuffer { expected, actual } => {
                defmt::write!(f, "ShortBuffer({}/{})", actual, expected);
            }
            Self::BufferOverwritten => defmt::write!(f, "BufferOverwritten"),
        }
    }
}
