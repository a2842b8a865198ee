//! Spectrum Analyzer Firmware Library
//!
//! This library provides the core of an STM32G474-based real-time audio-band
//! spectrum analyzer. An analog input is sampled at a fixed rate into a pair
//! of buffers, each completed buffer is windowed and transformed, and the
//! result is published as calibrated dBm levels at a fixed frame rate.
//!
//! # Architecture
//!
//! The firmware is organized in layers:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PIPELINE COORDINATOR                      │
//! │  WaitForData → Process → Publish → Pace                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                      DSP LAYER                               │
//! │  Window  │  FFT + DC removal  │  Calibration  │  Peaks       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   ACQUISITION CORE                           │
//! │  Double buffer  │  Atomic handoff  │  Polled / Driven        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 HAL (embedded only)                          │
//! │  ADC  │  ADC+DMA engine  │  embassy clock                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Fixed allocation**: buffers and tables are sized at compile time
//! - **Type-driven design**: newtypes enforce invariants at construction
//! - **No unsafe in application code**: the handoff is built from atomics
//! - **One interface, two producers**: the pipeline never branches on mode
//! - **Explicit error handling**: all fallible operations return `Result`

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

// Must come first so the logging macros are visible to every module
#[macro_use]
mod fmt;

// Re-export dependencies needed by applications (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// STM32G474 sample sources, transfer engine and clock.
#[cfg(feature = "embedded")]
pub mod hal;

/// Sample Acquisition
///
/// Double buffer, handoff protocol and the two producer strategies.
pub mod acquisition;

/// Digital Signal Processing
///
/// Windows, transform, calibration and spectrum analysis.
pub mod dsp;

/// Pipeline Coordinator
///
/// The acquisition-to-display frame loop.
pub mod pipeline;

/// Time abstractions and deadline helpers
pub mod timing;

/// Error types
pub mod error;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Host simulation of converter, transfer engine and clock
#[cfg(feature = "std")]
pub mod sim;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::acquisition::{
        AcquisitionCore, DrivenSampler, DrivenShared, PolledSampler, ReadyBuffer, SampleSource,
        Sampler, TransferEngine,
    };
    pub use crate::config::*;
    pub use crate::dsp::spectrum::{FrequencyAxis, PeakDetector, SpectrumFrame};
    pub use crate::dsp::window::WindowKind;
    pub use crate::error::{ConfigError, ProcessError};
    pub use crate::pipeline::{IterationOutcome, Pipeline, SpectrumSink};
    pub use crate::timing::{Clock, Timestamp};
    pub use crate::types::*;
}
