//! Digital Signal Processing
//!
//! Provides the analysis chain for the spectrum analyzer:
//! - Window functions and coherent-gain correction
//! - Windowed real FFT with DC removal
//! - Count/volt/dBm calibration
//! - Spectrum frames, peak detection and frequency-axis mapping

pub mod calibration;
pub mod spectrum;
pub mod transform;
pub mod window;
