//! System configuration and hardware constants
//!
//! This module defines compile-time constants for the analyzer: frame and
//! sample rates, transform size, converter calibration, display range and
//! peripheral assignments. `AnalyzerConfig` collects them into one value
//! that is validated once at startup.

use core::time::Duration;

use crate::dsp::calibration::Calibration;
use crate::dsp::window::WindowKind;
use crate::error::{ConfigError, ConfigResult};
use crate::types::{AcquisitionMode, DisplayRange, FrequencyScale, SampleRate};

/// System clock frequency (STM32G474 @ 170MHz)
pub const SYSTEM_CLOCK_HZ: u32 = 170_000_000;

/// Kernel clock of the timer that paces ADC conversions
pub const SAMPLE_TIMER_CLOCK_HZ: u32 = SYSTEM_CLOCK_HZ;

/// Display frame rate
pub const TARGET_FPS: u32 = 30;

/// ADC sampling rate (128 kHz)
pub const SAMPLE_RATE_HZ: u32 = 128_000;

/// Transform size in samples
pub const FFT_SIZE: usize = 1024;

/// Number of published spectrum bins (DC up to just below Nyquist)
pub const SPECTRUM_BINS: usize = FFT_SIZE / 2;

/// ADC resolution in bits
pub const ADC_RESOLUTION_BITS: u8 = 12;

/// ADC reference voltage
pub const ADC_REFERENCE_VOLTS: f32 = 3.3;

/// Impedance defining the 0 dBm reference (1 mW into 75 ohm)
pub const DBM_REFERENCE_IMPEDANCE_OHMS: f32 = 75.0;

/// ADC input impedance seen by the source
pub const ADC_INPUT_IMPEDANCE_OHMS: f32 = 100_000.0;

/// Output impedance of the measured source
pub const SOURCE_IMPEDANCE_OHMS: f32 = 75.0;

/// Apply the source/input divider correction to measured voltages
pub const IMPEDANCE_CORRECTION_ENABLED: bool = false;

/// Bottom of the displayed amplitude range
pub const AMPLITUDE_MIN_DBM: f32 = -100.0;

/// Top of the displayed amplitude range
pub const AMPLITUDE_MAX_DBM: f32 = 20.0;

/// Lowest frequency of the band of interest
pub const FREQUENCY_RANGE_MIN_HZ: u32 = 1_000;

/// Highest frequency of the band of interest
pub const FREQUENCY_RANGE_MAX_HZ: u32 = 50_000;

/// Graticule marker frequencies across the band of interest
pub const FREQUENCY_MARKERS_HZ: [u32; 11] = [
    1_000, 5_000, 10_000, 15_000, 20_000, 25_000, 30_000, 35_000, 40_000, 45_000, 50_000,
];

/// Frequency axis scaling
pub const FREQUENCY_SCALE: FrequencyScale = FrequencyScale::Linear;

/// Window applied before the transform
pub const DEFAULT_WINDOW: WindowKind = WindowKind::Rectangular;

/// Kaiser-Bessel window shape parameter
pub const KAISER_BETA: f32 = 8.5;

/// Acquisition mode selected at startup
pub const ACQUISITION_MODE: AcquisitionMode = AcquisitionMode::Driven;

/// Frames between status reports
pub const STATUS_REPORT_INTERVAL: u32 = 100;

/// Frames between overrun summaries
pub const OVERRUN_REPORT_INTERVAL: u32 = 1000;

/// Weight of the newest measurement in the sample-rate moving average
pub const RATE_EMA_WEIGHT: f32 = 0.1;

/// Number of strongest peaks kept by the peak detector
pub const MAX_PEAKS: usize = 4;

/// Pin assignments
pub mod pins {
    //! Signal input matching the schematic

    /// ADC1 regular channel of the analog input (PA0 = ADC1_IN1)
    pub const SIGNAL_ADC_CHANNEL: u8 = 1;
}

/// DMA channel assignments
pub mod dma {
    //! DMA channel assignments for zero-copy transfers

    /// DMA1 channel carrying ADC1 conversions (1-based, as in the reference manual)
    pub const ADC1: u8 = 1;

    /// DMAMUX request line for ADC1
    pub const ADC1_REQUEST: u8 = 5;
}

/// Timer divider producing `rate_hz` from the sample timer clock
///
/// Rounded to the nearest integer. Returns None when the divider would be
/// below 2 or above the 32-bit timer range.
#[must_use]
pub const fn sample_clock_divider(rate_hz: u32) -> Option<u32> {
    if rate_hz == 0 {
        return None;
    }
    let divider = (SAMPLE_TIMER_CLOCK_HZ + rate_hz / 2) / rate_hz;
    if divider < 2 {
        None
    } else {
        Some(divider)
    }
}

/// Sample rate actually produced by the timer for a requested rate
#[must_use]
pub const fn achievable_sample_rate(rate_hz: u32) -> Option<u32> {
    match sample_clock_divider(rate_hz) {
        Some(divider) => Some(SAMPLE_TIMER_CLOCK_HZ / divider),
        None => None,
    }
}

/// Complete analyzer configuration
///
/// Built from the constants above; fixed after startup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyzerConfig {
    /// Acquisition mode
    pub mode: AcquisitionMode,
    /// Configured sampling rate in Hz
    pub sample_rate_hz: u32,
    /// Display frame rate
    pub frame_rate_fps: u32,
    /// Window shape
    pub window: WindowKind,
    /// ADC resolution in bits
    pub adc_resolution_bits: u8,
    /// ADC reference voltage
    pub adc_reference_volts: f32,
    /// 0 dBm reference impedance
    pub reference_impedance_ohms: f32,
    /// ADC input impedance
    pub input_impedance_ohms: f32,
    /// Source output impedance
    pub source_impedance_ohms: f32,
    /// Apply the impedance divider correction
    pub impedance_correction: bool,
    /// Published amplitude range
    pub display: DisplayRange,
    /// Frequency axis scaling
    pub frequency_scale: FrequencyScale,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: ACQUISITION_MODE,
            sample_rate_hz: SAMPLE_RATE_HZ,
            frame_rate_fps: TARGET_FPS,
            window: DEFAULT_WINDOW,
            adc_resolution_bits: ADC_RESOLUTION_BITS,
            adc_reference_volts: ADC_REFERENCE_VOLTS,
            reference_impedance_ohms: DBM_REFERENCE_IMPEDANCE_OHMS,
            input_impedance_ohms: ADC_INPUT_IMPEDANCE_OHMS,
            source_impedance_ohms: SOURCE_IMPEDANCE_OHMS,
            impedance_correction: IMPEDANCE_CORRECTION_ENABLED,
            display: DisplayRange::DEFAULT,
            frequency_scale: FREQUENCY_SCALE,
        }
    }
}

impl AnalyzerConfig {
    /// Check every field; the first problem found is returned
    pub fn validate(&self) -> ConfigResult<()> {
        self.sample_rate()?;
        self.frame_period()?;
        self.calibration()?;
        Ok(())
    }

    /// Replace the published amplitude range
    pub fn with_display_range(self, floor_dbm: f32, ceiling_dbm: f32) -> ConfigResult<Self> {
        let display =
            DisplayRange::new(floor_dbm, ceiling_dbm).ok_or(ConfigError::InvalidDisplayRange)?;
        Ok(Self { display, ..self })
    }

    /// Validated sampling rate
    pub fn sample_rate(&self) -> ConfigResult<SampleRate> {
        if sample_clock_divider(self.sample_rate_hz).is_none() {
            return Err(ConfigError::InvalidSampleRate);
        }
        SampleRate::from_hz(self.sample_rate_hz).ok_or(ConfigError::InvalidSampleRate)
    }

    /// Fixed frame period derived from the frame rate
    pub fn frame_period(&self) -> ConfigResult<Duration> {
        if self.frame_rate_fps == 0 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(Duration::from_nanos(
            1_000_000_000 / u64::from(self.frame_rate_fps),
        ))
    }

    /// Calibration constants derived from the converter and impedance settings
    pub fn calibration(&self) -> ConfigResult<Calibration> {
        let cal = Calibration::new(
            self.adc_reference_volts,
            self.adc_resolution_bits,
            self.reference_impedance_ohms,
        )?;
        if self.impedance_correction {
            cal.with_impedance_correction(self.input_impedance_ohms, self.source_impedance_ohms)
        } else {
            Ok(cal)
        }
    }

    /// Whether a polled fill of `samples` fits inside one frame period
    ///
    /// Returns `Err(FrameBudgetTooShort)` when it does not. Polled mode still
    /// runs in that case, just below the target frame rate.
    pub fn polled_frame_budget_ok(&self, samples: usize) -> ConfigResult<()> {
        let rate = self.sample_rate()?;
        let period = self.frame_period()?;
        if u128::from(rate.fill_time_ns(samples)) > period.as_nanos() {
            Err(ConfigError::FrameBudgetTooShort)
        } else {
            Ok(())
        }
    }
}
