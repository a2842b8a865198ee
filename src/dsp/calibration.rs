//! Converter Calibration
//!
//! Maps transform magnitudes (in ADC counts) to volts and then to power
//! level in dBm referenced to 1 mW into the reference impedance.

#[cfg(feature = "embedded")]
use micromath::F32Ext;

use crate::error::{ConfigError, ConfigResult};

/// Level reported for voltages too small to take a logarithm of
pub const FLOOR_SENTINEL_DBM: f32 = -200.0;

/// Voltages below this map to [`FLOOR_SENTINEL_DBM`]
pub const MIN_VOLTAGE: f32 = 1e-9;

/// Reference power for 0 dBm, in watts
const ONE_MILLIWATT: f32 = 1e-3;

/// Calibration constants fixed at startup
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    volts_per_count: f32,
    reference_volts: f32,
    impedance_correction: f32,
}

impl Calibration {
    /// Derive constants from converter reference, resolution and 0 dBm impedance
    pub fn new(reference_volts: f32, resolution_bits: u8, reference_impedance_ohms: f32) -> ConfigResult<Self> {
        if !(reference_volts.is_finite() && reference_volts > 0.0) {
            return Err(ConfigError::InvalidReferenceVoltage);
        }
        if resolution_bits == 0 || resolution_bits > 16 {
            return Err(ConfigError::InvalidResolution);
        }
        if !(reference_impedance_ohms.is_finite() && reference_impedance_ohms > 0.0) {
            return Err(ConfigError::InvalidImpedance);
        }
        let full_scale = (1u32 << resolution_bits) as f32;
        Ok(Self {
            volts_per_count: reference_volts / full_scale,
            reference_volts: (ONE_MILLIWATT * reference_impedance_ohms).sqrt(),
            impedance_correction: 1.0,
        })
    }

    /// Enable the source/input divider correction `(Zin + Zs) / Zin`
    pub fn with_impedance_correction(self, input_ohms: f32, source_ohms: f32) -> ConfigResult<Self> {
        if !(input_ohms.is_finite() && input_ohms > 0.0) {
            return Err(ConfigError::InvalidImpedance);
        }
        if !(source_ohms.is_finite() && source_ohms >= 0.0) {
            return Err(ConfigError::InvalidImpedance);
        }
        Ok(Self {
            impedance_correction: (input_ohms + source_ohms) / input_ohms,
            ..self
        })
    }

    /// Volts represented by one ADC count
    #[must_use]
    pub const fn volts_per_count(&self) -> f32 {
        self.volts_per_count
    }

    /// Voltage that reads as 0 dBm
    #[must_use]
    pub const fn reference_volts(&self) -> f32 {
        self.reference_volts
    }

    /// Multiplier applied for the impedance divider (1.0 when disabled)
    #[must_use]
    pub const fn impedance_correction(&self) -> f32 {
        self.impedance_correction
    }

    /// Convert an amplitude in counts to volts, including impedance correction
    #[must_use]
    pub fn counts_to_volts(&self, counts: f32) -> f32 {
        counts * self.volts_per_count * self.impedance_correction
    }

    /// Convert volts to dBm; tiny or non-finite input gives the floor sentinel
    #[must_use]
    pub fn volts_to_dbm(&self, volts: f32) -> f32 {
        volts_to_dbm(volts, self.reference_volts)
    }

    /// Convert an amplitude in counts straight to dBm
    #[must_use]
    pub fn counts_to_dbm(&self, counts: f32) -> f32 {
        self.volts_to_dbm(self.counts_to_volts(counts))
    }

    /// Voltage that reads as `dbm`
    #[must_use]
    pub fn dbm_to_volts(&self, dbm: f32) -> f32 {
        self.reference_volts * 10.0f32.powf(dbm / 20.0)
    }
}

/// `20 * log10(volts / reference)`, or [`FLOOR_SENTINEL_DBM`] below [`MIN_VOLTAGE`]
#[must_use]
pub fn volts_to_dbm(volts: f32, reference_volts: f32) -> f32 {
    if !volts.is_finite() || volts < MIN_VOLTAGE {
        return FLOOR_SENTINEL_DBM;
    }
    20.0 * (volts / reference_volts).log10()
}
