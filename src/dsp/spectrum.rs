//! Spectrum Frames and Analysis
//!
//! The published spectrum snapshot, bin/frequency mapping, peak detection
//! over the band of interest, and frequency-axis mapping for display
//! collaborators.

#[cfg(feature = "embedded")]
use micromath::F32Ext;

use heapless::Vec;

use super::calibration::Calibration;
use crate::config::{FFT_SIZE, SPECTRUM_BINS};
use crate::types::{DisplayRange, FrequencyScale};

/// Centre frequency of bin `bin` in Hz
#[must_use]
pub fn bin_to_frequency(bin: usize, sample_rate_hz: f32) -> f32 {
    bin as f32 * sample_rate_hz / FFT_SIZE as f32
}

/// Nearest bin to `frequency_hz`, or None above the last published bin
#[must_use]
pub fn frequency_to_bin(frequency_hz: f32, sample_rate_hz: f32) -> Option<usize> {
    if frequency_hz.is_nan() || frequency_hz < 0.0 || sample_rate_hz <= 0.0 {
        return None;
    }
    let bin = (frequency_hz * FFT_SIZE as f32 / sample_rate_hz + 0.5) as usize;
    (bin < SPECTRUM_BINS).then_some(bin)
}

/// Calibrated spectrum snapshot
///
/// One slot, overwritten every frame. Levels are in dBm and always lie
/// inside the display range.
#[derive(Clone)]
pub struct SpectrumFrame {
    levels: [f32; SPECTRUM_BINS],
    sample_rate_hz: f32,
    sequence: u32,
}

impl SpectrumFrame {
    /// Empty frame at the given floor
    #[must_use]
    pub const fn new(floor_dbm: f32) -> Self {
        Self {
            levels: [floor_dbm; SPECTRUM_BINS],
            sample_rate_hz: 0.0,
            sequence: 0,
        }
    }

    /// Overwrite the frame from amplitudes in counts
    pub fn fill(
        &mut self,
        amplitudes: &[f32; SPECTRUM_BINS],
        calibration: &Calibration,
        range: DisplayRange,
        sample_rate_hz: f32,
    ) {
        for (level, &amp) in self.levels.iter_mut().zip(amplitudes) {
            *level = range.clamp(calibration.counts_to_dbm(amp));
        }
        self.sample_rate_hz = sample_rate_hz;
        self.sequence = self.sequence.wrapping_add(1);
    }

    /// Levels in dBm, bin 0 first
    #[must_use]
    pub fn levels(&self) -> &[f32; SPECTRUM_BINS] {
        &self.levels
    }

    /// Sample rate the frame was computed at
    #[must_use]
    pub const fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }

    /// Number of fills since creation (wrapping)
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Frequency resolution in Hz
    #[must_use]
    pub fn bin_width_hz(&self) -> f32 {
        self.sample_rate_hz / FFT_SIZE as f32
    }

    /// Centre frequency of a bin in Hz
    #[must_use]
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin_to_frequency(bin, self.sample_rate_hz)
    }

    /// Level of the bin nearest `frequency_hz`
    #[must_use]
    pub fn level_at(&self, frequency_hz: f32) -> Option<f32> {
        frequency_to_bin(frequency_hz, self.sample_rate_hz).map(|bin| self.levels[bin])
    }

    /// Inclusive bin range covering `min_hz..=max_hz`, clipped to the frame
    #[must_use]
    pub fn band_bins(&self, min_hz: f32, max_hz: f32) -> core::ops::RangeInclusive<usize> {
        let first = frequency_to_bin(min_hz, self.sample_rate_hz).unwrap_or(SPECTRUM_BINS);
        let last = frequency_to_bin(max_hz, self.sample_rate_hz).unwrap_or(SPECTRUM_BINS - 1);
        first..=last
    }
}

impl core::fmt::Debug for SpectrumFrame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpectrumFrame")
            .field("sample_rate_hz", &self.sample_rate_hz)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

/// A spectral peak
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Peak {
    /// Bin index
    pub bin: usize,
    /// Bin centre frequency in Hz
    pub frequency_hz: f32,
    /// Level in dBm
    pub level_dbm: f32,
}

#[cfg(feature = "embedded")]
impl defmt::Format for Peak {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}Hz @ {}dBm", self.frequency_hz, self.level_dbm);
    }
}

/// Peak detector for spectrum display
#[derive(Clone, Copy, Debug, Default)]
pub struct PeakDetector {
    /// Strongest bin in the band
    pub peak: Peak,
    /// Mean level across the band in dBm
    pub noise_floor: f32,
}

impl PeakDetector {
    /// Find the strongest bin within `min_hz..=max_hz`
    ///
    /// Returns the default (bin 0, zero level) when the band holds no bins.
    #[must_use]
    pub fn find_peak(frame: &SpectrumFrame, min_hz: f32, max_hz: f32) -> Self {
        let band = frame.band_bins(min_hz, max_hz);
        if band.is_empty() {
            return Self::default();
        }

        let mut peak_bin = *band.start();
        let mut peak_level = f32::NEG_INFINITY;
        let mut sum = 0.0f32;
        let mut count = 0u32;

        for bin in band {
            let level = frame.levels[bin];
            if level > peak_level {
                peak_level = level;
                peak_bin = bin;
            }
            sum += level;
            count += 1;
        }

        Self {
            peak: Peak {
                bin: peak_bin,
                frequency_hz: frame.bin_frequency(peak_bin),
                level_dbm: peak_level,
            },
            noise_floor: sum / count as f32,
        }
    }

    /// Up to `K` strongest local maxima in the band, strongest first
    ///
    /// A local maximum is strictly above its left neighbour and not below its
    /// right neighbour; levels at or below `threshold_dbm` are ignored.
    #[must_use]
    pub fn top_peaks<const K: usize>(
        frame: &SpectrumFrame,
        min_hz: f32,
        max_hz: f32,
        threshold_dbm: f32,
    ) -> Vec<Peak, K> {
        let mut peaks: Vec<Peak, K> = Vec::new();
        let band = frame.band_bins(min_hz, max_hz);
        let levels = &frame.levels;

        for bin in band {
            let level = levels[bin];
            if level <= threshold_dbm {
                continue;
            }
            let left = if bin > 0 { levels[bin - 1] } else { f32::NEG_INFINITY };
            let right = levels.get(bin + 1).copied().unwrap_or(f32::NEG_INFINITY);
            if level <= left || level < right {
                continue;
            }

            let candidate = Peak {
                bin,
                frequency_hz: frame.bin_frequency(bin),
                level_dbm: level,
            };
            let pos = peaks
                .iter()
                .position(|p| p.level_dbm < level)
                .unwrap_or(peaks.len());
            if pos >= K {
                continue;
            }
            if peaks.is_full() {
                peaks.pop();
            }
            // Capacity was just ensured
            let _ = peaks.insert(pos, candidate);
        }
        peaks
    }
}

/// Maps frequencies in a band to normalized display positions
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrequencyAxis {
    min_hz: f32,
    max_hz: f32,
    scale: FrequencyScale,
}

impl FrequencyAxis {
    /// Create an axis, returns None unless `0 < min_hz < max_hz`
    #[must_use]
    pub fn new(min_hz: f32, max_hz: f32, scale: FrequencyScale) -> Option<Self> {
        if min_hz > 0.0 && min_hz < max_hz && max_hz.is_finite() {
            Some(Self {
                min_hz,
                max_hz,
                scale,
            })
        } else {
            None
        }
    }

    /// Axis scaling
    #[must_use]
    pub const fn scale(&self) -> FrequencyScale {
        self.scale
    }

    /// Position of `frequency_hz` in 0.0..=1.0, or None outside the band
    #[must_use]
    pub fn position(&self, frequency_hz: f32) -> Option<f32> {
        if frequency_hz.is_nan() || frequency_hz < self.min_hz || frequency_hz > self.max_hz {
            return None;
        }
        let pos = match self.scale {
            FrequencyScale::Linear => (frequency_hz - self.min_hz) / (self.max_hz - self.min_hz),
            FrequencyScale::Log => {
                let lo = self.min_hz.log10();
                (frequency_hz.log10() - lo) / (self.max_hz.log10() - lo)
            }
        };
        Some(pos.clamp(0.0, 1.0))
    }

    /// Frequency at position `pos` (clamped to 0.0..=1.0)
    #[must_use]
    pub fn frequency_at(&self, pos: f32) -> f32 {
        let pos = pos.clamp(0.0, 1.0);
        match self.scale {
            FrequencyScale::Linear => self.min_hz + pos * (self.max_hz - self.min_hz),
            FrequencyScale::Log => {
                let lo = self.min_hz.log10();
                let hi = self.max_hz.log10();
                10.0f32.powf(lo + pos * (hi - lo))
            }
        }
    }

    /// Display column for `frequency_hz` on a plot `width` pixels wide
    #[must_use]
    pub fn column(&self, frequency_hz: f32, width: u16) -> Option<u16> {
        let pos = self.position(frequency_hz)?;
        let col = (pos * f32::from(width.saturating_sub(1)) + 0.5) as u16;
        Some(col)
    }
}
