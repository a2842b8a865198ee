//! Transform Engine
//!
//! Turns one buffer of raw ADC samples into single-sided peak amplitudes
//! (in ADC counts) for bins `0..N/2`. The buffer mean is removed before
//! windowing, so bin 0 reports that mean directly rather than the
//! (near-zero) residual left in the transform.

#[cfg(feature = "embedded")]
use micromath::F32Ext;
use microfft::real::rfft_1024;

use super::window::{WindowKind, WindowTable};
use crate::config::{FFT_SIZE, SPECTRUM_BINS};
use crate::error::{ProcessError, ProcessResult};

const _: () = assert!(FFT_SIZE.is_power_of_two(), "transform size must be a power of two");
const _: () = assert!(FFT_SIZE == 1024, "transform is bound to microfft's 1024-point kernel");

/// Windowed real FFT with a precomputed window table
pub struct SpectrumTransform {
    window: WindowTable<FFT_SIZE>,
    scratch: [f32; FFT_SIZE],
}

impl SpectrumTransform {
    /// Precompute the window table for `kind`
    #[must_use]
    pub fn new(kind: WindowKind) -> Self {
        Self {
            window: WindowTable::new(kind),
            scratch: [0.0; FFT_SIZE],
        }
    }

    /// Active window table
    #[must_use]
    pub fn window(&self) -> &WindowTable<FFT_SIZE> {
        &self.window
    }

    /// Compute peak amplitudes in counts for one buffer
    ///
    /// `samples` must yield exactly `FFT_SIZE` values. Bin 0 receives the
    /// buffer mean; every other bin is `|X[k]| / (N/2)` scaled by the window
    /// amplitude correction.
    pub fn amplitudes<I>(&mut self, samples: I, out: &mut [f32; SPECTRUM_BINS]) -> ProcessResult<()>
    where
        I: IntoIterator<Item = u16>,
    {
        // Pass 1: copy and accumulate
        let mut count = 0usize;
        let mut sum = 0u32;
        for sample in samples {
            if count < FFT_SIZE {
                self.scratch[count] = f32::from(sample);
                sum += u32::from(sample);
            }
            count += 1;
        }
        if count != FFT_SIZE {
            return Err(ProcessError::ShortBuffer {
                expected: FFT_SIZE,
                actual: count,
            });
        }
        let mean = sum as f32 / FFT_SIZE as f32;

        // Pass 2: remove DC and window
        for (x, w) in self.scratch.iter_mut().zip(self.window.coefficients()) {
            *x = (*x - mean) * w;
        }

        // bins[0] packs DC (re) and Nyquist (im); both are replaced below
        let bins = rfft_1024(&mut self.scratch);
        let scale = self.window.amplitude_correction() * 2.0 / FFT_SIZE as f32;

        out[0] = mean;
        for (amp, bin) in out.iter_mut().zip(bins.iter()).skip(1) {
            *amp = bin.norm_sqr().sqrt() * scale;
        }
        Ok(())
    }
}

impl core::fmt::Debug for SpectrumTransform {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SpectrumTransform")
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}
