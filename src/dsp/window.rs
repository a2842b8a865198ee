//! Window Functions
//!
//! Seven window shapes for spectral leakage control. Each shape carries its
//! coherent gain (mean coefficient value) so that a windowed tone can be
//! rescaled to its true amplitude.
//!
//! Cosine-sum windows are generated in their periodic (DFT-even) form, for
//! which the mean over one transform length equals the `a0` coefficient
//! exactly.

use core::f32::consts::PI;

#[cfg(feature = "embedded")]
use micromath::F32Ext;

use crate::config::KAISER_BETA;

/// Window shape
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WindowKind {
    /// No taper
    #[default]
    Rectangular,
    /// Raised cosine on a pedestal
    Hamming,
    /// Raised cosine
    Hann,
    /// Three-term Blackman
    Blackman,
    /// Four-term Blackman-Harris (-92 dB sidelobes)
    BlackmanHarris,
    /// Kaiser-Bessel, beta = 8.5
    KaiserBessel,
    /// Five-term flat-top for amplitude accuracy
    FlatTop,
}

impl WindowKind {
    /// All shapes in selector order
    pub const ALL: [Self; 7] = [
        Self::Rectangular,
        Self::Hamming,
        Self::Hann,
        Self::Blackman,
        Self::BlackmanHarris,
        Self::KaiserBessel,
        Self::FlatTop,
    ];

    /// Look up a shape by its numeric selector (0..=6)
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Rectangular),
            1 => Some(Self::Hamming),
            2 => Some(Self::Hann),
            3 => Some(Self::Blackman),
            4 => Some(Self::BlackmanHarris),
            5 => Some(Self::KaiserBessel),
            6 => Some(Self::FlatTop),
            _ => None,
        }
    }

    /// Numeric selector of this shape
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Rectangular => 0,
            Self::Hamming => 1,
            Self::Hann => 2,
            Self::Blackman => 3,
            Self::BlackmanHarris => 4,
            Self::KaiserBessel => 5,
            Self::FlatTop => 6,
        }
    }

    /// Human-readable name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rectangular => "Rectangle",
            Self::Hamming => "Hamming",
            Self::Hann => "Hann",
            Self::Blackman => "Blackman",
            Self::BlackmanHarris => "Blackman-Harris",
            Self::KaiserBessel => "Kaiser-Bessel",
            Self::FlatTop => "Flat-Top",
        }
    }

    /// Coherent gain: the mean window value, i.e. the attenuation of a
    /// bin-centred tone
    ///
    /// The Kaiser-Bessel value is the continuous mean of
    /// `I0(8.5 * sqrt(1 - x^2)) / I0(8.5)` over `x` in -1..1.
    #[must_use]
    pub const fn coherent_gain(self) -> f32 {
        match self {
            Self::Rectangular => 1.0,
            Self::Hamming => 0.54,
            Self::Hann => 0.5,
            Self::Blackman => 0.42,
            Self::BlackmanHarris => 0.358_75,
            Self::KaiserBessel => 0.422_77,
            Self::FlatTop => 0.215_578_95,
        }
    }

    /// Factor restoring a windowed tone to its true amplitude (1 / coherent gain)
    #[must_use]
    pub fn amplitude_correction(self) -> f32 {
        1.0 / self.coherent_gain()
    }

    /// Amplitude correction expressed in dB
    #[must_use]
    pub fn amplitude_correction_db(self) -> f32 {
        20.0 * self.amplitude_correction().log10()
    }

    /// Cosine-sum coefficients `a0..a4`, or None for Kaiser-Bessel
    const fn cosine_terms(self) -> Option<[f32; 5]> {
        match self {
            Self::Rectangular => Some([1.0, 0.0, 0.0, 0.0, 0.0]),
            Self::Hamming => Some([0.54, 0.46, 0.0, 0.0, 0.0]),
            Self::Hann => Some([0.5, 0.5, 0.0, 0.0, 0.0]),
            Self::Blackman => Some([0.42, 0.5, 0.08, 0.0, 0.0]),
            Self::BlackmanHarris => Some([0.358_75, 0.488_29, 0.141_28, 0.011_68, 0.0]),
            Self::FlatTop => Some([
                0.215_578_95,
                0.416_631_58,
                0.277_263_16,
                0.083_578_95,
                0.006_947_368,
            ]),
            Self::KaiserBessel => None,
        }
    }

    /// Window value at sample `n` of a `len`-point window
    #[must_use]
    pub fn coefficient(self, n: usize, len: usize) -> f32 {
        if len < 2 {
            return 1.0;
        }
        match self.cosine_terms() {
            Some(a) => {
                let phase = 2.0 * PI * n as f32 / len as f32;
                a[0] - a[1] * phase.cos() + a[2] * (2.0 * phase).cos()
                    - a[3] * (3.0 * phase).cos()
                    + a[4] * (4.0 * phase).cos()
            }
            None => kaiser(n, len, KAISER_BETA),
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for WindowKind {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}", self.name());
    }
}

/// Zeroth-order modified Bessel function of the first kind
///
/// Power series, summed until the next term no longer changes the result.
#[must_use]
pub fn bessel_i0(x: f32) -> f32 {
    let half = x / 2.0;
    let mut sum = 1.0f32;
    let mut term = 1.0f32;
    for k in 1..64 {
        let ratio = half / k as f32;
        term *= ratio * ratio;
        sum += term;
        if term < sum * 1e-9 {
            break;
        }
    }
    sum
}

fn kaiser(n: usize, len: usize, beta: f32) -> f32 {
    let alpha = (len - 1) as f32 / 2.0;
    let r = (n as f32 - alpha) / alpha;
    let arg = (1.0 - r * r).max(0.0);
    bessel_i0(beta * arg.sqrt()) / bessel_i0(beta)
}

/// Precomputed window coefficients for an `N`-point transform
///
/// Built once at init; never modified afterwards.
#[derive(Clone)]
pub struct WindowTable<const N: usize> {
    kind: WindowKind,
    coeffs: [f32; N],
}

impl<const N: usize> WindowTable<N> {
    /// Build the table for a window shape
    #[must_use]
    pub fn new(kind: WindowKind) -> Self {
        let mut coeffs = [0.0f32; N];
        for (n, c) in coeffs.iter_mut().enumerate() {
            *c = kind.coefficient(n, N);
        }
        Self { kind, coeffs }
    }

    /// Window shape of this table
    #[must_use]
    pub const fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Coefficient slice
    #[must_use]
    pub fn coefficients(&self) -> &[f32; N] {
        &self.coeffs
    }

    /// Amplitude correction for the table's shape
    #[must_use]
    pub fn amplitude_correction(&self) -> f32 {
        self.kind.amplitude_correction()
    }

    /// Mean coefficient value, the measured coherent gain of this table
    #[must_use]
    pub fn mean(&self) -> f32 {
        self.coeffs.iter().sum::<f32>() / N as f32
    }
}

impl<const N: usize> core::fmt::Debug for WindowTable<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "WindowTable({:?}, {} points)", self.kind, N)
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_bessel_i0_known_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-6);
        // I0(1) = 1.2660659
        assert!((bessel_i0(1.0) - 1.266_066).abs() < 1e-4);
    }

    #[test]
    fn test_kaiser_peak_at_centre() {
        let len = 65;
        let centre = WindowKind::KaiserBessel.coefficient(32, len);
        assert!((centre - 1.0).abs() < 1e-5);
        assert!(WindowKind::KaiserBessel.coefficient(0, len) < 0.01);
    }

    #[test]
    fn test_selector_round_trip() {
        for kind in WindowKind::ALL {
            assert_eq!(WindowKind::from_index(kind.index()), Some(kind));
        }
        assert_eq!(WindowKind::from_index(7), None);
    }
}
