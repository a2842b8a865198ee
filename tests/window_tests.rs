//! Window Function Tests
//!
//! Coherent gain, amplitude correction and coefficient tables.
//! Run with: cargo test --no-default-features --features std --test window_tests

use specan_firmware::config::FFT_SIZE;
use specan_firmware::dsp::window::{bessel_i0, WindowKind, WindowTable};

// =============================================================================
// Gain and Correction Tests
// =============================================================================

#[test]
fn test_correction_restores_unity() {
    for kind in WindowKind::ALL {
        let product = kind.coherent_gain() * kind.amplitude_correction();
        assert!((product - 1.0).abs() < 1e-6, "{}: {}", kind.name(), product);
    }
}

#[test]
fn test_rectangular_is_identity() {
    let kind = WindowKind::Rectangular;
    assert_eq!(kind.coherent_gain(), 1.0);
    assert_eq!(kind.amplitude_correction(), 1.0);
    assert_eq!(kind.amplitude_correction_db(), 0.0);
}

#[test]
fn test_correction_db_values() {
    // Hann halves a bin-centred tone: +6.02 dB
    assert!((WindowKind::Hann.amplitude_correction_db() - 6.0206).abs() < 1e-3);
    // Flat-top: +13.33 dB
    assert!((WindowKind::FlatTop.amplitude_correction_db() - 13.328).abs() < 1e-2);
}

#[test]
fn test_table_mean_matches_coherent_gain() {
    for kind in WindowKind::ALL {
        let table = WindowTable::<FFT_SIZE>::new(kind);
        let mean = table.mean();
        assert!(
            (mean - kind.coherent_gain()).abs() < 2e-3,
            "{}: mean {} vs gain {}",
            kind.name(),
            mean,
            kind.coherent_gain()
        );
    }
}

#[test]
fn test_tapered_windows_reduce_gain() {
    for kind in WindowKind::ALL.iter().skip(1) {
        assert!(kind.coherent_gain() < 1.0, "{}", kind.name());
        assert!(kind.amplitude_correction() > 1.0, "{}", kind.name());
    }
}

// =============================================================================
// Coefficient Tests
// =============================================================================

#[test]
fn test_hann_shape() {
    let table = WindowTable::<FFT_SIZE>::new(WindowKind::Hann);
    let c = table.coefficients();
    assert!(c[0].abs() < 1e-6);
    assert!((c[FFT_SIZE / 2] - 1.0).abs() < 1e-6);
    // Periodic form: symmetric about N/2
    assert!((c[100] - c[FFT_SIZE - 100]).abs() < 1e-5);
}

#[test]
fn test_flat_top_has_negative_lobes() {
    let table = WindowTable::<FFT_SIZE>::new(WindowKind::FlatTop);
    assert!(table.coefficients().iter().any(|&c| c < 0.0));
    assert!((table.coefficients()[FFT_SIZE / 2] - 1.0).abs() < 1e-3);
}

#[test]
fn test_kaiser_tapers_to_edges() {
    let table = WindowTable::<FFT_SIZE>::new(WindowKind::KaiserBessel);
    let c = table.coefficients();
    // 1 / I0(8.5) at the edges
    assert!((c[0] - 1.0 / bessel_i0(8.5)).abs() < 1e-6);
    assert!(c[0] < c[FFT_SIZE / 4]);
    assert!(c[FFT_SIZE / 4] < c[FFT_SIZE / 2]);
}

#[test]
fn test_all_coefficients_bounded() {
    for kind in WindowKind::ALL {
        let table = WindowTable::<FFT_SIZE>::new(kind);
        for &c in table.coefficients() {
            assert!(c.is_finite());
            assert!(c <= 1.0 + 1e-3, "{}: {}", kind.name(), c);
        }
    }
}

#[test]
fn test_degenerate_length() {
    assert_eq!(WindowKind::Hann.coefficient(0, 1), 1.0);
    assert_eq!(WindowKind::KaiserBessel.coefficient(0, 0), 1.0);
}

// =============================================================================
// Selector Tests
// =============================================================================

#[test]
fn test_default_is_rectangular() {
    assert_eq!(WindowKind::default(), WindowKind::Rectangular);
    assert_eq!(WindowTable::<16>::new(WindowKind::default()).kind(), WindowKind::Rectangular);
}

#[test]
fn test_names() {
    let names: Vec<&str> = WindowKind::ALL.iter().map(|k| k.name()).collect();
    assert_eq!(
        names,
        [
            "Rectangle",
            "Hamming",
            "Hann",
            "Blackman",
            "Blackman-Harris",
            "Kaiser-Bessel",
            "Flat-Top"
        ]
    );
}

#[test]
fn test_from_index() {
    assert_eq!(WindowKind::from_index(0), Some(WindowKind::Rectangular));
    assert_eq!(WindowKind::from_index(6), Some(WindowKind::FlatTop));
    assert_eq!(WindowKind::from_index(255), None);
}
