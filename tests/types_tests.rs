//! Types Module Tests
//!
//! Tests for domain types (SampleRate, DisplayRange, acquisition enums)
//! Run with: cargo test --no-default-features --features std --test types_tests

use specan_firmware::types::{
    AcquisitionCounters, AcquisitionMode, AcquisitionStatus, DisplayRange, FrequencyScale,
    SampleRate,
};

// =============================================================================
// SampleRate Tests
// =============================================================================

#[test]
fn test_sample_rate_from_hz_valid() {
    assert!(SampleRate::from_hz(128_000).is_some());
    assert!(SampleRate::from_hz(SampleRate::MIN_HZ).is_some());
    assert!(SampleRate::from_hz(SampleRate::MAX_HZ).is_some());
}

#[test]
fn test_sample_rate_from_hz_invalid() {
    assert!(SampleRate::from_hz(0).is_none());
    assert!(SampleRate::from_hz(999).is_none());
    assert!(SampleRate::from_hz(2_000_001).is_none());
}

#[test]
fn test_sample_rate_period() {
    let rate = SampleRate::from_hz(128_000).unwrap();
    assert_eq!(rate.as_hz(), 128_000);
    // 7812.5 ns truncated
    assert_eq!(rate.period_ns(), 7_812);
    // One 1024-sample buffer takes exactly 8 ms
    assert_eq!(rate.fill_time_ns(1024), 8_000_000);
}

#[test]
fn test_sample_rate_bin_width() {
    let rate = SampleRate::from_hz(128_000).unwrap();
    assert!((rate.bin_width_hz(1024) - 125.0).abs() < 1e-4);
}

#[test]
fn test_sample_rate_ordering() {
    let slow = SampleRate::from_hz(48_000).unwrap();
    let fast = SampleRate::from_hz(128_000).unwrap();
    assert!(slow < fast);
}

// =============================================================================
// DisplayRange Tests
// =============================================================================

#[test]
fn test_display_range_default() {
    let range = DisplayRange::default();
    assert_eq!(range.floor(), -100.0);
    assert_eq!(range.ceiling(), 20.0);
    assert_eq!(range.span_db(), 120.0);
}

#[test]
fn test_display_range_new_invalid() {
    assert!(DisplayRange::new(20.0, -100.0).is_none());
    assert!(DisplayRange::new(-10.0, -10.0).is_none());
    assert!(DisplayRange::new(f32::NAN, 0.0).is_none());
    assert!(DisplayRange::new(-100.0, f32::INFINITY).is_none());
}

#[test]
fn test_display_range_clamp_saturates() {
    let range = DisplayRange::DEFAULT;
    assert_eq!(range.clamp(50.0), 20.0);
    assert_eq!(range.clamp(-300.0), -100.0);
    assert_eq!(range.clamp(-42.5), -42.5);
}

#[test]
fn test_display_range_clamp_non_finite() {
    let range = DisplayRange::DEFAULT;
    assert_eq!(range.clamp(f32::NAN), -100.0);
    assert_eq!(range.clamp(f32::INFINITY), -100.0);
    assert_eq!(range.clamp(f32::NEG_INFINITY), -100.0);
}

#[test]
fn test_display_range_normalize() {
    let range = DisplayRange::DEFAULT;
    assert_eq!(range.normalize(-100.0), 0.0);
    assert_eq!(range.normalize(20.0), 1.0);
    assert!((range.normalize(-40.0) - 0.5).abs() < 1e-6);
    assert_eq!(range.normalize(-500.0), 0.0);
}

#[test]
fn test_display_range_bar_height() {
    let range = DisplayRange::DEFAULT;
    assert_eq!(range.bar_height(-100.0, 64), 0);
    assert_eq!(range.bar_height(-40.0, 64), 32);
    // Full scale stays inside the column
    assert_eq!(range.bar_height(20.0, 64), 63);
    assert_eq!(range.bar_height(0.0, 0), 0);
}

// =============================================================================
// Acquisition Enum Tests
// =============================================================================

#[test]
fn test_acquisition_mode_default() {
    assert_eq!(AcquisitionMode::default(), AcquisitionMode::Driven);
}

#[test]
fn test_acquisition_mode_names() {
    assert_eq!(AcquisitionMode::Polled.name(), "polled");
    assert_eq!(AcquisitionMode::Driven.name(), "driven");
}

#[test]
fn test_acquisition_status_default_idle() {
    assert_eq!(AcquisitionStatus::default(), AcquisitionStatus::Idle);
}

#[test]
fn test_counters_default_zero() {
    let c = AcquisitionCounters::default();
    assert_eq!(c.total_samples, 0);
    assert_eq!(c.overruns, 0);
    assert_eq!(c.measured_rate_hz, 0.0);
}

#[test]
fn test_frequency_scale_default_linear() {
    assert_eq!(FrequencyScale::default(), FrequencyScale::Linear);
}
