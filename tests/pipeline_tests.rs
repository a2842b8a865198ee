//! Pipeline Coordinator Tests
//!
//! Full acquisition-to-frame path on simulated hardware and virtual time.
//! Run with: cargo test --no-default-features --features std --test pipeline_tests

use core::time::Duration;

use specan_firmware::acquisition::{
    AcquisitionCore, DrivenSampler, DrivenShared, PolledSampler, ReadyBuffer, Sampler,
};
use specan_firmware::config::{AnalyzerConfig, FFT_SIZE};
use specan_firmware::dsp::spectrum::SpectrumFrame;
use specan_firmware::dsp::window::WindowKind;
use specan_firmware::error::{ConfigError, ProcessError};
use specan_firmware::pipeline::{IterationOutcome, PeakLogSink, Phase, Pipeline, SpectrumSink};
use specan_firmware::sim::{ConstantSource, SimTransferEngine, ToneSource, VirtualClock};
use specan_firmware::timing::{Clock, Timestamp};
use specan_firmware::types::{AcquisitionMode, AcquisitionStatus, FrequencyScale, SampleRate};

const PERIOD_NS: u64 = 33_333_333;

/// Keeps a summary of every published frame
#[derive(Default)]
struct RecordingSink {
    sequences: Vec<u32>,
    rates: Vec<f32>,
    peak_bins: Vec<usize>,
}

impl SpectrumSink for RecordingSink {
    fn publish(&mut self, frame: &SpectrumFrame) {
        let peak = frame
            .levels()
            .iter()
            .enumerate()
            .skip(1)
            .fold((0, f32::MIN), |best, (i, &l)| if l > best.1 { (i, l) } else { best });
        self.sequences.push(frame.sequence());
        self.rates.push(frame.sample_rate_hz());
        self.peak_bins.push(peak.0);
    }
}

fn rate() -> SampleRate {
    SampleRate::from_hz(128_000).unwrap()
}

fn zero_dbm_counts() -> f64 {
    (1e-3f64 * 75.0).sqrt() / (3.3 / 4096.0)
}

fn tone(frequency_hz: f64) -> ToneSource {
    ToneSource::new(2048.0, zero_dbm_counts(), frequency_hz)
}

fn polled(
    source: ToneSource,
    clock: &VirtualClock,
) -> PolledSampler<ToneSource, VirtualClock, FFT_SIZE> {
    PolledSampler::init(source, clock.clone(), rate()).unwrap()
}

fn pipeline(clock: &VirtualClock) -> Pipeline<VirtualClock, RecordingSink> {
    Pipeline::new(&AnalyzerConfig::default(), clock.clone(), RecordingSink::default()).unwrap()
}

/// Driven sampler whose producer completes again while a buffer is held
struct RacingSampler<'a> {
    inner: DrivenSampler<'a, SimTransferEngine<ConstantSource>, FFT_SIZE>,
}

impl Sampler<FFT_SIZE> for RacingSampler<'_> {
    fn core(&self) -> &AcquisitionCore<FFT_SIZE> {
        self.inner.core()
    }

    fn mode(&self) -> AcquisitionMode {
        self.inner.mode()
    }

    fn start(&mut self) {
        self.inner.start();
    }

    fn stop(&mut self) {
        self.inner.stop();
    }

    fn poll_ready(&mut self) -> bool {
        self.inner.poll_ready()
    }

    fn release(&self, buffer: ReadyBuffer<'_, FFT_SIZE>) -> bool {
        self.inner.shared().on_transfer_complete(Timestamp::ZERO);
        self.inner.release(buffer)
    }
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_new_uses_config() {
    let clock = VirtualClock::new();
    let config = AnalyzerConfig {
        window: WindowKind::Hann,
        ..AnalyzerConfig::default()
    };
    let pipeline = Pipeline::new(&config, clock, RecordingSink::default()).unwrap();
    assert_eq!(pipeline.window(), WindowKind::Hann);
    assert_eq!(pipeline.frame_period(), Duration::from_nanos(PERIOD_NS));
    assert_eq!(pipeline.phase(), Phase::WaitForData);
    assert!(pipeline.spectrum().levels().iter().all(|&l| l == -100.0));
}

#[test]
fn test_new_rejects_invalid_config() {
    let config = AnalyzerConfig {
        frame_rate_fps: 0,
        ..AnalyzerConfig::default()
    };
    let result = Pipeline::new(&config, VirtualClock::new(), RecordingSink::default());
    assert!(matches!(result, Err(ConfigError::InvalidFrameRate)));

    let config = AnalyzerConfig {
        adc_resolution_bits: 24,
        ..AnalyzerConfig::default()
    };
    match Pipeline::new(&config, VirtualClock::new(), RecordingSink::default()) {
        Err(e) => assert_eq!(e, ConfigError::InvalidResolution),
        Ok(_) => panic!("24-bit converter accepted"),
    }
}

// =============================================================================
// Polled Pipeline Tests
// =============================================================================

#[test]
fn test_polled_tone_end_to_end() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(1_000.0), &clock);
    let mut pipeline = pipeline(&clock);

    sampler.start();
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::Published);

    let frame = pipeline.spectrum();
    let level = frame.level_at(1_000.0).unwrap();
    assert!(level.abs() < 0.1, "tone read {level} dBm");
    assert_eq!(pipeline.sink().sequences, [1]);
    assert_eq!(pipeline.sink().peak_bins, [8]);
    // Measured rate replaces the configured one
    assert!((pipeline.sink().rates[0] - 128_000.0).abs() < 1.0);
}

#[test]
fn test_no_data_when_idle() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(1_000.0), &clock);
    let mut pipeline = pipeline(&clock);

    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::NoData);
    assert!(pipeline.sink().sequences.is_empty());
    assert_eq!(pipeline.counters().frames, 0);
    // Pacing still holds the frame period
    assert_eq!(clock.now().as_nanos(), PERIOD_NS);
}

#[test]
fn test_fixed_frame_period() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(1_000.0), &clock);
    let mut pipeline = pipeline(&clock);
    sampler.start();

    for n in 1..=5u64 {
        pipeline.run_iteration(&mut sampler);
        assert_eq!(clock.now().as_nanos(), n * PERIOD_NS);
        assert_eq!(pipeline.phase(), Phase::WaitForData);
    }
    let fps = pipeline.counters().actual_fps;
    assert!((fps - 30.0).abs() < 0.01, "fps {fps}");
}

#[test]
fn test_slow_frame_is_not_padded() {
    let clock = VirtualClock::new();
    // 1024 samples at 10 kHz take 102 ms, longer than a frame
    let slow = SampleRate::from_hz(10_000).unwrap();
    let mut sampler =
        PolledSampler::<_, _, FFT_SIZE>::init(tone(1_000.0), clock.clone(), slow).unwrap();
    let config = AnalyzerConfig {
        sample_rate_hz: 10_000,
        ..AnalyzerConfig::default()
    };
    let mut pipeline = Pipeline::new(&config, clock.clone(), RecordingSink::default()).unwrap();
    sampler.start();

    pipeline.run_iteration(&mut sampler);
    assert_eq!(clock.now().as_nanos(), 1_023 * 1_000_000_000 / 10_000);
}

#[test]
fn test_sequence_increments_per_frame() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(5_000.0), &clock);
    let mut pipeline = pipeline(&clock);
    sampler.start();

    for _ in 0..3 {
        pipeline.run_iteration(&mut sampler);
    }
    assert_eq!(pipeline.sink().sequences, [1, 2, 3]);
    assert_eq!(pipeline.sink().peak_bins, [40, 40, 40]);
    assert_eq!(pipeline.counters().frames, 3);
    assert_eq!(pipeline.counters().errors, 0);
}

#[test]
fn test_status_report_interval() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(2_000.0), &clock);
    let mut pipeline = pipeline(&clock);
    sampler.start();

    for _ in 0..100 {
        assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::Published);
    }
    assert_eq!(pipeline.counters().frames, 100);
    assert_eq!(sampler.counters().total_samples, 100 * FFT_SIZE as u32);
    assert_eq!(sampler.counters().overruns, 0);
}

#[test]
fn test_reset_counters() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(1_000.0), &clock);
    let mut pipeline = pipeline(&clock);
    sampler.start();
    pipeline.run_iteration(&mut sampler);
    pipeline.run_iteration(&mut sampler);

    pipeline.reset_counters();
    let counters = pipeline.counters();
    assert_eq!(counters.frames, 0);
    assert_eq!(counters.errors, 0);
    assert_eq!(counters.actual_fps, 0.0);
}

#[test]
fn test_shutdown_stops_sampler() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(1_000.0), &clock);
    let mut pipeline = pipeline(&clock);
    sampler.start();
    pipeline.run_iteration(&mut sampler);

    pipeline.shutdown(&mut sampler);
    assert_eq!(sampler.status(), AcquisitionStatus::Idle);
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::NoData);
}

#[test]
fn test_peak_log_sink() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(12_500.0), &clock);
    let mut pipeline =
        Pipeline::new(&AnalyzerConfig::default(), clock.clone(), PeakLogSink::new(-60.0)).unwrap();
    sampler.start();
    pipeline.run_iteration(&mut sampler);

    let peaks = pipeline.sink().peaks();
    assert_eq!(peaks.len(), 1);
    assert_eq!(peaks[0].bin, 100);
    assert!(peaks[0].level_dbm.abs() < 0.1);
}

#[test]
fn test_peak_log_sink_follows_configured_scale() {
    let linear = PeakLogSink::from_config(&AnalyzerConfig::default());
    assert_eq!(linear.axis().map(|a| a.scale()), Some(FrequencyScale::Linear));

    let config = AnalyzerConfig {
        frequency_scale: FrequencyScale::Log,
        ..AnalyzerConfig::default()
    };
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(12_500.0), &clock);
    let mut pipeline = Pipeline::new(&config, clock.clone(), PeakLogSink::from_config(&config)).unwrap();
    sampler.start();
    pipeline.run_iteration(&mut sampler);

    let sink = pipeline.sink();
    assert_eq!(sink.axis().map(|a| a.scale()), Some(FrequencyScale::Log));
    assert_eq!(sink.peaks()[0].bin, 100);
    // log10(12.5) / log10(50) across the 1 kHz to 50 kHz band
    let pos = sink.top_position().unwrap();
    assert!((pos - 0.645_63).abs() < 1e-3, "position {pos}");
}

#[test]
fn test_peak_log_sink_without_axis_has_no_position() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(12_500.0), &clock);
    let mut pipeline =
        Pipeline::new(&AnalyzerConfig::default(), clock.clone(), PeakLogSink::new(-60.0)).unwrap();
    sampler.start();
    pipeline.run_iteration(&mut sampler);

    assert_eq!(pipeline.sink().peaks().len(), 1);
    assert!(pipeline.sink().top_position().is_none());
}

#[test]
fn test_borrowed_sink() {
    let clock = VirtualClock::new();
    let mut sampler = polled(tone(1_000.0), &clock);
    let mut sink = RecordingSink::default();
    {
        let mut pipeline =
            Pipeline::new(&AnalyzerConfig::default(), clock.clone(), &mut sink).unwrap();
        sampler.start();
        pipeline.run_iteration(&mut sampler);
    }
    assert_eq!(sink.sequences, [1]);
}

// =============================================================================
// Driven Pipeline Tests
// =============================================================================

#[test]
fn test_driven_uses_configured_rate_until_measured() {
    let clock = VirtualClock::new();
    let shared: DrivenShared<_, FFT_SIZE> = DrivenShared::new(SimTransferEngine::new(tone(1_000.0)));
    let mut sampler = DrivenSampler::init(&shared, rate()).unwrap();
    let mut pipeline = pipeline(&clock);
    sampler.start();

    // One completion: no interval measured yet
    shared.on_transfer_complete(Timestamp::from_nanos(8_000_000));
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::Published);
    assert_eq!(pipeline.sink().rates, [128_000.0]);
    assert_eq!(pipeline.sink().peak_bins, [8]);

    shared.on_transfer_complete(Timestamp::from_nanos(16_000_000));
    shared.on_transfer_complete(Timestamp::from_nanos(24_000_000));
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::Published);
    assert_eq!(sampler.counters().overruns, 1);
    assert!((pipeline.sink().rates[1] - 128_000.0).abs() < 1.0);
}

#[test]
fn test_driven_no_data_between_completions() {
    let clock = VirtualClock::new();
    let shared: DrivenShared<_, FFT_SIZE> = DrivenShared::new(SimTransferEngine::new(tone(1_000.0)));
    let mut sampler = DrivenSampler::init(&shared, rate()).unwrap();
    let mut pipeline = pipeline(&clock);
    sampler.start();

    shared.on_transfer_complete(Timestamp::ZERO);
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::Published);
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::NoData);
}

#[test]
fn test_overwritten_buffer_counts_error() {
    let clock = VirtualClock::new();
    let shared: DrivenShared<_, FFT_SIZE> =
        DrivenShared::new(SimTransferEngine::new(ConstantSource(1000)));
    let mut sampler = RacingSampler {
        inner: DrivenSampler::init(&shared, rate()).unwrap(),
    };
    let mut pipeline = pipeline(&clock);
    sampler.start();
    shared.on_transfer_complete(Timestamp::ZERO);

    assert_eq!(
        pipeline.run_iteration(&mut sampler),
        IterationOutcome::ProcessFailed(ProcessError::BufferOverwritten)
    );
    assert_eq!(pipeline.counters().errors, 1);
    assert_eq!(pipeline.counters().frames, 0);
    assert!(pipeline.sink().sequences.is_empty());

    // The loop carries on with the next frame
    assert!(matches!(
        pipeline.run_iteration(&mut sampler),
        IterationOutcome::ProcessFailed(_)
    ));
    assert_eq!(pipeline.counters().errors, 2);
}

#[test]
fn test_driven_fault_yields_no_data() {
    let clock = VirtualClock::new();
    let shared: DrivenShared<_, FFT_SIZE> = DrivenShared::new(SimTransferEngine::new(tone(1_000.0)));
    let mut sampler = DrivenSampler::init(&shared, rate()).unwrap();
    let mut pipeline = pipeline(&clock);
    sampler.start();

    shared.on_transfer_error();
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::NoData);
    assert_eq!(sampler.status(), AcquisitionStatus::Error);
}

#[test]
fn test_driven_fault_after_completion_yields_no_data() {
    let clock = VirtualClock::new();
    let shared: DrivenShared<_, FFT_SIZE> = DrivenShared::new(SimTransferEngine::new(tone(1_000.0)));
    let mut sampler = DrivenSampler::init(&shared, rate()).unwrap();
    let mut pipeline = pipeline(&clock);
    sampler.start();

    shared.on_transfer_complete(clock.now());
    shared.on_transfer_error();

    assert_eq!(sampler.status(), AcquisitionStatus::Error);
    assert!(!sampler.poll_ready());
    assert_eq!(pipeline.run_iteration(&mut sampler), IterationOutcome::NoData);
    assert_eq!(pipeline.counters().frames, 0);
    assert!(pipeline.sink().sequences.is_empty());
}
