//! Pipeline Coordinator
//!
//! Drains ready buffers from a [`Sampler`], turns them into calibrated
//! spectrum frames and hands those to a [`SpectrumSink`], one frame per
//! fixed period:
//!
//! ```text
//! WaitForData ──ready──▶ Process ──ok──▶ Publish ──▶ Pace ──▶ WaitForData
//!      │                    │                          ▲
//!      └──────none──────────┴──────failed──────────────┘
//! ```
//!
//! A failed Process step is counted and logged; the loop never halts.

use core::time::Duration;

use crate::acquisition::Sampler;
use crate::config::{
    AnalyzerConfig, FFT_SIZE, FREQUENCY_RANGE_MAX_HZ, FREQUENCY_RANGE_MIN_HZ, MAX_PEAKS,
    OVERRUN_REPORT_INTERVAL, SPECTRUM_BINS, STATUS_REPORT_INTERVAL,
};
use crate::dsp::calibration::Calibration;
use crate::dsp::spectrum::{FrequencyAxis, Peak, PeakDetector, SpectrumFrame};
use crate::dsp::transform::SpectrumTransform;
use crate::dsp::window::WindowKind;
use crate::error::{ConfigResult, ProcessError, ProcessResult};
use crate::timing::{Clock, FpsMeter, FramePacer};
use crate::types::{DisplayRange, SampleRate};

/// Receives every published frame (the display collaborator)
pub trait SpectrumSink {
    /// Take a new frame; levels are clamped to the display range
    fn publish(&mut self, frame: &SpectrumFrame);
}

impl<K: SpectrumSink + ?Sized> SpectrumSink for &mut K {
    fn publish(&mut self, frame: &SpectrumFrame) {
        (**self).publish(frame);
    }
}

/// Sink that tracks the strongest peaks in the band of interest and logs them
#[derive(Debug, Default)]
pub struct PeakLogSink {
    peaks: heapless::Vec<Peak, MAX_PEAKS>,
    threshold_dbm: f32,
    axis: Option<FrequencyAxis>,
}

impl PeakLogSink {
    /// Report peaks above `threshold_dbm`
    #[must_use]
    pub const fn new(threshold_dbm: f32) -> Self {
        Self {
            peaks: heapless::Vec::new(),
            threshold_dbm,
            axis: None,
        }
    }

    /// Report peaks above the display floor, placed on the configured
    /// frequency axis across the band of interest
    #[must_use]
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self {
            peaks: heapless::Vec::new(),
            threshold_dbm: config.display.floor(),
            axis: FrequencyAxis::new(
                FREQUENCY_RANGE_MIN_HZ as f32,
                FREQUENCY_RANGE_MAX_HZ as f32,
                config.frequency_scale,
            ),
        }
    }

    /// Peaks found in the latest frame, strongest first
    #[must_use]
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    /// Frequency axis used to place peaks, if any
    #[must_use]
    pub fn axis(&self) -> Option<&FrequencyAxis> {
        self.axis.as_ref()
    }

    /// Axis position (0.0..=1.0) of the strongest peak
    #[must_use]
    pub fn top_position(&self) -> Option<f32> {
        let top = self.peaks.first()?;
        self.axis.as_ref()?.position(top.frequency_hz)
    }
}

impl SpectrumSink for PeakLogSink {
    fn publish(&mut self, frame: &SpectrumFrame) {
        self.peaks = PeakDetector::top_peaks::<MAX_PEAKS>(
            frame,
            FREQUENCY_RANGE_MIN_HZ as f32,
            FREQUENCY_RANGE_MAX_HZ as f32,
            self.threshold_dbm,
        );
        if let Some(top) = self.peaks.first() {
            match self.top_position() {
                Some(pos) => debug!("frame {}: peak {} at {}", frame.sequence(), top, pos),
                None => debug!("frame {}: peak {}", frame.sequence(), top),
            }
        }
    }
}

/// Step of the coordinator loop
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Phase {
    /// Asking the sampler for a ready buffer
    #[default]
    WaitForData,
    /// Window, transform and calibration
    Process,
    /// Handing the frame to the sink
    Publish,
    /// Sleeping out the frame period
    Pace,
}

/// What one iteration did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationOutcome {
    /// A frame reached the sink
    Published,
    /// Nothing was ready
    NoData,
    /// Processing failed; the error counter was incremented
    ProcessFailed(ProcessError),
}

/// Coordinator counters
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineCounters {
    /// Frames published since the last reset
    pub frames: u32,
    /// Failed Process steps since the last reset
    pub errors: u32,
    /// Frame rate from the last frame-to-frame interval
    pub actual_fps: f32,
}

/// The acquisition-to-display loop
pub struct Pipeline<C, K> {
    transform: SpectrumTransform,
    amplitudes: [f32; SPECTRUM_BINS],
    frame: SpectrumFrame,
    calibration: Calibration,
    range: DisplayRange,
    configured_rate: SampleRate,
    clock: C,
    sink: K,
    pacer: FramePacer,
    fps: FpsMeter,
    frames: u32,
    errors: u32,
    phase: Phase,
}

impl<C: Clock, K: SpectrumSink> Pipeline<C, K> {
    /// Build the pipeline; the window table and calibration are fixed here
    pub fn new(config: &AnalyzerConfig, clock: C, sink: K) -> ConfigResult<Self> {
        config.validate()?;
        let configured_rate = config.sample_rate()?;
        let calibration = config.calibration()?;
        let period = config.frame_period()?;

        let window = config.window;
        info!(
            "window: {} (correction x{}, {} dB)",
            window.name(),
            window.amplitude_correction(),
            window.amplitude_correction_db()
        );
        info!(
            "calibration: {} V/count, 0 dBm = {} V, impedance x{}",
            calibration.volts_per_count(),
            calibration.reference_volts(),
            calibration.impedance_correction()
        );

        Ok(Self {
            transform: SpectrumTransform::new(window),
            amplitudes: [0.0; SPECTRUM_BINS],
            frame: SpectrumFrame::new(config.display.floor()),
            calibration,
            range: config.display,
            configured_rate,
            clock,
            sink,
            pacer: FramePacer::new(period),
            fps: FpsMeter::new(),
            frames: 0,
            errors: 0,
            phase: Phase::WaitForData,
        })
    }

    /// Latest published spectrum
    #[must_use]
    pub fn spectrum(&self) -> &SpectrumFrame {
        &self.frame
    }

    /// Current loop phase
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Active window shape
    #[must_use]
    pub fn window(&self) -> WindowKind {
        self.transform.window().kind()
    }

    /// Fixed frame period
    #[must_use]
    pub const fn frame_period(&self) -> Duration {
        self.pacer.period()
    }

    /// Display collaborator
    #[must_use]
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Counter snapshot
    #[must_use]
    pub fn counters(&self) -> PipelineCounters {
        PipelineCounters {
            frames: self.frames,
            errors: self.errors,
            actual_fps: self.fps.fps(),
        }
    }

    /// Zero frames, errors and the frame-rate history
    pub fn reset_counters(&mut self) {
        self.frames = 0;
        self.errors = 0;
        self.fps.reset();
    }

    /// One pass of WaitForData, Process, Publish and Pace
    pub fn run_iteration<S>(&mut self, sampler: &mut S) -> IterationOutcome
    where
        S: Sampler<FFT_SIZE> + ?Sized,
    {
        self.pacer.start_frame(self.clock.now());

        self.phase = Phase::WaitForData;
        let outcome = if sampler.poll_ready() {
            self.phase = Phase::Process;
            match self.process(sampler) {
                Ok(()) => {
                    self.phase = Phase::Publish;
                    self.sink.publish(&self.frame);
                    self.frames = self.frames.wrapping_add(1);
                    self.fps.record(self.clock.now());
                    self.report(sampler);
                    IterationOutcome::Published
                }
                Err(err) => {
                    self.errors = self.errors.wrapping_add(1);
                    warn!("process failed: {} (errors: {})", err, self.errors);
                    IterationOutcome::ProcessFailed(err)
                }
            }
        } else {
            IterationOutcome::NoData
        };

        self.phase = Phase::Pace;
        self.pacer.wait(&self.clock);
        self.phase = Phase::WaitForData;
        outcome
    }

    /// Run forever
    pub fn run<S>(&mut self, sampler: &mut S) -> !
    where
        S: Sampler<FFT_SIZE> + ?Sized,
    {
        sampler.start();
        loop {
            self.run_iteration(sampler);
        }
    }

    /// Stop acquisition and log final statistics
    pub fn shutdown<S>(&mut self, sampler: &mut S)
    where
        S: Sampler<FFT_SIZE> + ?Sized,
    {
        sampler.stop();
        let acq = sampler.counters();
        info!(
            "final: frames={} errors={} fps={} samples={} overruns={} rate={}Hz",
            self.frames,
            self.errors,
            self.fps.fps(),
            acq.total_samples,
            acq.overruns,
            acq.measured_rate_hz
        );
    }

    fn process<S>(&mut self, sampler: &S) -> ProcessResult<()>
    where
        S: Sampler<FFT_SIZE> + ?Sized,
    {
        let buffer = sampler.take_ready_buffer().ok_or(ProcessError::NoData)?;
        let transformed = self.transform.amplitudes(buffer.iter(), &mut self.amplitudes);
        let intact = sampler.release(buffer);
        transformed?;
        if !intact {
            return Err(ProcessError::BufferOverwritten);
        }

        let rate = self.effective_rate_hz(sampler.counters().measured_rate_hz);
        self.frame
            .fill(&self.amplitudes, &self.calibration, self.range, rate);
        Ok(())
    }

    fn effective_rate_hz(&self, measured_hz: f32) -> f32 {
        if measured_hz > 0.0 {
            measured_hz
        } else {
            self.configured_rate.as_f32()
        }
    }

    fn report<S>(&self, sampler: &S)
    where
        S: Sampler<FFT_SIZE> + ?Sized,
    {
        let acq = sampler.counters();
        if self.frames % STATUS_REPORT_INTERVAL == 0 {
            let band = PeakDetector::find_peak(
                &self.frame,
                FREQUENCY_RANGE_MIN_HZ as f32,
                FREQUENCY_RANGE_MAX_HZ as f32,
            );
            info!(
                "status: frames={} fps={} errors={} mode={} {} peak={} floor={}dBm",
                self.frames,
                self.fps.fps(),
                self.errors,
                sampler.mode(),
                acq,
                band.peak,
                band.noise_floor
            );
        }
        if self.frames % OVERRUN_REPORT_INTERVAL == 0 && acq.overruns > 0 {
            warn!("{} buffer overruns in {} frames", acq.overruns, self.frames);
        }
    }
}
