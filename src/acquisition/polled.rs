//! Software-polled acquisition
//!
//! The consumer's thread is the producer: `poll_ready` fills the whole write
//! buffer in a blocking loop, reading the converter at deadlines derived from
//! the sample rate, then swaps. No interrupts, no concurrency.

use core::sync::atomic::Ordering;

use super::{AcquisitionCore, Sampler};
use crate::error::ConfigResult;
use crate::timing::{rate_from_interval, Clock, SampleTicker};
use crate::types::{AcquisitionMode, SampleRate};

/// A converter that can be read one sample at a time
pub trait SampleSource {
    /// Prepare the converter for sampling at `rate`
    fn configure(&mut self, rate: SampleRate) -> ConfigResult<()>;

    /// Take one conversion
    fn read(&mut self) -> u16;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn configure(&mut self, rate: SampleRate) -> ConfigResult<()> {
        (**self).configure(rate)
    }

    fn read(&mut self) -> u16 {
        (**self).read()
    }
}

/// Polled acquisition over a [`SampleSource`] and a [`Clock`]
pub struct PolledSampler<S, C, const N: usize> {
    core: AcquisitionCore<N>,
    source: S,
    clock: C,
    rate: SampleRate,
}

impl<S: SampleSource, C: Clock, const N: usize> PolledSampler<S, C, N> {
    /// Configure the source for `rate`; nothing starts until [`Sampler::start`]
    pub fn init(mut source: S, clock: C, rate: SampleRate) -> ConfigResult<Self> {
        source.configure(rate)?;
        info!("polled acquisition ready: {} Hz, {} samples/buffer", rate.as_hz(), N);
        Ok(Self {
            core: AcquisitionCore::new(),
            source,
            clock,
            rate,
        })
    }

    /// Configured sampling rate
    #[must_use]
    pub const fn rate(&self) -> SampleRate {
        self.rate
    }

    /// Clock used for sample deadlines
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn fill_write_buffer(&mut self) {
        let buffer = self.core.write_buffer();
        let ticker = SampleTicker::new(self.clock.now(), self.rate);

        let mut first = None;
        let mut last = None;
        for (slot, deadline) in buffer.iter().zip(ticker) {
            self.clock.sleep_until(deadline);
            let taken_at = self.clock.now();
            slot.store(self.source.read(), Ordering::Relaxed);
            first.get_or_insert(taken_at);
            last = Some(taken_at);
        }

        if let (Some(first), Some(last)) = (first, last) {
            let span = last.saturating_duration_since(first);
            if let Some(rate) = rate_from_interval(N.saturating_sub(1), span) {
                self.core.record_rate(rate);
            }
        }

        self.core.complete_fill();
        self.core.handoff().publish();
    }
}

impl<S: SampleSource, C: Clock, const N: usize> Sampler<N> for PolledSampler<S, C, N> {
    fn core(&self) -> &AcquisitionCore<N> {
        &self.core
    }

    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Polled
    }

    fn start(&mut self) {
        if self.core.is_running() || self.core.is_faulted() {
            return;
        }
        self.core.prepare_start();
        self.core.set_running();
        info!("polled acquisition started");
    }

    fn stop(&mut self) {
        if !self.core.is_running() && !self.core.is_faulted() {
            return;
        }
        self.core.set_idle();
        self.core.handoff().discard();
        info!("polled acquisition stopped");
    }

    fn poll_ready(&mut self) -> bool {
        if !self.core.is_running() {
            return false;
        }
        if !self.core.handoff().is_ready() {
            self.fill_write_buffer();
        }
        true
    }
}
