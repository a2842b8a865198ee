//! Host simulation
//!
//! Deterministic stand-ins for the converter, the transfer engine and the
//! clock so the full acquisition and pipeline paths run under `cargo test`.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicU16, AtomicU64, Ordering};
use std::sync::Arc;

use crate::acquisition::{SampleSource, TransferEngine};
use crate::error::{ConfigError, ConfigResult};
use crate::timing::{Clock, Timestamp};
use crate::types::SampleRate;

/// Virtual time; `sleep_until` jumps straight to the deadline
///
/// Clones share the same time line.
#[derive(Clone, Debug, Default)]
pub struct VirtualClock {
    nanos: Arc<AtomicU64>,
}

impl VirtualClock {
    /// Clock at time zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward
    pub fn advance(&self, nanos: u64) {
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.nanos.load(Ordering::SeqCst))
    }

    fn sleep_until(&self, deadline: Timestamp) {
        self.nanos.fetch_max(deadline.as_nanos(), Ordering::SeqCst);
    }
}

/// Sine tone around a DC offset, sampled at the configured rate
#[derive(Clone, Debug)]
pub struct ToneSource {
    offset_counts: f64,
    amplitude_counts: f64,
    frequency_hz: f64,
    rate_hz: f64,
    index: u64,
}

impl ToneSource {
    /// Tone of `amplitude_counts` peak at `frequency_hz` around `offset_counts`
    #[must_use]
    pub fn new(offset_counts: f64, amplitude_counts: f64, frequency_hz: f64) -> Self {
        Self {
            offset_counts,
            amplitude_counts,
            frequency_hz,
            rate_hz: 1.0,
            index: 0,
        }
    }

    /// Value of sample `index` at `rate_hz`, rounded and clamped to 16 bits
    #[must_use]
    pub fn sample_at(&self, index: u64, rate_hz: f64) -> u16 {
        let t = index as f64 / rate_hz;
        let v = self.offset_counts + self.amplitude_counts * (2.0 * PI * self.frequency_hz * t).sin();
        v.round().clamp(0.0, f64::from(u16::MAX)) as u16
    }
}

impl SampleSource for ToneSource {
    fn configure(&mut self, rate: SampleRate) -> ConfigResult<()> {
        self.rate_hz = f64::from(rate.as_hz());
        self.index = 0;
        Ok(())
    }

    fn read(&mut self) -> u16 {
        let v = self.sample_at(self.index, self.rate_hz);
        self.index += 1;
        v
    }
}

/// Always returns the same value
#[derive(Clone, Copy, Debug)]
pub struct ConstantSource(pub u16);

impl SampleSource for ConstantSource {
    fn configure(&mut self, _rate: SampleRate) -> ConfigResult<()> {
        Ok(())
    }

    fn read(&mut self) -> u16 {
        self.0
    }
}

/// Every block of `block_len` reads returns the block number, starting at 1
///
/// With `block_len` equal to the buffer size each filled buffer is uniform
/// and distinguishable from every other.
#[derive(Clone, Copy, Debug)]
pub struct BlockCounterSource {
    block_len: usize,
    reads: usize,
}

impl BlockCounterSource {
    /// Counter with the given block length
    #[must_use]
    pub const fn new(block_len: usize) -> Self {
        Self { block_len, reads: 0 }
    }
}

impl SampleSource for BlockCounterSource {
    fn configure(&mut self, _rate: SampleRate) -> ConfigResult<()> {
        Ok(())
    }

    fn read(&mut self) -> u16 {
        let block = self.reads / self.block_len.max(1) + 1;
        self.reads += 1;
        block as u16
    }
}

/// Transfer engine that completes the transfer instantly at arm time
///
/// The next `on_transfer_complete` then finds the write buffer full.
#[derive(Debug)]
pub struct SimTransferEngine<S> {
    source: S,
    claim_fails: bool,
    claimed: bool,
    running: bool,
    arms: u32,
    aborts: u32,
}

impl<S: SampleSource> SimTransferEngine<S> {
    /// Engine filling buffers from `source`
    #[must_use]
    pub const fn new(source: S) -> Self {
        Self {
            source,
            claim_fails: false,
            claimed: false,
            running: false,
            arms: 0,
            aborts: 0,
        }
    }

    /// Engine whose channel is already taken
    #[must_use]
    pub fn unavailable(source: S) -> Self {
        Self {
            claim_fails: true,
            ..Self::new(source)
        }
    }

    /// Channel was claimed
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        self.claimed
    }

    /// Sample trigger is on
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Transfers armed so far
    #[must_use]
    pub const fn arms(&self) -> u32 {
        self.arms
    }

    /// Aborts so far
    #[must_use]
    pub const fn aborts(&self) -> u32 {
        self.aborts
    }
}

impl<S: SampleSource> TransferEngine for SimTransferEngine<S> {
    fn claim(&mut self, rate: SampleRate) -> ConfigResult<()> {
        if self.claim_fails {
            return Err(ConfigError::ChannelUnavailable);
        }
        self.source.configure(rate)?;
        self.claimed = true;
        Ok(())
    }

    fn arm(&mut self, dest: &[AtomicU16]) {
        for slot in dest {
            slot.store(self.source.read(), Ordering::Relaxed);
        }
        self.arms += 1;
    }

    fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    fn abort(&mut self) {
        self.aborts += 1;
    }
}
