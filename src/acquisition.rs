//! Sample Acquisition
//!
//! Double-buffered sampling with two producer strategies behind one
//! [`Sampler`] interface:
//!
//! - [`PolledSampler`]: the consumer's own thread fills the write buffer in a
//!   blocking, deadline-timed loop inside `poll_ready`.
//! - [`DrivenSampler`]: a peripheral transfer fills buffers autonomously and
//!   its completion interrupt swaps them; `poll_ready` only inspects a flag.
//!
//! Both share [`AcquisitionCore`]: the two sample buffers, the [`Handoff`]
//! word, the run state and the performance counters. Everything in the core
//! is atomic so a Driven core can live in a `static` shared with an
//! interrupt handler.

pub mod driven;
pub mod handoff;
pub mod polled;

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};

pub use self::driven::{DrivenSampler, DrivenShared, TransferEngine};
pub use self::handoff::{BufferId, Handoff, Swap, Ticket};
pub use self::polled::{PolledSampler, SampleSource};

use crate::timing::smooth_rate;
use crate::types::{AcquisitionCounters, AcquisitionMode, AcquisitionStatus};

#[allow(clippy::declare_interior_mutable_const)]
const ZERO_SAMPLE: AtomicU16 = AtomicU16::new(0);

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const FAULT: u8 = 2;

/// Shared acquisition state: buffers, handoff, run state and counters
pub struct AcquisitionCore<const N: usize> {
    buffers: [[AtomicU16; N]; 2],
    handoff: Handoff,
    run_state: AtomicU8,
    total_samples: AtomicU32,
    measured_rate_bits: AtomicU32,
}

impl<const N: usize> AcquisitionCore<N> {
    /// Idle core with zeroed buffers
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffers: [[ZERO_SAMPLE; N], [ZERO_SAMPLE; N]],
            handoff: Handoff::new(),
            run_state: AtomicU8::new(IDLE),
            total_samples: AtomicU32::new(0),
            measured_rate_bits: AtomicU32::new(0),
        }
    }

    /// Handoff word
    #[must_use]
    pub fn handoff(&self) -> &Handoff {
        &self.handoff
    }

    /// Sample storage for one buffer
    #[must_use]
    pub fn buffer(&self, id: BufferId) -> &[AtomicU16; N] {
        &self.buffers[id.index()]
    }

    /// Buffer currently being filled
    #[must_use]
    pub fn write_buffer(&self) -> &[AtomicU16; N] {
        self.buffer(self.handoff.write_target())
    }

    /// Derived status
    #[must_use]
    pub fn status(&self) -> AcquisitionStatus {
        match self.run_state.load(Ordering::Acquire) {
            RUNNING if self.handoff.is_ready() => AcquisitionStatus::DataReady,
            RUNNING => AcquisitionStatus::Sampling,
            FAULT => AcquisitionStatus::Error,
            _ => AcquisitionStatus::Idle,
        }
    }

    /// Producer is active
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.run_state.load(Ordering::Acquire) == RUNNING
    }

    /// A transfer fault is latched
    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.run_state.load(Ordering::Acquire) == FAULT
    }

    pub(crate) fn set_running(&self) {
        self.run_state.store(RUNNING, Ordering::Release);
    }

    pub(crate) fn set_idle(&self) {
        self.run_state.store(IDLE, Ordering::Release);
    }

    pub(crate) fn set_fault(&self) {
        self.run_state.store(FAULT, Ordering::Release);
    }

    /// Prepare for a new run: drop stale data and zero the counters
    pub(crate) fn prepare_start(&self) {
        self.handoff.discard();
        self.reset_counters();
    }

    /// Producer: account for a filled buffer and flip the write target
    pub(crate) fn complete_fill(&self) -> Swap {
        self.total_samples
            .fetch_add(u32::try_from(N).unwrap_or(u32::MAX), Ordering::Relaxed);
        self.handoff.begin_swap()
    }

    /// Producer: fold a per-buffer rate measurement into the average
    pub(crate) fn record_rate(&self, measured_hz: f32) {
        let previous = f32::from_bits(self.measured_rate_bits.load(Ordering::Relaxed));
        let next = smooth_rate(previous, measured_hz);
        self.measured_rate_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    /// Borrow the ready buffer without copying
    #[must_use]
    pub fn take_ready(&self) -> Option<ReadyBuffer<'_, N>> {
        self.handoff.take().map(|ticket| ReadyBuffer {
            samples: self.buffer(ticket.buffer),
            ticket,
        })
    }

    /// Return a taken buffer; false if it was overwritten while held
    pub fn release(&self, buffer: ReadyBuffer<'_, N>) -> bool {
        self.handoff.release(buffer.ticket)
    }

    /// Counter snapshot
    #[must_use]
    pub fn counters(&self) -> AcquisitionCounters {
        AcquisitionCounters {
            total_samples: self.total_samples.load(Ordering::Relaxed),
            overruns: self.handoff.overruns(),
            measured_rate_hz: f32::from_bits(self.measured_rate_bits.load(Ordering::Relaxed)),
        }
    }

    /// Zero samples, overruns and the measured rate
    pub fn reset_counters(&self) {
        self.total_samples.store(0, Ordering::Relaxed);
        self.handoff.reset_overruns();
        self.measured_rate_bits.store(0.0f32.to_bits(), Ordering::Relaxed);
    }
}

impl<const N: usize> Default for AcquisitionCore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> core::fmt::Debug for AcquisitionCore<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AcquisitionCore")
            .field("status", &self.status())
            .field("write_target", &self.handoff.write_target())
            .field("counters", &self.counters())
            .finish_non_exhaustive()
    }
}

/// A completed buffer on loan to the consumer
///
/// Hand it back with [`Sampler::release`].
#[derive(Debug)]
pub struct ReadyBuffer<'a, const N: usize> {
    samples: &'a [AtomicU16; N],
    ticket: Ticket,
}

impl<'a, const N: usize> ReadyBuffer<'a, N> {
    /// Which physical buffer this is
    #[must_use]
    pub const fn id(&self) -> BufferId {
        self.ticket.buffer
    }

    /// Handoff ticket for this loan
    #[must_use]
    pub const fn ticket(&self) -> Ticket {
        self.ticket
    }

    /// Number of samples
    #[must_use]
    pub const fn len(&self) -> usize {
        N
    }

    /// Always false for a non-empty buffer size
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        N == 0
    }

    /// Sample at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<u16> {
        self.samples.get(index).map(|s| s.load(Ordering::Relaxed))
    }

    /// Iterate the samples in acquisition order
    pub fn iter(&self) -> impl Iterator<Item = u16> + 'a {
        self.samples.iter().map(|s| s.load(Ordering::Relaxed))
    }
}

/// Common interface of both acquisition strategies
pub trait Sampler<const N: usize> {
    /// Shared core
    fn core(&self) -> &AcquisitionCore<N>;

    /// Strategy in use
    fn mode(&self) -> AcquisitionMode;

    /// Begin continuous filling; resets counters. No-op when running or faulted.
    fn start(&mut self);

    /// Halt the producer and return to Idle. No-op when idle.
    fn stop(&mut self);

    /// True when a completed buffer can be taken
    fn poll_ready(&mut self) -> bool;

    /// Borrow the completed buffer
    fn take_ready_buffer(&self) -> Option<ReadyBuffer<'_, N>> {
        self.core().take_ready()
    }

    /// Return a taken buffer; false if the producer overwrote it meanwhile
    fn release(&self, buffer: ReadyBuffer<'_, N>) -> bool {
        self.core().release(buffer)
    }

    /// Current status
    fn status(&self) -> AcquisitionStatus {
        self.core().status()
    }

    /// Counter snapshot
    fn counters(&self) -> AcquisitionCounters {
        self.core().counters()
    }

    /// Zero the counters
    fn reset_counters(&self) {
        self.core().reset_counters();
    }
}

