//! Peripheral-driven acquisition
//!
//! A hardware transfer fills the write buffer while the main context
//! processes the previous one. The transfer-complete interrupt calls
//! [`DrivenShared::on_transfer_complete`], which swaps buffers, arms the
//! next transfer into the new write target and only then signals readiness.
//!
//! [`DrivenShared`] is const-constructible so it can be a `static` reachable
//! from the interrupt handler. The transfer engine sits behind a
//! `critical_section::Mutex`; the sample path itself is lock-free.

use core::cell::RefCell;
use core::sync::atomic::AtomicU16;

use critical_section::Mutex;

use super::{AcquisitionCore, Sampler};
use crate::error::ConfigResult;
use crate::timing::{rate_from_interval, Timestamp};
use crate::types::{AcquisitionMode, SampleRate};

/// Hardware that moves converter results into memory on its own
pub trait TransferEngine {
    /// Reserve the transfer channel and configure pacing for `rate`
    ///
    /// On error nothing may be left running.
    fn claim(&mut self, rate: SampleRate) -> ConfigResult<()>;

    /// Start a transfer of `dest.len()` samples into `dest`
    fn arm(&mut self, dest: &[AtomicU16]);

    /// Start or stop the sample trigger
    fn set_running(&mut self, running: bool);

    /// Cancel any in-flight transfer
    fn abort(&mut self);
}

struct EngineSlot<T> {
    engine: T,
    last_completion: Option<Timestamp>,
}

/// State shared between the completion interrupt and [`DrivenSampler`]
pub struct DrivenShared<T, const N: usize> {
    core: AcquisitionCore<N>,
    slot: Mutex<RefCell<EngineSlot<T>>>,
}

impl<T: TransferEngine, const N: usize> DrivenShared<T, N> {
    /// Wrap an engine; usable in a `static` initializer
    #[must_use]
    pub const fn new(engine: T) -> Self {
        Self {
            core: AcquisitionCore::new(),
            slot: Mutex::new(RefCell::new(EngineSlot {
                engine,
                last_completion: None,
            })),
        }
    }

    /// Shared acquisition core
    #[must_use]
    pub fn core(&self) -> &AcquisitionCore<N> {
        &self.core
    }

    /// Run `f` with exclusive access to the engine
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|cs| f(&mut self.slot.borrow_ref_mut(cs).engine))
    }

    /// Completion interrupt: the write buffer is full
    ///
    /// Ignored unless running. Swaps buffers, arms the next transfer and
    /// publishes the filled buffer, in that order.
    pub fn on_transfer_complete(&self, now: Timestamp) {
        critical_section::with(|cs| {
            if !self.core.is_running() {
                return;
            }
            let mut slot = self.slot.borrow_ref_mut(cs);

            let swap = self.core.complete_fill();
            slot.engine.arm(self.core.buffer(swap.next_target));
            self.core.handoff().publish();

            if let Some(last) = slot.last_completion {
                if let Some(rate) = rate_from_interval(N, now.saturating_duration_since(last)) {
                    self.core.record_rate(rate);
                }
            }
            slot.last_completion = Some(now);

            if swap.overrun {
                debug!("overrun: buffer {} replaced unread frame", swap.filled);
            }
        });
    }

    /// Error interrupt: the transfer faulted
    ///
    /// Halts the peripheral, drops any pending frame and latches Error
    /// until stop/start.
    pub fn on_transfer_error(&self) {
        let faulted = critical_section::with(|cs| {
            if !self.core.is_running() {
                return false;
            }
            let mut slot = self.slot.borrow_ref_mut(cs);
            slot.engine.set_running(false);
            slot.engine.abort();
            self.core.set_fault();
            self.core.handoff().discard();
            true
        });
        if faulted {
            error!("acquisition transfer fault");
        }
    }
}

/// Driven acquisition over a shared, interrupt-visible engine
pub struct DrivenSampler<'a, T, const N: usize> {
    shared: &'a DrivenShared<T, N>,
}

impl<'a, T: TransferEngine, const N: usize> DrivenSampler<'a, T, N> {
    /// Claim the transfer channel; fails with `ChannelUnavailable` if taken
    pub fn init(shared: &'a DrivenShared<T, N>, rate: SampleRate) -> ConfigResult<Self> {
        shared.with_engine(|engine| engine.claim(rate))?;
        info!("driven acquisition ready: {} Hz, {} samples/buffer", rate.as_hz(), N);
        Ok(Self { shared })
    }

    /// Shared state
    #[must_use]
    pub fn shared(&self) -> &'a DrivenShared<T, N> {
        self.shared
    }
}

impl<T: TransferEngine, const N: usize> Sampler<N> for DrivenSampler<'_, T, N> {
    fn core(&self) -> &AcquisitionCore<N> {
        &self.shared.core
    }

    fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::Driven
    }

    fn start(&mut self) {
        let core = &self.shared.core;
        let started = critical_section::with(|cs| {
            if core.is_running() || core.is_faulted() {
                return false;
            }
            let mut slot = self.shared.slot.borrow_ref_mut(cs);
            core.prepare_start();
            slot.last_completion = None;
            slot.engine.arm(core.write_buffer());
            core.set_running();
            slot.engine.set_running(true);
            true
        });
        if started {
            info!("driven acquisition started");
        }
    }

    fn stop(&mut self) {
        let core = &self.shared.core;
        let stopped = critical_section::with(|cs| {
            if !core.is_running() && !core.is_faulted() {
                return false;
            }
            let mut slot = self.shared.slot.borrow_ref_mut(cs);
            slot.engine.set_running(false);
            slot.engine.abort();
            core.set_idle();
            core.handoff().discard();
            true
        });
        if stopped {
            info!("driven acquisition stopped");
        }
    }

    fn poll_ready(&mut self) -> bool {
        self.shared.core.is_running() && self.shared.core.handoff().is_ready()
    }
}
