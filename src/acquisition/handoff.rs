//! Producer/consumer handoff word
//!
//! A single `AtomicU32` carries the whole cross-context protocol:
//!
//! ```text
//!  bit 0      write target (0 = A, 1 = B)
//!  bit 1      READY: the other buffer holds a complete, unread frame
//!  bits 2..   generation, bumped on every swap
//! ```
//!
//! The producer swaps in two steps, `begin_swap` then `publish`, so that a
//! Driven producer can arm the next transfer in between. The consumer
//! remembers the generation it took and `release` only clears READY if the
//! generation is unchanged; a changed generation means the taken buffer was
//! recycled as the write target while it was being read.

use core::sync::atomic::{fence, AtomicU32, Ordering};

const WRITE_B: u32 = 1;
const READY: u32 = 1 << 1;
const GEN_SHIFT: u32 = 2;
const GEN_ONE: u32 = 1 << GEN_SHIFT;

/// One of the two sample buffers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferId {
    /// First buffer
    A,
    /// Second buffer
    B,
}

impl BufferId {
    /// The other buffer
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }

    /// Array index of the buffer
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
        }
    }

    const fn from_state(state: u32) -> Self {
        if state & WRITE_B == 0 {
            Self::A
        } else {
            Self::B
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for BufferId {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::A => defmt::write!(f, "A"),
            Self::B => defmt::write!(f, "B"),
        }
    }
}

/// Result of the first half of a producer swap
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Swap {
    /// Buffer that was just filled and will become ready
    pub filled: BufferId,
    /// New write target
    pub next_target: BufferId,
    /// An unread ready buffer was discarded
    pub overrun: bool,
}

/// Snapshot of a ready buffer taken by the consumer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Buffer holding the ready frame
    pub buffer: BufferId,
    /// Generation at the time of taking
    pub generation: u32,
}

/// Atomic SPSC cell of depth one, overwriting on overrun
#[derive(Debug)]
pub struct Handoff {
    state: AtomicU32,
    overruns: AtomicU32,
}

impl Handoff {
    /// Write target A, nothing ready
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(0),
            overruns: AtomicU32::new(0),
        }
    }

    /// Buffer the producer is currently filling
    #[must_use]
    pub fn write_target(&self) -> BufferId {
        BufferId::from_state(self.state.load(Ordering::Acquire))
    }

    /// A complete frame is waiting
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) & READY != 0
    }

    /// Current generation
    #[must_use]
    pub fn generation(&self) -> u32 {
        self.state.load(Ordering::Acquire) >> GEN_SHIFT
    }

    /// Overruns since the last reset
    #[must_use]
    pub fn overruns(&self) -> u32 {
        self.overruns.load(Ordering::Relaxed)
    }

    /// Zero the overrun counter
    pub fn reset_overruns(&self) {
        self.overruns.store(0, Ordering::Relaxed);
    }

    /// Producer, step 1: flip the write target and withdraw any ready frame
    ///
    /// The filled buffer is not visible to the consumer until [`publish`].
    ///
    /// [`publish`]: Self::publish
    pub fn begin_swap(&self) -> Swap {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let next = ((current ^ WRITE_B) & !READY).wrapping_add(GEN_ONE);
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        // Sample stores into the new write target must not be observed ahead
        // of the generation bump.
        fence(Ordering::Release);

        let filled = BufferId::from_state(current);
        let overrun = current & READY != 0;
        if overrun {
            self.overruns.fetch_add(1, Ordering::Relaxed);
        }
        Swap {
            filled,
            next_target: filled.other(),
            overrun,
        }
    }

    /// Producer, step 2: mark the buffer filled in step 1 as ready
    pub fn publish(&self) {
        self.state.fetch_or(READY, Ordering::Release);
    }

    /// Consumer: snapshot the ready buffer, if any
    #[must_use]
    pub fn take(&self) -> Option<Ticket> {
        let state = self.state.load(Ordering::Acquire);
        (state & READY != 0).then(|| Ticket {
            buffer: BufferId::from_state(state).other(),
            generation: state >> GEN_SHIFT,
        })
    }

    /// Consumer: the producer has not swapped since `ticket` was taken
    #[must_use]
    pub fn is_intact(&self, ticket: Ticket) -> bool {
        fence(Ordering::Acquire);
        self.generation() == ticket.generation
    }

    /// Consumer: clear READY for a taken buffer
    ///
    /// Returns false, leaving the state untouched, if the producer swapped
    /// after the ticket was taken.
    pub fn release(&self, ticket: Ticket) -> bool {
        // Sample loads made while holding the buffer must complete before
        // the generation is checked.
        fence(Ordering::Acquire);
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            if current >> GEN_SHIFT != ticket.generation {
                return false;
            }
            match self.state.compare_exchange_weak(
                current,
                current & !READY,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Drop any ready frame and invalidate outstanding tickets
    ///
    /// The write target is kept.
    pub fn discard(&self) {
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let next = (current & !READY).wrapping_add(GEN_ONE);
            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for Handoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_swap_is_an_involution() {
        let h = Handoff::new();
        let start = h.write_target();
        h.begin_swap();
        assert_eq!(h.write_target(), start.other());
        h.begin_swap();
        assert_eq!(h.write_target(), start);
    }

    #[test]
    fn test_ready_buffer_is_the_filled_one() {
        let h = Handoff::new();
        let swap = h.begin_swap();
        assert!(!h.is_ready());
        h.publish();
        let ticket = h.take().unwrap();
        assert_eq!(ticket.buffer, swap.filled);
        assert_ne!(ticket.buffer, h.write_target());
    }

    #[test]
    fn test_stale_release_leaves_newer_frame() {
        let h = Handoff::new();
        h.begin_swap();
        h.publish();
        let old = h.take().unwrap();

        let swap = h.begin_swap();
        h.publish();
        assert!(swap.overrun);
        assert!(!h.release(old));
        assert!(h.is_ready());
        assert_eq!(h.take().unwrap().buffer, swap.filled);
    }

    #[test]
    fn test_discard_invalidates_ticket() {
        let h = Handoff::new();
        h.begin_swap();
        h.publish();
        let ticket = h.take().unwrap();
        h.discard();
        assert!(!h.is_ready());
        assert!(!h.is_intact(ticket));
        assert!(!h.release(ticket));
    }
}
