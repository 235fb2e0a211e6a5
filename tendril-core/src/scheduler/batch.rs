//! Batch Queue
//!
//! The pending set of effects awaiting the next flush.
//!
//! # Algorithm
//!
//! 1. A signal write enqueues each active subscriber. Enqueuing an effect
//!    that is already pending keeps its original position.
//! 2. The first enqueue outside of a flush requests a microtask.
//! 3. The flush takes a snapshot of the pending set, clears it, and runs the
//!    snapshot in order.
//! 4. Effects enqueued while the flush runs are left for the next round,
//!    which the flush requests when it finishes.
//!
//! Chained rounds are counted. A graph whose effects keep writing signals
//! that wake each other would otherwise flush forever; past the configured
//! limit the pending effects are dropped and the caller reports an error.

use indexmap::IndexSet;

use crate::graph::EffectId;

/// What the caller should do after finishing a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushOutcome {
    /// Nothing is pending.
    Settled,

    /// Effects were enqueued during the flush; request another microtask.
    Reschedule,

    /// The round limit was hit and the pending effects were dropped.
    LimitExceeded { rounds: usize, dropped: usize },
}

#[derive(Debug, Default)]
pub(crate) struct BatchQueue {
    pending: IndexSet<EffectId>,
    flush_scheduled: bool,
    flushing: bool,
    rounds: usize,
}

impl BatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `effect` to the pending set.
    ///
    /// Returns `true` when the caller must request a flush microtask.
    pub fn enqueue(&mut self, effect: EffectId) -> bool {
        self.pending.insert(effect);
        if self.flush_scheduled || self.flushing {
            return false;
        }
        self.flush_scheduled = true;
        true
    }

    /// Start a flush: take the ordered snapshot of pending effects.
    pub fn begin_flush(&mut self) -> Vec<EffectId> {
        self.flush_scheduled = false;
        self.flushing = true;
        self.pending.drain(..).collect()
    }

    /// Finish a flush and decide whether another round is needed.
    pub fn end_flush(&mut self, max_rounds: usize) -> FlushOutcome {
        self.flushing = false;
        if self.pending.is_empty() {
            self.rounds = 0;
            return FlushOutcome::Settled;
        }

        self.rounds += 1;
        if self.rounds > max_rounds {
            let rounds = self.rounds;
            let dropped = self.pending.len();
            self.pending.clear();
            self.rounds = 0;
            return FlushOutcome::LimitExceeded { rounds, dropped };
        }

        self.flush_scheduled = true;
        FlushOutcome::Reschedule
    }

    /// The host scheduler is being replaced. Returns `true` when the new one
    /// has to be asked for a flush microtask.
    ///
    /// A running flush reschedules through whichever scheduler is installed
    /// when it ends, so nothing is transferred in that case.
    pub fn transfer_flush_request(&mut self) -> bool {
        if self.flushing || (!self.flush_scheduled && self.pending.is_empty()) {
            return false;
        }
        self.flush_scheduled = true;
        true
    }

    /// Leave the flushing state after a panic unwound through the flush.
    ///
    /// `unrun` is the part of the snapshot that never got to run; it goes
    /// back to the front of the pending set. Returns `true` when the caller
    /// must request a flush microtask for it.
    pub fn abort_flush(&mut self, unrun: &[EffectId]) -> bool {
        self.flushing = false;
        if !unrun.is_empty() {
            let queued = std::mem::take(&mut self.pending);
            self.pending = unrun.iter().copied().chain(queued).collect();
        }
        if self.pending.is_empty() {
            self.flush_scheduled = false;
            return false;
        }
        self.flush_scheduled = true;
        true
    }

    pub fn is_pending(&self, effect: EffectId) -> bool {
        self.pending.contains(&effect)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing
    }
}
