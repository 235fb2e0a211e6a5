//! Reactive Runtime
//!
//! The runtime is the per-thread coordinator that connects signals, effects
//! and owners. It holds the dependency arena, the batch queue, the host
//! scheduler, the configuration and the optional named-signal registry.
//!
//! # How It Works
//!
//! 1. Creating a signal, effect or owner inserts a node into the arena.
//!
//! 2. Reading a signal while an effect is tracking links the two nodes.
//!
//! 3. Writing a signal:
//!    a. Unlinks subscribers that are no longer active
//!    b. Enqueues the active ones on the batch queue
//!    c. Asks the host scheduler for a microtask if none is outstanding
//!
//! 4. The microtask flushes the batch, re-running each pending effect once.
//!
//! # Borrowing
//!
//! The runtime lives in a `RefCell`. It is only ever borrowed for short
//! bookkeeping sections and never while user code runs: callbacks are taken
//! out of the arena before they are invoked and values removed from it are
//! dropped after the borrow ends.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::RuntimeConfig;
use crate::error::ReactiveError;
use crate::graph::{EffectId, Graph, NodeKind, SignalId};
use crate::scheduler::{BatchQueue, FlushOutcome, LocalScheduler, Scheduler};

use super::effect::run_effect;
use super::registry::SignalRegistry;

/// State of the reactive system on one thread.
pub(crate) struct Runtime {
    pub graph: Graph,
    pub batch: BatchQueue,
    pub config: RuntimeConfig,
    pub scheduler: Rc<dyn Scheduler>,
    pub registry: Option<Rc<dyn SignalRegistry>>,
}

impl Runtime {
    fn new() -> Self {
        Self {
            graph: Graph::new(),
            batch: BatchQueue::new(),
            config: RuntimeConfig::default(),
            scheduler: Rc::new(LocalScheduler::new()),
            registry: None,
        }
    }
}

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

/// Borrow the runtime for a bookkeeping section.
pub(crate) fn with_runtime<R>(f: impl FnOnce(&mut Runtime) -> R) -> R {
    RUNTIME.with(|rt| f(&mut rt.borrow_mut()))
}

/// Like [`with_runtime`], but returns `None` instead of panicking when the
/// runtime is already borrowed or has been torn down with its thread. Used
/// from `Drop` impls.
pub(crate) fn try_with_runtime<R>(f: impl FnOnce(&mut Runtime) -> R) -> Option<R> {
    RUNTIME
        .try_with(|rt| rt.try_borrow_mut().ok().map(|mut rt| f(&mut rt)))
        .ok()
        .flatten()
}

/// The installed host scheduler.
pub(crate) fn scheduler() -> Rc<dyn Scheduler> {
    with_runtime(|rt| rt.scheduler.clone())
}

// ----------------------------------------------------------------------------
// Public control surface
// ----------------------------------------------------------------------------

/// Run the installed scheduler until no queued work can make progress.
///
/// With the default [`LocalScheduler`] this is what delivers flushes and
/// drives async effects and resource fetches.
pub fn tick() {
    scheduler().run_until_stalled();
}

/// Replace the host scheduler on this thread, returning the previous one.
///
/// Futures already spawned on the previous scheduler stay there. A flush
/// that was requested from it but has not run yet is requested again from
/// the new one.
pub fn install_scheduler(scheduler: Rc<dyn Scheduler>) -> Rc<dyn Scheduler> {
    let (previous, reissue) = with_runtime(|rt| {
        let previous = std::mem::replace(&mut rt.scheduler, scheduler.clone());
        (previous, rt.batch.transfer_flush_request())
    });
    if reissue {
        tracing::trace!("re-requesting pending flush on the new scheduler");
        scheduler.queue_microtask(Box::new(flush));
    }
    previous
}

/// Apply `config` to the runtime on this thread.
pub fn configure(config: RuntimeConfig) {
    with_runtime(|rt| rt.config = config);
}

/// The configuration in effect on this thread.
pub fn current_config() -> RuntimeConfig {
    with_runtime(|rt| rt.config.clone())
}

/// Number of effects waiting for the next flush.
pub fn pending_effect_count() -> usize {
    with_runtime(|rt| rt.batch.pending_len())
}

/// Number of live nodes of `kind` on this thread.
pub fn node_count(kind: NodeKind) -> usize {
    with_runtime(|rt| rt.graph.node_count(kind))
}

/// Whether every signal/effect edge is recorded on both of its ends.
pub fn edges_consistent() -> bool {
    with_runtime(|rt| rt.graph.edges_consistent())
}

/// Discard all reactive state on this thread and start over with the
/// default scheduler and configuration.
///
/// Handles created before the reset stay memory-safe but no longer react.
/// Their ids stay stale for good, so dropping or disposing one never touches
/// a node created after the reset. Meant for harnesses that reuse threads
/// between tests.
pub fn reset_runtime() {
    let discarded = with_runtime(|rt| {
        let nodes = rt.graph.clear();
        let batch = std::mem::take(&mut rt.batch);
        let scheduler = std::mem::replace(&mut rt.scheduler, Rc::new(LocalScheduler::new()));
        let registry = rt.registry.take();
        rt.config = RuntimeConfig::default();
        (nodes, batch, scheduler, registry)
    });
    drop(discarded);
}

// ----------------------------------------------------------------------------
// Propagation
// ----------------------------------------------------------------------------

/// Enqueue the active subscribers of `signal` after its value changed.
pub(crate) fn notify_subscribers(signal: SignalId) {
    let request = with_runtime(|rt| {
        let mut request = false;
        for effect in rt.graph.subscribers(signal) {
            if rt.graph.is_effect_active(effect) {
                request |= rt.batch.enqueue(effect);
            } else {
                rt.graph.unlink(signal, effect);
            }
        }
        request.then(|| rt.scheduler.clone())
    });

    if let Some(scheduler) = request {
        tracing::trace!(?signal, "scheduling flush");
        scheduler.queue_microtask(Box::new(flush));
    }
}

/// Drop a signal's node once its last handle is gone.
pub(crate) fn release_signal(signal: SignalId) {
    if try_with_runtime(|rt| rt.graph.remove_signal(signal)).is_none() {
        tracing::trace!(?signal, "runtime busy or gone; signal node not released");
    }
}

/// Puts the unrun part of the snapshot back on the queue if an effect panics
/// through the flush.
struct FlushGuard {
    snapshot: Vec<EffectId>,
    next: usize,
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        let unrun = &self.snapshot[self.next..];
        let request = try_with_runtime(|rt| {
            rt.batch
                .abort_flush(unrun)
                .then(|| rt.scheduler.clone())
        })
        .flatten();
        if let Some(scheduler) = request {
            scheduler.queue_microtask(Box::new(flush));
        }
    }
}

/// Run every pending effect once.
pub(crate) fn flush() {
    // A host that runs microtasks synchronously can land here from inside
    // an effect. The outer flush picks up whatever is pending.
    let snapshot = with_runtime(|rt| (!rt.batch.is_flushing()).then(|| rt.batch.begin_flush()));
    let Some(snapshot) = snapshot else {
        tracing::trace!("flush requested while flushing; deferred to the running flush");
        return;
    };
    tracing::debug!(effects = snapshot.len(), "flushing batch");

    let mut guard = FlushGuard { snapshot, next: 0 };
    while let Some(&effect) = guard.snapshot.get(guard.next) {
        guard.next += 1;
        run_effect(effect);
    }
    drop(guard);

    let (outcome, scheduler) = with_runtime(|rt| {
        (
            rt.batch.end_flush(rt.config.max_flush_rounds),
            rt.scheduler.clone(),
        )
    });

    match outcome {
        FlushOutcome::Settled => {}
        FlushOutcome::Reschedule => scheduler.queue_microtask(Box::new(flush)),
        FlushOutcome::LimitExceeded { rounds, dropped } => {
            let error = ReactiveError::FlushLimitExceeded { rounds };
            tracing::error!(error = %error, dropped, "reactive graph did not settle");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_effect, create_signal};
    use std::cell::Cell;

    #[test]
    fn writes_are_deferred_until_tick() {
        let (count, set_count) = create_signal(0);
        let seen = Rc::new(Cell::new(-1));
        let seen_c = seen.clone();
        create_effect(move || seen_c.set(count.get()));
        assert_eq!(seen.get(), 0);

        set_count.set(5);
        assert_eq!(seen.get(), 0);
        assert_eq!(pending_effect_count(), 1);

        tick();
        assert_eq!(seen.get(), 5);
        assert_eq!(pending_effect_count(), 0);
    }

    #[test]
    fn install_scheduler_returns_previous() {
        let custom: Rc<dyn Scheduler> = Rc::new(LocalScheduler::new());
        let previous = install_scheduler(custom.clone());
        let current = install_scheduler(previous);
        assert!(Rc::ptr_eq(&current, &custom));
    }

    #[test]
    fn writes_keep_flushing_after_a_scheduler_swap() {
        let (count, set_count) = create_signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_c = runs.clone();
        create_effect(move || {
            count.get();
            runs_c.set(runs_c.get() + 1);
        });

        set_count.set(1);
        install_scheduler(Rc::new(LocalScheduler::new()));
        set_count.set(2);
        tick();
        assert_eq!(runs.get(), 2);

        set_count.set(3);
        tick();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn stale_handles_do_not_touch_nodes_created_after_reset() {
        let (old, old_set) = create_signal(0);
        let (old_effect, _) = create_effect(move || {
            old.get();
        });
        let old_owner = crate::reactive::create_owner();
        reset_runtime();

        let (fresh, set_fresh) = create_signal(0);
        let runs = Rc::new(Cell::new(0));
        let (reader, runs_c) = (fresh.clone(), runs.clone());
        let (effect, _) = create_effect(move || {
            reader.get();
            runs_c.set(runs_c.get() + 1);
        });
        let owner = crate::reactive::create_owner();
        assert_ne!(old_effect.id(), effect.id());
        assert_ne!(old_owner.id(), owner.id());

        drop(old_set);
        old_effect.dispose();
        drop(old_owner);
        assert_eq!(fresh.subscriber_count(), 1);
        assert!(effect.is_active());
        assert_eq!(node_count(NodeKind::Owner), 1);

        set_fresh.set(1);
        tick();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn panicking_effect_leaves_the_rest_of_the_batch_queued() {
        configure(RuntimeConfig::default().with_catch_panics(false));
        let (count, set_count) = create_signal(0);
        let seen = Rc::new(Cell::new(0));

        let bomb = count.clone();
        create_effect(move || {
            if bomb.get() == 1 {
                panic!("effect panicked mid-flush");
            }
        });
        let seen_c = seen.clone();
        create_effect(move || seen_c.set(count.get()));

        set_count.set(1);
        let unwound = std::panic::catch_unwind(tick);
        assert!(unwound.is_err());
        assert_eq!(seen.get(), 0);
        assert_eq!(pending_effect_count(), 1);

        tick();
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn configure_round_trips() {
        configure(RuntimeConfig::default().with_max_flush_rounds(7));
        assert_eq!(current_config().max_flush_rounds, 7);
        reset_runtime();
        assert_eq!(current_config(), RuntimeConfig::default());
    }

    #[test]
    fn reset_drops_nodes() {
        let (count, _set_count) = create_signal(1);
        create_effect(move || {
            count.get();
        });
        assert_eq!(node_count(NodeKind::Effect), 1);

        reset_runtime();
        assert_eq!(node_count(NodeKind::Effect), 0);
        assert_eq!(node_count(NodeKind::Signal), 0);
    }
}
