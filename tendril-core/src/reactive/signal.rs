//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which effects depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read while an effect is tracking, the signal and the
//!    effect are linked in the dependency arena (both directions).
//!
//! 2. When a signal is written with a value that is not the *same value*
//!    as the current one, every active subscriber is enqueued for the next
//!    flush. Subscribers that are no longer active are unlinked on the spot.
//!
//! 3. Writes never run effects synchronously.
//!
//! # Memory Layout
//!
//! The value lives in an `Rc` shared by the read and write handles, not in
//! the arena. The arena node only holds the subscriber edges. When the last
//! handle is dropped the node is removed and its edges severed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::ReactiveError;
use crate::graph::SignalId;

use super::context::ReactiveContext;
use super::registry::RegisteredSignal;
use super::runtime::{self, with_runtime};
use super::same_value::SameValue;

/// Options accepted by [`create_signal_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalOptions {
    /// Register the signal under this name with the active registry.
    pub name: Option<String>,
}

impl SignalOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Storage shared by the handles of one signal.
struct SignalCell<T> {
    id: SignalId,
    value: RefCell<T>,
    equals: fn(&T, &T) -> bool,
}

impl<T> Drop for SignalCell<T> {
    fn drop(&mut self) {
        runtime::release_signal(self.id);
    }
}

/// Equality for signals whose writes must always notify.
pub(crate) fn never_equal<T>(_: &T, _: &T) -> bool {
    false
}

// ---------------------------------------------------------------------------
// Signal creation
// ---------------------------------------------------------------------------

/// Create a reactive signal with the given initial value.
///
/// Returns a `(ReadSignal<T>, WriteSignal<T>)` pair. Reading inside an
/// effect subscribes that effect to changes.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = create_signal(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (subscribers run on the next flush)
/// set_count.set(5);
/// ```
pub fn create_signal<T: SameValue + 'static>(initial: T) -> (ReadSignal<T>, WriteSignal<T>) {
    create_signal_with(initial, SignalOptions::default())
}

/// Create a signal with options.
///
/// A named signal is handed to the registry installed with
/// [`with_registry`](super::with_registry), once, at creation. Without a
/// registry the name is ignored.
pub fn create_signal_with<T: SameValue + 'static>(
    initial: T,
    options: SignalOptions,
) -> (ReadSignal<T>, WriteSignal<T>) {
    create_signal_raw(initial, options, T::same_value)
}

/// Create a signal with an explicit equality function.
pub(crate) fn create_signal_raw<T: 'static>(
    initial: T,
    options: SignalOptions,
    equals: fn(&T, &T) -> bool,
) -> (ReadSignal<T>, WriteSignal<T>) {
    let owner = ReactiveContext::current_owner();
    let (id, registry) = with_runtime(|rt| (rt.graph.insert_signal(owner), rt.registry.clone()));

    let cell = Rc::new(SignalCell {
        id,
        value: RefCell::new(initial),
        equals,
    });
    let read = ReadSignal { cell: cell.clone() };
    let write = WriteSignal { cell };

    if let (Some(name), Some(registry)) = (options.name, registry) {
        registry.register(&name, RegisteredSignal::new(read.clone()));
    }

    (read, write)
}

// ---------------------------------------------------------------------------
// ReadSignal
// ---------------------------------------------------------------------------

/// Read half of a signal.
pub struct ReadSignal<T: 'static> {
    cell: Rc<SignalCell<T>>,
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadSignal")
            .field("id", &self.cell.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T: 'static> ReadSignal<T> {
    /// The signal's arena id.
    pub fn id(&self) -> SignalId {
        self.cell.id
    }

    /// Read the current value, subscribing the tracking effect (if any).
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.with(T::clone)
    }

    /// Read by reference without cloning. Still subscribes the tracking
    /// effect.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.cell.value.borrow())
    }

    /// Read without tracking.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// Read by reference without tracking.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.cell.value.borrow())
    }

    /// Number of effects currently subscribed.
    pub fn subscriber_count(&self) -> usize {
        with_runtime(|rt| {
            rt.graph
                .signal(self.cell.id)
                .map_or(0, |node| node.subscribers.len())
        })
    }

    fn track(&self) {
        if let Some(effect) = ReactiveContext::current_effect() {
            with_runtime(|rt| rt.graph.link(self.cell.id, effect));
        }
    }
}

// ---------------------------------------------------------------------------
// WriteSignal
// ---------------------------------------------------------------------------

/// Write half of a signal.
pub struct WriteSignal<T: 'static> {
    cell: Rc<SignalCell<T>>,
}

impl<T: 'static> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteSignal")
            .field("id", &self.cell.id)
            .finish()
    }
}

impl<T: 'static> WriteSignal<T> {
    /// The signal's arena id.
    pub fn id(&self) -> SignalId {
        self.cell.id
    }

    /// Store `value` and notify subscribers, unless it is the same value as
    /// the current one.
    pub fn set(&self, value: T) {
        let replaced = match self.cell.value.try_borrow_mut() {
            Ok(mut slot) => {
                if (self.cell.equals)(&slot, &value) {
                    return;
                }
                Some(std::mem::replace(&mut *slot, value))
            }
            Err(_) => {
                let error = ReactiveError::SignalBusy {
                    signal: format!("{:?}", self.cell.id),
                };
                tracing::warn!(error = %error, "write dropped");
                None
            }
        };

        // The old value is dropped outside of the borrow.
        if replaced.is_some() {
            drop(replaced);
            runtime::notify_subscribers(self.cell.id);
        }
    }

    /// Compute the next value from the current one, then [`set`](Self::set)
    /// it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = {
            let current = self.cell.value.borrow();
            f(&current)
        };
        self.set(next);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_effect, runtime::tick};
    use std::cell::Cell;

    #[test]
    fn signal_get_and_set() {
        let (signal, set_signal) = create_signal(0);
        assert_eq!(signal.get(), 0);

        set_signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let (signal, set_signal) = create_signal(10);
        set_signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn signal_with() {
        let (signal, _set_signal) = create_signal(String::from("hello"));
        assert_eq!(signal.with(|s| s.len()), 5);
    }

    #[test]
    fn read_tracks_only_inside_effects() {
        let (signal, _set_signal) = create_signal(1);
        signal.get();
        assert_eq!(signal.subscriber_count(), 0);

        let reader = signal.clone();
        create_effect(move || {
            reader.get();
        });
        assert_eq!(signal.subscriber_count(), 1);
    }

    #[test]
    fn get_untracked_does_not_subscribe() {
        let (signal, set_signal) = create_signal(0);
        let runs = Rc::new(Cell::new(0));
        let runs_c = runs.clone();
        let reader = signal.clone();
        create_effect(move || {
            let _ = reader.get_untracked();
            runs_c.set(runs_c.get() + 1);
        });

        set_signal.set(1);
        tick();
        assert_eq!(runs.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn equal_write_schedules_nothing() {
        let (signal, set_signal) = create_signal(f64::NAN);
        let runs = Rc::new(Cell::new(0));
        let runs_c = runs.clone();
        create_effect(move || {
            signal.get();
            runs_c.set(runs_c.get() + 1);
        });

        set_signal.set(f64::NAN);
        assert_eq!(runtime::pending_effect_count(), 0);
        tick();
        assert_eq!(runs.get(), 1);

        set_signal.set(-0.0);
        set_signal.set(0.0);
        tick();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn write_during_with_is_dropped() {
        let (signal, set_signal) = create_signal(1);
        signal.with(|_| set_signal.set(2));
        assert_eq!(signal.get(), 1);
    }

    #[test]
    fn clone_shares_state() {
        let (read1, write1) = create_signal(0);
        let read2 = read1.clone();
        let write2 = write1.clone();

        write1.set(42);
        assert_eq!(read2.get(), 42);

        write2.set(100);
        assert_eq!(read1.get(), 100);
        assert_eq!(read1.id(), write2.id());
    }

    #[test]
    fn signal_ids_are_unique() {
        let (s1, _) = create_signal(0);
        let (s2, _) = create_signal(0);
        let (s3, _) = create_signal(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }

    #[test]
    fn dropping_all_handles_releases_the_node() {
        use crate::graph::NodeKind;

        let before = runtime::node_count(NodeKind::Signal);
        let (signal, set_signal) = create_signal(0);
        assert_eq!(runtime::node_count(NodeKind::Signal), before + 1);

        drop(signal);
        assert_eq!(runtime::node_count(NodeKind::Signal), before + 1);
        drop(set_signal);
        assert_eq!(runtime::node_count(NodeKind::Signal), before);
    }

    #[test]
    fn debug_output() {
        let (read, write) = create_signal(42);
        assert!(format!("{read:?}").contains("ReadSignal"));
        assert!(format!("{write:?}").contains("WriteSignal"));
    }
}
