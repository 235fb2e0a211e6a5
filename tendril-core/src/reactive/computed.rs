//! Computed Values
//!
//! A computed value is a cached derivation: an effect re-runs the
//! computation when its inputs change and stores the result in a backing
//! signal. The backing signal is only written when the result is not the
//! *same value* as the cached one, so readers of a computed value re-run
//! only when its output actually changed.
//!
//! Unlike a lazy memo, a computed value is eager. It recomputes in the
//! flush after its inputs change whether or not anyone reads it.

use std::fmt;
use std::rc::Rc;

use super::effect::{create_effect, EffectHandle};
use super::runtime::try_with_runtime;
use super::same_value::SameValue;
use super::signal::{create_signal, ReadSignal};

/// A cached derived value.
pub struct Computed<T: 'static> {
    inner: Rc<ComputedInner<T>>,
}

struct ComputedInner<T: 'static> {
    value: ReadSignal<Option<T>>,
    effect: EffectHandle,
}

impl<T: 'static> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        if try_with_runtime(|_| ()).is_some() {
            self.effect.dispose();
        }
    }
}

impl<T: 'static> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("signal", &self.inner.value.id())
            .field("effect", &self.inner.effect.id())
            .finish()
    }
}

/// Create a computed value from `f`.
///
/// `f` runs once immediately. The returned handle can be cloned freely; the
/// computation stops when the last clone is dropped or the owner it was
/// created under is disposed.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = create_signal(2);
/// let doubled = create_computed(move || count.get() * 2);
///
/// assert_eq!(doubled.get(), Some(4));
/// ```
pub fn create_computed<T, F>(mut f: F) -> Computed<T>
where
    T: SameValue + Clone + 'static,
    F: FnMut() -> T + 'static,
{
    let (value, set_value) = create_signal(None::<T>);
    let (effect, _) = create_effect(move || set_value.set(Some(f())));
    Computed {
        inner: Rc::new(ComputedInner { value, effect }),
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// The cached value. Subscribes the tracking effect.
    ///
    /// `None` until a computation has succeeded.
    pub fn get(&self) -> Option<T> {
        self.inner.value.get()
    }

    /// The cached value, without subscribing.
    pub fn get_untracked(&self) -> Option<T> {
        self.inner.value.get_untracked()
    }
}

impl<T: 'static> Computed<T> {
    /// Whether no computation has succeeded yet.
    pub fn is_stale(&self) -> bool {
        self.inner.value.with_untracked(Option::is_none)
    }

    /// Stop recomputing. The cached value stays readable.
    pub fn dispose(&self) {
        self.inner.effect.dispose();
    }

    /// The effect that drives the computation.
    pub fn effect(&self) -> EffectHandle {
        self.inner.effect
    }
}
