//! Named Signal Registry
//!
//! A signal created with a name is announced to the registry installed for
//! the current scope, exactly once. Consumers such as a renderer use this to
//! read a whole set of named values back in one pass.

use std::any::{type_name, Any};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::graph::SignalId;

use super::runtime::{try_with_runtime, with_runtime};
use super::signal::ReadSignal;

/// Receives named signals as they are created.
pub trait SignalRegistry {
    fn register(&self, name: &str, signal: RegisteredSignal);
}

/// A type-erased read handle to a named signal.
#[derive(Clone)]
pub struct RegisteredSignal {
    id: SignalId,
    type_name: &'static str,
    handle: Rc<dyn Any>,
}

impl RegisteredSignal {
    pub(crate) fn new<T: 'static>(signal: ReadSignal<T>) -> Self {
        Self {
            id: signal.id(),
            type_name: type_name::<T>(),
            handle: Rc::new(signal),
        }
    }

    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Name of the value type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Recover the typed read handle. `None` if `T` is not the value type.
    pub fn downcast<T: 'static>(&self) -> Option<ReadSignal<T>> {
        self.handle.downcast_ref::<ReadSignal<T>>().cloned()
    }
}

impl fmt::Debug for RegisteredSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredSignal")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Restores the previously installed registry.
struct RegistryScope {
    previous: Option<Rc<dyn SignalRegistry>>,
}

impl Drop for RegistryScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The scoped registry may own signal handles; drop it after the
        // runtime is released.
        let scoped = try_with_runtime(|rt| std::mem::replace(&mut rt.registry, previous));
        drop(scoped);
    }
}

/// Run `f` with `registry` receiving every named signal created inside it.
pub fn with_registry<R>(registry: Rc<dyn SignalRegistry>, f: impl FnOnce() -> R) -> R {
    let previous = with_runtime(|rt| rt.registry.replace(registry));
    let _scope = RegistryScope { previous };
    f()
}

/// Registry that keeps named signals in creation order.
///
/// A name registered twice keeps its original position and points at the
/// newer signal.
#[derive(Default)]
pub struct NameRegistry {
    entries: RefCell<IndexMap<String, RegisteredSignal>>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of the signal registered as `name`, read untracked.
    pub fn get<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.signal::<T>(name).map(|signal| signal.get_untracked())
    }

    /// Typed read handle for `name`.
    pub fn signal<T: 'static>(&self, name: &str) -> Option<ReadSignal<T>> {
        self.entries.borrow().get(name)?.downcast::<T>()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl SignalRegistry for NameRegistry {
    fn register(&self, name: &str, signal: RegisteredSignal) {
        let replaced = self.entries.borrow_mut().insert(name.to_string(), signal);
        if replaced.is_some() {
            tracing::debug!(name, "named signal re-registered");
        }
    }
}

impl fmt::Debug for NameRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_signal, create_signal_with, SignalOptions};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    struct Counting {
        calls: Cell<usize>,
    }

    impl SignalRegistry for Counting {
        fn register(&self, _name: &str, _signal: RegisteredSignal) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[test]
    fn named_signals_register_once() {
        let counting = Rc::new(Counting { calls: Cell::new(0) });

        let (_, set_count) = with_registry(counting.clone(), || {
            let pair = create_signal_with(0, SignalOptions::named("count"));
            let _unnamed = create_signal(1);
            pair
        });
        set_count.set(1);
        set_count.set(2);

        assert_eq!(counting.calls.get(), 1);
    }

    #[test]
    fn without_registry_names_are_ignored() {
        let (count, _) = create_signal_with(5, SignalOptions::named("count"));
        assert_eq!(count.get(), 5);
    }

    #[test]
    fn registry_is_scoped() {
        let registry = Rc::new(NameRegistry::new());
        with_registry(registry.clone(), || {
            create_signal_with(1, SignalOptions::named("inside"));
        });
        create_signal_with(2, SignalOptions::named("outside"));

        assert_eq!(registry.names(), vec!["inside".to_string()]);
    }

    #[test]
    fn read_back_by_name() {
        let registry = Rc::new(NameRegistry::new());
        let set_title = with_registry(registry.clone(), || {
            let (_, set_title) =
                create_signal_with(String::from("draft"), SignalOptions::named("title"));
            create_signal_with(3_u32, SignalOptions::named("retries"));
            set_title
        });

        set_title.set(String::from("final"));

        assert_eq!(registry.get::<String>("title"), Some(String::from("final")));
        assert_eq!(registry.get::<u32>("retries"), Some(3));
        assert_eq!(registry.get::<i64>("retries"), None);
        assert_eq!(registry.get::<u32>("missing"), None);
        assert_eq!(registry.len(), 2);
    }
}
