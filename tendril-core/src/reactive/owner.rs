//! Owner Scopes
//!
//! An owner collects every signal and effect created while it is the
//! ambient owner, along with mount and cleanup callbacks, so that a whole
//! subtree of reactive state can be torn down in one call.
//!
//! ```rust,ignore
//! let owner = create_owner();
//! run_with_owner(&owner, || {
//!     let (count, _set_count) = create_signal(0);
//!     create_effect(move || println!("{}", count.get()));
//!     on_cleanup(|| println!("torn down"));
//! });
//! owner.dispose();
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use crate::error::{panic_message, EffectResult, ReactiveError};
use crate::graph::{LifecycleCallback, OwnerId};

use super::context::{untrack, ReactiveContext};
use super::runtime::{try_with_runtime, with_runtime};

/// A disposal scope.
///
/// Clones share the scope. Dropping the last clone disposes it.
#[derive(Clone)]
pub struct Owner {
    handle: Rc<OwnerHandle>,
}

struct OwnerHandle {
    id: OwnerId,
}

impl Drop for OwnerHandle {
    fn drop(&mut self) {
        if try_with_runtime(|_| ()).is_none() {
            tracing::trace!(id = ?self.id, "runtime busy or gone; owner not disposed");
            return;
        }
        dispose_owner(self.id);
        let node = with_runtime(|rt| rt.graph.remove_owner(self.id));
        drop(node);
    }
}

impl Owner {
    pub fn id(&self) -> OwnerId {
        self.handle.id
    }

    /// Run cleanup callbacks, then deactivate every effect and clear the
    /// subscribers of every signal created in this scope.
    ///
    /// Safe to call more than once. The owner can be used again afterwards.
    pub fn dispose(&self) {
        dispose_owner(self.id());
    }

    pub fn is_mounted(&self) -> bool {
        with_runtime(|rt| rt.graph.owner(self.id()).is_some_and(|node| node.mounted))
    }

    /// Number of live effects registered with this owner.
    pub fn effect_count(&self) -> usize {
        with_runtime(|rt| rt.graph.owner(self.id()).map_or(0, |node| node.effects.len()))
    }

    /// Number of live signals registered with this owner.
    pub fn signal_count(&self) -> usize {
        with_runtime(|rt| rt.graph.owner(self.id()).map_or(0, |node| node.signals.len()))
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner").field("id", &self.id()).finish()
    }
}

/// Create a new, empty owner.
pub fn create_owner() -> Owner {
    let id = with_runtime(|rt| rt.graph.insert_owner());
    Owner {
        handle: Rc::new(OwnerHandle { id }),
    }
}

/// Run `f` with `owner` as the ambient owner.
pub fn run_with_owner<R>(owner: &Owner, f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::owned_by(Some(owner.id()));
    f()
}

/// The ambient owner, if any.
pub fn current_owner() -> Option<OwnerId> {
    ReactiveContext::current_owner()
}

/// Register `f` to run when the ambient owner mounts.
///
/// If the owner is already mounted, `f` runs right away.
pub fn on_mount<F, R>(f: F)
where
    F: FnOnce() -> R + 'static,
    R: EffectResult,
{
    register(Hook::Mount, Box::new(move || f().into_result()));
}

/// Register `f` to run when the ambient owner is disposed.
pub fn on_cleanup<F, R>(f: F)
where
    F: FnOnce() -> R + 'static,
    R: EffectResult,
{
    register(Hook::Cleanup, Box::new(move || f().into_result()));
}

/// Mark `owner` as mounted and run its queued mount callbacks.
///
/// Only the first call per mount has an effect.
pub fn execute_mount_callbacks(owner: &Owner) {
    let id = owner.id();
    let taken = with_runtime(|rt| {
        let catch_panics = rt.config.catch_panics;
        let node = rt.graph.owner_mut(id)?;
        if node.mounted {
            return None;
        }
        node.mounted = true;
        Some((std::mem::take(&mut node.mount_callbacks), catch_panics))
    });
    let Some((callbacks, catch_panics)) = taken else {
        return;
    };

    tracing::debug!(?id, callbacks = callbacks.len(), "owner mounted");
    run_with_owner(owner, || {
        for callback in callbacks {
            untrack(|| run_lifecycle(Hook::Mount, callback, catch_panics));
        }
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hook {
    Mount,
    Cleanup,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::Mount => "on_mount",
            Hook::Cleanup => "on_cleanup",
        }
    }

    fn phase(self) -> &'static str {
        match self {
            Hook::Mount => "mount",
            Hook::Cleanup => "cleanup",
        }
    }
}

enum Registration {
    Queued,
    RunNow(LifecycleCallback, bool),
    Rejected(LifecycleCallback),
}

fn register(hook: Hook, callback: LifecycleCallback) {
    let Some(owner) = ReactiveContext::current_owner() else {
        reject(hook, callback);
        return;
    };

    let registration = with_runtime(|rt| {
        let catch_panics = rt.config.catch_panics;
        match rt.graph.owner_mut(owner) {
            None => Registration::Rejected(callback),
            Some(node) if hook == Hook::Mount && node.mounted => {
                Registration::RunNow(callback, catch_panics)
            }
            Some(node) => {
                match hook {
                    Hook::Mount => node.mount_callbacks.push(callback),
                    Hook::Cleanup => node.cleanup_callbacks.push(callback),
                }
                Registration::Queued
            }
        }
    });

    match registration {
        Registration::Queued => {}
        Registration::RunNow(callback, catch_panics) => {
            untrack(|| run_lifecycle(hook, callback, catch_panics));
        }
        Registration::Rejected(callback) => reject(hook, callback),
    }
}

fn reject(hook: Hook, callback: LifecycleCallback) {
    let error = ReactiveError::NoOwner { hook: hook.name() };
    tracing::warn!(error = %error, "callback dropped");
    drop(callback);
}

fn run_lifecycle(hook: Hook, callback: LifecycleCallback, catch_panics: bool) {
    let outcome = if catch_panics {
        panic::catch_unwind(AssertUnwindSafe(callback))
    } else {
        Ok(callback())
    };

    let message = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(error)) => error.to_string(),
        Err(payload) => panic_message(&*payload),
    };
    let error = ReactiveError::CallbackFailed {
        phase: hook.phase(),
        message,
    };
    tracing::error!(error = %error, "lifecycle callback failed");
}

pub(crate) fn dispose_owner(id: OwnerId) {
    let taken = with_runtime(|rt| {
        let catch_panics = rt.config.catch_panics;
        let node = rt.graph.owner_mut(id)?;
        let cleanups = std::mem::take(&mut node.cleanup_callbacks);
        let mounts = std::mem::take(&mut node.mount_callbacks);
        Some((cleanups, mounts, catch_panics))
    });
    let Some((cleanups, mounts, catch_panics)) = taken else {
        return;
    };
    drop(mounts);

    // Cleanups run under the owner, which still counts as mounted until
    // they are done.
    {
        let _ctx = ReactiveContext::owned_by(Some(id));
        for callback in cleanups {
            untrack(|| run_lifecycle(Hook::Cleanup, callback, catch_panics));
        }
    }

    let (removed, signals) = with_runtime(|rt| {
        let Some(node) = rt.graph.owner_mut(id) else {
            return (Vec::new(), 0);
        };
        node.mounted = false;
        let effects = std::mem::take(&mut node.effects);
        let signals = std::mem::take(&mut node.signals);

        let removed: Vec<_> = effects
            .into_iter()
            .filter_map(|effect| rt.graph.remove_effect(effect))
            .collect();
        for signal in &signals {
            rt.graph.clear_subscribers(*signal);
        }
        (removed, signals.len())
    });

    tracing::debug!(?id, effects = removed.len(), signals, "owner disposed");
    drop(removed);
}
