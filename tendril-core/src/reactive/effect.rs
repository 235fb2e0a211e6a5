//! Effect Implementation
//!
//! Effects are side-effecting computations that re-run when their
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs immediately.
//! 2. Every signal read during the run subscribes the effect.
//! 3. When a dependency changes, the effect is queued for the next flush.
//! 4. Before each re-run the old dependency edges are removed, so a branch
//!    that is no longer taken stops triggering the effect.
//!
//! # Async Effects
//!
//! An async effect returns a future. The synchronous part of the callback is
//! tracked like any other effect; the future is handed to the host scheduler
//! and keeps tracking reads on every poll for as long as it belongs to the
//! latest run. Once the effect re-runs or is disposed, the older future runs
//! untracked and its outcome is discarded.

use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::{FutureExt, LocalBoxFuture};

use crate::error::{panic_message, BoxError, EffectResult, ReactiveError};
use crate::graph::{EffectCallback, EffectId, EffectRun, OwnerId};

use super::context::{ContextFrame, ReactiveContext};
use super::runtime::{self, with_runtime};

/// Handle to a running effect.
///
/// Handles are plain ids; copying one does not keep the effect alive and
/// dropping one does not dispose it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle {
    id: EffectId,
}

impl EffectHandle {
    pub fn id(&self) -> EffectId {
        self.id
    }

    /// Deactivate the effect and remove every edge it has.
    ///
    /// Idempotent. An effect that is already queued for a flush is skipped.
    pub fn dispose(&self) {
        dispose_effect(self.id);
    }

    pub fn is_active(&self) -> bool {
        with_runtime(|rt| rt.graph.is_effect_active(self.id))
    }

    /// Number of signals read during the latest run.
    pub fn dependency_count(&self) -> usize {
        with_runtime(|rt| {
            rt.graph
                .effect(self.id)
                .map_or(0, |node| node.dependencies.len())
        })
    }

    /// How many times the callback has run.
    pub fn run_count(&self) -> u64 {
        with_runtime(|rt| rt.graph.effect(self.id).map_or(0, |node| node.run_count))
    }

    /// Run generation. Increases by one at the start of every run.
    pub fn version(&self) -> u64 {
        with_runtime(|rt| rt.graph.effect(self.id).map_or(0, |node| node.version))
    }

    /// Whether the effect is queued for the next flush.
    pub fn is_pending(&self) -> bool {
        with_runtime(|rt| rt.batch.is_pending(self.id))
    }
}

/// Create an effect that runs `f` now and again whenever a signal it read
/// changes.
///
/// Returns the handle and whether the first run read any signal. An effect
/// without dependencies never runs again.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = create_signal(0);
///
/// let (effect, tracked) = create_effect(move || {
///     println!("Count is: {}", count.get());
/// });
/// assert!(tracked);
///
/// set_count.set(5); // prints "Count is: 5" on the next tick
/// ```
pub fn create_effect<F, R>(mut f: F) -> (EffectHandle, bool)
where
    F: FnMut() -> R + 'static,
    R: EffectResult,
{
    spawn_effect(Box::new(move || EffectRun::Done(f().into_result())))
}

/// Create an effect whose callback returns a future.
///
/// Reads made by the callback before it returns its future are tracked, and
/// so are reads made while the future is polled, until a newer run starts.
pub fn create_async_effect<F, Fut>(mut f: F) -> (EffectHandle, bool)
where
    F: FnMut() -> Fut + 'static,
    Fut: Future + 'static,
    Fut::Output: EffectResult,
{
    spawn_effect(Box::new(move || {
        let future = f();
        EffectRun::Pending(Box::pin(async move { future.await.into_result() }))
    }))
}

fn spawn_effect(callback: EffectCallback) -> (EffectHandle, bool) {
    let owner = ReactiveContext::current_owner();
    let id = with_runtime(|rt| rt.graph.insert_effect(callback, owner));

    run_effect(id);

    let tracked = with_runtime(|rt| {
        rt.graph
            .effect(id)
            .is_some_and(|node| !node.dependencies.is_empty())
    });
    (EffectHandle { id }, tracked)
}

/// Run an effect once: drop its old edges, run the callback with the effect
/// as the tracking context, and report any failure.
///
/// Effects that were disposed, or that are already running further up the
/// stack, are skipped.
pub(crate) fn run_effect(id: EffectId) {
    let taken = with_runtime(|rt| {
        let catch_panics = rt.config.catch_panics;
        let node = rt.graph.effect_mut(id)?;
        if !node.active {
            return None;
        }
        let callback = node.callback.take()?;
        node.version += 1;
        node.run_count += 1;
        let (version, owner) = (node.version, node.owner);
        rt.graph.clear_dependencies(id);
        Some((callback, version, owner, catch_panics))
    });
    let Some((mut callback, version, owner, catch_panics)) = taken else {
        return;
    };

    let outcome = {
        let _ctx = ReactiveContext::enter(ContextFrame {
            effect: Some(id),
            owner,
        });
        if catch_panics {
            panic::catch_unwind(AssertUnwindSafe(&mut callback))
        } else {
            Ok(callback())
        }
    };

    // The effect may have been disposed by its own callback.
    let orphaned = with_runtime(|rt| match rt.graph.effect_mut(id) {
        Some(node) => {
            node.callback = Some(callback);
            None
        }
        None => Some(callback),
    });
    drop(orphaned);

    match outcome {
        Ok(EffectRun::Done(Ok(()))) => {}
        Ok(EffectRun::Done(Err(source))) => report_failure(id, source),
        Ok(EffectRun::Pending(future)) => {
            spawn_tracked(id, version, owner, future, catch_panics);
        }
        Err(payload) => report_panic(id, panic_message(&*payload)),
    }
}

pub(crate) fn dispose_effect(id: EffectId) {
    let removed = with_runtime(|rt| rt.graph.remove_effect(id));
    if removed.is_some() {
        tracing::trace!(?id, "effect disposed");
    }
    drop(removed);
}

/// Whether `version` is still the latest run of an active effect.
fn is_current(id: EffectId, version: u64) -> bool {
    with_runtime(|rt| {
        rt.graph
            .effect(id)
            .is_some_and(|node| node.active && node.version == version)
    })
}

fn report_failure(id: EffectId, source: BoxError) {
    let error = ReactiveError::EffectFailed {
        effect: format!("{id:?}"),
        source,
    };
    tracing::error!(error = %error, "effect failed");
}

fn report_panic(id: EffectId, message: String) {
    let error = ReactiveError::EffectPanicked {
        effect: format!("{id:?}"),
        message,
    };
    tracing::error!(error = %error, "effect panicked");
}

// ---------------------------------------------------------------------------
// Async runs
// ---------------------------------------------------------------------------

/// Polls an async run inside its effect's context while that run is the
/// latest one.
struct TrackedFuture {
    id: EffectId,
    version: u64,
    owner: Option<OwnerId>,
    inner: LocalBoxFuture<'static, Result<(), BoxError>>,
}

impl Future for TrackedFuture {
    type Output = Result<(), BoxError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let effect = is_current(self.id, self.version).then_some(self.id);
        let _ctx = ReactiveContext::enter(ContextFrame {
            effect,
            owner: self.owner,
        });
        self.inner.as_mut().poll(cx)
    }
}

fn spawn_tracked(
    id: EffectId,
    version: u64,
    owner: Option<OwnerId>,
    inner: LocalBoxFuture<'static, Result<(), BoxError>>,
    catch_panics: bool,
) {
    let tracked = TrackedFuture {
        id,
        version,
        owner,
        inner,
    };

    let task = async move {
        let outcome = if catch_panics {
            AssertUnwindSafe(tracked).catch_unwind().await
        } else {
            Ok(tracked.await)
        };

        if !is_current(id, version) {
            tracing::trace!(?id, version, "discarding superseded async effect outcome");
            return;
        }
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(source)) => report_failure(id, source),
            Err(payload) => report_panic(id, panic_message(&*payload)),
        }
    };

    runtime::scheduler().spawn_local(Box::pin(task));
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
