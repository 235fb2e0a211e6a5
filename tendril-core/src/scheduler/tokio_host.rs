//! Tokio-backed host.

use futures::future::LocalBoxFuture;

use super::{Microtask, Scheduler};

/// Sends microtasks and futures to `tokio::task::spawn_local`.
///
/// Must be used from inside a [`tokio::task::LocalSet`]; spawning outside one
/// panics. Tokio drives the work, so `run_until_stalled` is a no-op and
/// callers yield (for instance with `tokio::task::yield_now`) to let a flush
/// happen.
///
/// # Example
///
/// ```rust,ignore
/// let local = tokio::task::LocalSet::new();
/// local.run_until(async {
///     install_scheduler(Rc::new(TokioScheduler));
///     let (count, set_count) = create_signal(0);
///     create_effect(move || println!("{}", count.get()));
///     set_count.set(1);
///     tokio::task::yield_now().await;
/// }).await;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn queue_microtask(&self, task: Microtask) {
        tokio::task::spawn_local(async move { task() });
    }

    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>) {
        tokio::task::spawn_local(future);
    }
}
