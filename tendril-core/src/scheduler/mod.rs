//! Host Scheduling
//!
//! Signal writes never run effects directly. They add effects to the
//! [`BatchQueue`] and ask the host for a *microtask*: a callback that runs
//! once the current synchronous call stack has unwound. The flush that
//! microtask performs runs every pending effect once.
//!
//! How "after the current turn" is realised depends on the host, so it is a
//! trait. Two hosts are provided:
//!
//! - [`LocalScheduler`] keeps its own microtask queue and a
//!   `futures` local pool. Nothing runs until [`Scheduler::run_until_stalled`]
//!   is called, which makes it deterministic and the default.
//! - [`TokioScheduler`] hands everything to `tokio::task::spawn_local`, for
//!   programs that already run inside a `LocalSet`.

mod batch;
mod local;
mod tokio_host;

pub(crate) use batch::{BatchQueue, FlushOutcome};
pub use local::LocalScheduler;
pub use tokio_host::TokioScheduler;

use futures::future::LocalBoxFuture;

/// A unit of deferred synchronous work.
pub type Microtask = Box<dyn FnOnce()>;

/// Where the runtime sends deferred work.
pub trait Scheduler {
    /// Run `task` after the current synchronous turn.
    fn queue_microtask(&self, task: Microtask);

    /// Drive `future` to completion on the current thread.
    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>);

    /// Run queued work until nothing can make progress.
    ///
    /// Hosts that drive themselves (an event loop, an async runtime) leave
    /// this as a no-op.
    fn run_until_stalled(&self) {}
}
