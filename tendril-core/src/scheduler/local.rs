//! Deterministic single-threaded host.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

use super::{Microtask, Scheduler};

/// A host that runs nothing until asked.
///
/// Microtasks are kept in FIFO order and always drained before futures are
/// polled again, mirroring an event loop that empties its microtask queue
/// before taking the next macrotask.
///
/// # Example
///
/// ```rust,ignore
/// let (count, set_count) = create_signal(0);
/// create_effect(move || println!("{}", count.get()));
/// set_count.set(1);
/// tick(); // prints 1
/// ```
pub struct LocalScheduler {
    microtasks: RefCell<VecDeque<Microtask>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
}

impl LocalScheduler {
    pub fn new() -> Self {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        Self {
            microtasks: RefCell::new(VecDeque::new()),
            pool: RefCell::new(pool),
            spawner,
        }
    }

    /// Number of microtasks waiting to run.
    pub fn pending_microtasks(&self) -> usize {
        self.microtasks.borrow().len()
    }

    fn drain_microtasks(&self) {
        loop {
            // The queue must not stay borrowed while a task runs: tasks
            // queue further microtasks.
            let next = self.microtasks.borrow_mut().pop_front();
            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

impl Default for LocalScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalScheduler")
            .field("pending_microtasks", &self.pending_microtasks())
            .finish()
    }
}

impl Scheduler for LocalScheduler {
    fn queue_microtask(&self, task: Microtask) {
        self.microtasks.borrow_mut().push_back(task);
    }

    fn spawn_local(&self, future: LocalBoxFuture<'static, ()>) {
        if let Err(err) = self.spawner.spawn_local(future) {
            tracing::error!(error = %err, "local pool rejected a future");
        }
    }

    fn run_until_stalled(&self) {
        let Ok(mut pool) = self.pool.try_borrow_mut() else {
            tracing::warn!("run_until_stalled called re-entrantly; ignoring");
            return;
        };

        loop {
            self.drain_microtasks();
            pool.run_until_stalled();
            if self.microtasks.borrow().is_empty() {
                break;
            }
        }
    }
}
