//! Resources
//!
//! A resource is an async value bound to a reactive source. Whenever the
//! source produces a new value, the fetcher is started and the resource
//! enters the loading state. When the fetch settles, the resource holds the
//! fetched data or the error.
//!
//! # Supersession
//!
//! Every fetch takes the next number from a generation counter. Only the
//! fetch holding the latest number may commit its outcome; older fetches
//! keep running to completion but their results are dropped. Responses that
//! arrive out of order therefore never overwrite newer data.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::rc::Rc;

use futures::future::FutureExt;

use crate::error::{panic_message, BoxError, FetchError};

use super::context::untrack;
use super::effect::create_effect;
use super::runtime::{self, with_runtime};
use super::same_value::SameValue;
use super::signal::{create_signal_raw, never_equal, ReadSignal, SignalOptions, WriteSignal};

/// Snapshot of a resource.
#[derive(Clone, Debug)]
pub struct ResourceState<T> {
    /// Data from the latest successful fetch, or from `mutate`.
    pub data: Option<T>,

    /// A fetch is in flight.
    pub loading: bool,

    /// Error from the latest fetch, if it failed.
    pub error: Option<FetchError>,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Extra information passed to the fetcher.
#[derive(Clone, Debug)]
pub struct FetchInfo<T> {
    /// The data held when the fetch started.
    pub value: Option<T>,

    /// The fetch was started by [`ResourceActions::refetch`].
    pub refetching: bool,
}

/// Read side of a resource.
pub struct Resource<T: 'static> {
    state: ReadSignal<ResourceState<T>>,
}

impl<T: 'static> Clone for Resource<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("signal", &self.state.id())
            .finish()
    }
}

impl<T: Clone + 'static> Resource<T> {
    /// The current data. Subscribes the tracking effect.
    pub fn get(&self) -> Option<T> {
        self.state.with(|state| state.data.clone())
    }

    /// The whole state. Subscribes the tracking effect.
    pub fn state(&self) -> ResourceState<T> {
        self.state.get()
    }
}

impl<T: 'static> Resource<T> {
    pub fn loading(&self) -> bool {
        self.state.with(|state| state.loading)
    }

    pub fn error(&self) -> Option<FetchError> {
        self.state.with(|state| state.error.clone())
    }
}

/// Write side of a resource.
pub struct ResourceActions<T: 'static> {
    refetch: Rc<dyn Fn()>,
    set_state: WriteSignal<ResourceState<T>>,
}

impl<T: 'static> Clone for ResourceActions<T> {
    fn clone(&self) -> Self {
        Self {
            refetch: self.refetch.clone(),
            set_state: self.set_state.clone(),
        }
    }
}

impl<T: 'static> fmt::Debug for ResourceActions<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceActions")
            .field("signal", &self.set_state.id())
            .finish()
    }
}

impl<T: 'static> ResourceActions<T> {
    /// Fetch again with the current source value.
    pub fn refetch(&self) {
        (self.refetch)();
    }

    /// Replace the data synchronously. A fetch already in flight is not
    /// cancelled and will still commit when it settles.
    pub fn mutate(&self, value: T) {
        self.set_state.set(ResourceState {
            data: Some(value),
            loading: false,
            error: None,
        });
    }
}

/// Create a resource that fetches with `fetcher` whenever `source` changes.
///
/// `source` is tracked like an effect body; a new fetch starts only when its
/// result is not the *same value* as the previous one. `fetcher` runs
/// untracked.
///
/// # Example
///
/// ```rust,ignore
/// let (user_id, set_user_id) = create_signal(1);
/// let (user, actions) = create_resource(
///     move || user_id.get(),
///     |id, _info| async move { load_user(id).await },
/// );
///
/// create_effect(move || {
///     if user.loading() {
///         println!("loading...");
///     } else if let Some(user) = user.get() {
///         println!("{user:?}");
///     }
/// });
/// ```
pub fn create_resource<S, T, E, Src, Fetch, Fut>(
    source: Src,
    fetcher: Fetch,
) -> (Resource<T>, ResourceActions<T>)
where
    S: SameValue + Clone + 'static,
    T: Clone + 'static,
    E: Into<BoxError> + 'static,
    Src: Fn() -> S + 'static,
    Fetch: Fn(S, FetchInfo<T>) -> Fut + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    // Every transition notifies, including loading -> loading.
    let (state, set_state) =
        create_signal_raw(ResourceState::default(), SignalOptions::default(), never_equal);
    let generation = Rc::new(Cell::new(0_u64));
    let source = Rc::new(source);

    let start: Rc<dyn Fn(S, bool)> = {
        let (state, set_state) = (state.clone(), set_state.clone());
        Rc::new(move |value: S, refetching: bool| {
            let fetch_id = generation.get() + 1;
            generation.set(fetch_id);

            let previous = state.with_untracked(|s| s.data.clone());
            set_state.set(ResourceState {
                data: previous.clone(),
                loading: true,
                error: None,
            });

            let future = untrack(|| {
                fetcher(
                    value,
                    FetchInfo {
                        value: previous,
                        refetching,
                    },
                )
            });
            spawn_fetch(
                fetch_id,
                generation.clone(),
                state.clone(),
                set_state.clone(),
                future,
            );
        })
    };

    let last_source: RefCell<Option<S>> = RefCell::new(None);
    {
        let (source, start) = (source.clone(), start.clone());
        create_effect(move || {
            let value = (*source)();
            let unchanged = last_source
                .borrow()
                .as_ref()
                .is_some_and(|previous| previous.same_value(&value));
            if unchanged {
                return;
            }
            *last_source.borrow_mut() = Some(value.clone());
            start(value, false);
        });
    }

    let refetch: Rc<dyn Fn()> = Rc::new(move || {
        let value = untrack(|| (*source)());
        start(value, true);
    });

    (Resource { state }, ResourceActions { refetch, set_state })
}

fn spawn_fetch<T, E, Fut>(
    fetch_id: u64,
    generation: Rc<Cell<u64>>,
    state: ReadSignal<ResourceState<T>>,
    set_state: WriteSignal<ResourceState<T>>,
    future: Fut,
) where
    T: Clone + 'static,
    E: Into<BoxError> + 'static,
    Fut: Future<Output = Result<T, E>> + 'static,
{
    let catch_panics = with_runtime(|rt| rt.config.catch_panics);

    let task = async move {
        let outcome = if catch_panics {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(outcome) => outcome.map_err(FetchError::new),
                Err(payload) => Err(FetchError::new(panic_message(&*payload))),
            }
        } else {
            future.await.map_err(FetchError::new)
        };

        if generation.get() != fetch_id {
            tracing::trace!(fetch_id, latest = generation.get(), "discarding superseded fetch");
            return;
        }

        let next = match outcome {
            Ok(data) => ResourceState {
                data: Some(data),
                loading: false,
                error: None,
            },
            Err(error) => {
                tracing::debug!(fetch_id, error = %error, "fetch failed");
                ResourceState {
                    data: state.with_untracked(|s| s.data.clone()),
                    loading: false,
                    error: Some(error),
                }
            }
        };
        set_state.set(next);
    };

    runtime::scheduler().spawn_local(Box::pin(task));
}
