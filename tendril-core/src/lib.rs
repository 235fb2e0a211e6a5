//! Tendril Core
//!
//! This crate provides the fine-grained reactive runtime that the Tendril
//! declarative UI layer is built on. It implements:
//!
//! - Reactive primitives (signals, effects, computed values, resources)
//! - Owner scopes with mount and cleanup lifecycles
//! - A dependency arena with explicit, bidirectional edges
//! - Batched propagation delivered through a pluggable host scheduler
//!
//! The runtime is single-threaded. Every thread has its own runtime and no
//! handle is `Send`.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Reactive primitives and dependency tracking
//! - `graph`: The dependency arena (node ids and edges)
//! - `scheduler`: Batch queue and host scheduler implementations
//! - `error`: Error types reported by the runtime
//! - `config`: Runtime configuration
//!
//! # Example
//!
//! ```rust,ignore
//! use tendril_core::{create_computed, create_effect, create_signal, tick};
//!
//! // Create a signal
//! let (count, set_count) = create_signal(0);
//!
//! // Create a derived value
//! let doubled = create_computed(move || count.get() * 2);
//!
//! // Create an effect
//! create_effect(move || {
//!     println!("Doubled: {:?}", doubled.get());
//! });
//!
//! // Update the signal, then let the scheduler flush
//! set_count.set(5);
//! tick();
//! // Prints: "Doubled: Some(10)"
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;
pub mod scheduler;

pub use config::RuntimeConfig;
pub use error::{BoxError, EffectResult, FetchError, ReactiveError};
pub use reactive::{
    configure, create_async_effect, create_computed, create_effect, create_owner,
    create_resource, create_signal, create_signal_with, current_config, current_owner,
    execute_mount_callbacks, install_scheduler, on_cleanup, on_mount, reset_runtime,
    run_with_owner, tick, untrack, with_registry, Computed, EffectHandle, FetchInfo,
    NameRegistry, Owner, ReadSignal, Resource, ResourceActions, ResourceState, SameValue,
    SignalOptions, SignalRegistry, WriteSignal,
};
pub use scheduler::{LocalScheduler, Scheduler, TokioScheduler};
