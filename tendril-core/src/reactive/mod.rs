//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, effects, owners,
//! and the computed values and resources built on top of them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! while an effect is running, the signal records that effect as a
//! subscriber. When the signal is written with a different value, all
//! subscribers are queued to run again.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change. Effects are used to synchronize reactive state with
//! external systems, such as a widget tree or a log. Dependencies are
//! discovered again on every run, so conditional reads stay precise.
//!
//! ## Batching
//!
//! Writes never run effects directly. All effects woken in one synchronous
//! turn run together in a single flush, delivered by the host scheduler. An
//! effect that depends on two signals written back to back runs once.
//!
//! ## Owners
//!
//! An Owner is a disposal scope. Signals and effects created while an owner
//! is ambient are registered with it and torn down together, along with any
//! cleanup callbacks.
//!
//! ## Computed values and resources
//!
//! A [`Computed`] caches a derivation and only notifies readers when the
//! result changes. A [`Resource`] tracks an async fetch driven by a reactive
//! source, dropping responses from fetches that were superseded.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local context stack to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking effect and, if so, record the dependency in the arena.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod computed;
mod context;
mod effect;
mod owner;
mod registry;
mod resource;
pub(crate) mod runtime;
mod same_value;
mod signal;

pub use computed::{create_computed, Computed};
pub use context::{untrack, ContextFrame, ReactiveContext};
pub use effect::{create_async_effect, create_effect, EffectHandle};
pub use owner::{
    create_owner, current_owner, execute_mount_callbacks, on_cleanup, on_mount, run_with_owner,
    Owner,
};
pub use registry::{with_registry, NameRegistry, RegisteredSignal, SignalRegistry};
pub use resource::{create_resource, FetchInfo, Resource, ResourceActions, ResourceState};
pub use runtime::{
    configure, current_config, edges_consistent, install_scheduler, node_count,
    pending_effect_count, reset_runtime, tick,
};
pub use same_value::SameValue;
pub use signal::{create_signal, create_signal_with, ReadSignal, SignalOptions, WriteSignal};
