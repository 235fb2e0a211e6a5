//! Dependency Graph
//!
//! This module implements the arena that records relationships between
//! signals, the effects that read them, and the owners that scope them.
//!
//! # Overview
//!
//! - Signal nodes hold their subscriber set.
//! - Effect nodes hold their callback and dependency set.
//! - Owner nodes hold the signals and effects created in their scope plus
//!   lifecycle callbacks.
//!
//! There is no garbage collector to break the signal/effect cycle, so every
//! edge is explicit and is torn down explicitly: when an effect re-runs, when
//! it is disposed, when an owner is disposed, or when the last handle to a
//! signal is dropped.
//!
//! # Design Decisions
//!
//! 1. Nodes are addressed by slotmap keys rather than `Rc` pointers. Keys are
//!    `Copy`, carry a generation, and go stale safely once a node is removed.
//!
//! 2. Both directions of every edge are stored (subscribers on the signal,
//!    dependencies on the effect) so either side can be torn down in time
//!    proportional to its own degree.
//!
//! 3. Edge sets are `IndexSet`s so notification order is deterministic.

mod arena;
mod node;

pub(crate) use arena::Graph;
pub(crate) use node::{EffectCallback, EffectRun, LifecycleCallback};
pub use node::{EffectId, NodeKind, OwnerId, SignalId};
