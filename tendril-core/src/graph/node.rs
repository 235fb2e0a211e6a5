//! Graph Nodes
//!
//! This module defines the node types that live in the dependency arena.
//! Nodes only hold edges and bookkeeping; signal values live with their
//! handles so that a value stays readable for as long as a handle exists.

use futures::future::LocalBoxFuture;
use indexmap::IndexSet;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::error::BoxError;

new_key_type! {
    /// Identifies a signal in the dependency arena.
    pub struct SignalId;

    /// Identifies an effect in the dependency arena.
    pub struct EffectId;

    /// Identifies an owner scope in the dependency arena.
    pub struct OwnerId;
}

/// The kind of node, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A source node. Has subscribers, never dependencies.
    Signal,

    /// A computation node. Has dependencies, never subscribers.
    Effect,

    /// A disposal scope. Has neither; it only aggregates.
    Owner,
}

/// What one execution of an effect callback produced.
pub(crate) enum EffectRun {
    /// The callback finished synchronously.
    Done(Result<(), BoxError>),

    /// The callback returned a future that still has to settle.
    Pending(LocalBoxFuture<'static, Result<(), BoxError>>),
}

pub(crate) type EffectCallback = Box<dyn FnMut() -> EffectRun>;

pub(crate) type LifecycleCallback = Box<dyn FnOnce() -> Result<(), BoxError>>;

/// A signal's edges.
#[derive(Debug, Default)]
pub(crate) struct SignalNode {
    /// Effects that read this signal during their latest run.
    pub subscribers: IndexSet<EffectId>,

    /// The owner the signal was created under.
    pub owner: Option<OwnerId>,
}

/// An effect's callback and edges.
pub(crate) struct EffectNode {
    /// Taken out while the callback runs so the arena is never borrowed
    /// across user code.
    pub callback: Option<EffectCallback>,

    /// Signals read during the latest run.
    pub dependencies: IndexSet<SignalId>,

    pub active: bool,

    /// Incremented at the start of every run. Async completions compare
    /// against it to detect that they were superseded.
    pub version: u64,

    pub run_count: u64,

    pub owner: Option<OwnerId>,
}

impl EffectNode {
    pub fn new(callback: EffectCallback, owner: Option<OwnerId>) -> Self {
        Self {
            callback: Some(callback),
            dependencies: IndexSet::new(),
            active: true,
            version: 0,
            run_count: 0,
            owner,
        }
    }
}

/// An owner's registries and lifecycle callbacks.
#[derive(Default)]
pub(crate) struct OwnerNode {
    pub signals: IndexSet<SignalId>,
    pub effects: IndexSet<EffectId>,
    pub mount_callbacks: SmallVec<[LifecycleCallback; 2]>,
    pub cleanup_callbacks: SmallVec<[LifecycleCallback; 4]>,
    pub mounted: bool,
}
