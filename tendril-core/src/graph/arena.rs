//! Dependency Arena
//!
//! Signals and effects reference each other in both directions: a signal
//! knows its subscribers so a write can notify them, an effect knows its
//! dependencies so a re-run can unsubscribe from all of them. Both sides are
//! stored here, keyed by slotmap ids, and every edge mutation goes through
//! [`Graph::link`] / [`Graph::unlink`] so the two sides never disagree.
//!
//! Removing a node severs all of its edges first. Stale ids (for a node that
//! has been removed) are ignored by every operation.

use slotmap::SlotMap;

use super::node::{
    EffectCallback, EffectId, EffectNode, NodeKind, OwnerId, OwnerNode, SignalId, SignalNode,
};

/// The arena holding every live signal, effect and owner on a thread.
#[derive(Default)]
pub(crate) struct Graph {
    signals: SlotMap<SignalId, SignalNode>,
    effects: SlotMap<EffectId, EffectNode>,
    owners: SlotMap<OwnerId, OwnerNode>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a signal, registering it with `owner` if given.
    pub fn insert_signal(&mut self, owner: Option<OwnerId>) -> SignalId {
        let owner = owner.filter(|id| self.owners.contains_key(*id));
        let id = self.signals.insert(SignalNode {
            owner,
            ..SignalNode::default()
        });
        if let Some(owner) = owner.and_then(|o| self.owners.get_mut(o)) {
            owner.signals.insert(id);
        }
        id
    }

    /// Add an effect, registering it with `owner` if given.
    pub fn insert_effect(&mut self, callback: EffectCallback, owner: Option<OwnerId>) -> EffectId {
        let owner = owner.filter(|id| self.owners.contains_key(*id));
        let id = self.effects.insert(EffectNode::new(callback, owner));
        if let Some(owner) = owner.and_then(|o| self.owners.get_mut(o)) {
            owner.effects.insert(id);
        }
        id
    }

    pub fn insert_owner(&mut self) -> OwnerId {
        self.owners.insert(OwnerNode::default())
    }

    pub fn signal(&self, id: SignalId) -> Option<&SignalNode> {
        self.signals.get(id)
    }

    pub fn effect(&self, id: EffectId) -> Option<&EffectNode> {
        self.effects.get(id)
    }

    pub fn effect_mut(&mut self, id: EffectId) -> Option<&mut EffectNode> {
        self.effects.get_mut(id)
    }

    pub fn owner(&self, id: OwnerId) -> Option<&OwnerNode> {
        self.owners.get(id)
    }

    pub fn owner_mut(&mut self, id: OwnerId) -> Option<&mut OwnerNode> {
        self.owners.get_mut(id)
    }

    /// Whether `id` names an effect that may still run.
    pub fn is_effect_active(&self, id: EffectId) -> bool {
        self.effects.get(id).is_some_and(|effect| effect.active)
    }

    /// Remove an effect: deactivate it, sever its dependency edges and detach
    /// it from its owner. The node is returned so its callback can be dropped
    /// after the arena is released.
    pub fn remove_effect(&mut self, id: EffectId) -> Option<EffectNode> {
        self.clear_dependencies(id);
        let mut node = self.effects.remove(id)?;
        node.active = false;
        if let Some(owner) = node.owner.and_then(|o| self.owners.get_mut(o)) {
            owner.effects.shift_remove(&id);
        }
        Some(node)
    }

    /// Remove a signal, severing its subscriber edges and detaching it from
    /// its owner.
    pub fn remove_signal(&mut self, id: SignalId) {
        self.clear_subscribers(id);
        if let Some(node) = self.signals.remove(id) {
            if let Some(owner) = node.owner.and_then(|o| self.owners.get_mut(o)) {
                owner.signals.shift_remove(&id);
            }
        }
    }

    /// Remove an owner node. Its registries are returned untouched; the
    /// caller is expected to have disposed it first.
    pub fn remove_owner(&mut self, id: OwnerId) -> Option<OwnerNode> {
        self.owners.remove(id)
    }

    /// Remove every node. Slots are freed one by one so their generations
    /// advance and ids handed out earlier never name a later node.
    ///
    /// Effect and owner nodes carry user callbacks; they are returned so the
    /// caller can drop them after the arena is released.
    pub fn clear(&mut self) -> (Vec<EffectNode>, Vec<OwnerNode>) {
        self.signals.drain().for_each(drop);
        let effects = self.effects.drain().map(|(_, node)| node).collect();
        let owners = self.owners.drain().map(|(_, node)| node).collect();
        (effects, owners)
    }

    /// Count live nodes of one kind.
    pub fn node_count(&self, kind: NodeKind) -> usize {
        match kind {
            NodeKind::Signal => self.signals.len(),
            NodeKind::Effect => self.effects.len(),
            NodeKind::Owner => self.owners.len(),
        }
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Record that `effect` read `signal`.
    pub fn link(&mut self, signal: SignalId, effect: EffectId) {
        let (Some(source), Some(target)) = (self.signals.get_mut(signal), self.effects.get_mut(effect))
        else {
            return;
        };
        source.subscribers.insert(effect);
        target.dependencies.insert(signal);
    }

    /// Remove the edge between `signal` and `effect` on both sides.
    pub fn unlink(&mut self, signal: SignalId, effect: EffectId) {
        if let Some(source) = self.signals.get_mut(signal) {
            source.subscribers.shift_remove(&effect);
        }
        if let Some(target) = self.effects.get_mut(effect) {
            target.dependencies.shift_remove(&signal);
        }
    }

    /// Drop every dependency edge of `effect`. Called before each re-run.
    pub fn clear_dependencies(&mut self, effect: EffectId) {
        let Some(node) = self.effects.get_mut(effect) else {
            return;
        };
        let dependencies = std::mem::take(&mut node.dependencies);
        for signal in dependencies {
            if let Some(source) = self.signals.get_mut(signal) {
                source.subscribers.shift_remove(&effect);
            }
        }
    }

    /// Drop every subscriber edge of `signal`.
    pub fn clear_subscribers(&mut self, signal: SignalId) {
        let Some(node) = self.signals.get_mut(signal) else {
            return;
        };
        let subscribers = std::mem::take(&mut node.subscribers);
        for effect in subscribers {
            if let Some(target) = self.effects.get_mut(effect) {
                target.dependencies.shift_remove(&signal);
            }
        }
    }

    /// Subscribers of `signal`, in subscription order.
    pub fn subscribers(&self, signal: SignalId) -> Vec<EffectId> {
        self.signals
            .get(signal)
            .map(|node| node.subscribers.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Check that every edge is recorded on both of its ends.
    pub fn edges_consistent(&self) -> bool {
        let forward = self.signals.iter().all(|(signal, node)| {
            node.subscribers.iter().all(|effect| {
                self.effects
                    .get(*effect)
                    .is_some_and(|e| e.dependencies.contains(&signal))
            })
        });
        let backward = self.effects.iter().all(|(effect, node)| {
            node.dependencies.iter().all(|signal| {
                self.signals
                    .get(*signal)
                    .is_some_and(|s| s.subscribers.contains(&effect))
            })
        });
        forward && backward
    }
}
