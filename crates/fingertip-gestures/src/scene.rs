#![forbid(unsafe_code)]

//! Scene hierarchy and the node → gesture registry.
//!
//! The host mirrors the parts of its scene graph that carry gestures or are
//! hit by layers. Arbitration only needs two queries: the ancestor chain of a
//! node and whether a node is active in the hierarchy.
//!
//! # Invariants
//!
//! 1. The parent relation is acyclic.
//! 2. Each node keeps its gestures in attach order.

use ahash::AHashMap;
use fingertip_core::NodeId;

use crate::error::GestureError;
use crate::gesture::GestureHandle;

#[derive(Debug, Clone, Default)]
struct SceneNode {
    parent: Option<NodeId>,
    active: bool,
    gestures: Vec<GestureHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneTree {
    nodes: AHashMap<NodeId, SceneNode>,
}

impl SceneTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` under `parent` (or as a root). Re-adding a node
    /// re-parents it and keeps its gestures.
    pub fn add_node(&mut self, node: NodeId, parent: Option<NodeId>) -> Result<(), GestureError> {
        if let Some(parent) = parent {
            if !self.nodes.contains_key(&parent) {
                return Err(GestureError::UnknownNode(parent));
            }
            if parent == node || self.has_ancestor(parent, node) {
                return Err(GestureError::HierarchyCycle { node, parent });
            }
        }
        self.nodes
            .entry(node)
            .and_modify(|n| n.parent = parent)
            .or_insert(SceneNode {
                parent,
                active: true,
                gestures: Vec::new(),
            });
        Ok(())
    }

    /// Remove a node; its children move up to its parent. Returns the gestures that
    /// were attached to it.
    pub fn remove_node(&mut self, node: NodeId) -> Option<Vec<GestureHandle>> {
        let removed = self.nodes.remove(&node)?;
        for child in self.nodes.values_mut() {
            if child.parent == Some(node) {
                child.parent = removed.parent;
            }
        }
        Some(removed.gestures)
    }

    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    pub fn set_active(&mut self, node: NodeId, active: bool) -> Result<(), GestureError> {
        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(GestureError::UnknownNode(node))?;
        entry.active = active;
        Ok(())
    }

    /// The node and all of its ancestors are active.
    #[must_use]
    pub fn is_active_in_hierarchy(&self, node: NodeId) -> bool {
        self.contains(node)
            && self
                .ancestors(node)
                .all(|n| self.nodes.get(&n).is_some_and(|entry| entry.active))
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn has_ancestor(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).skip(1).any(|n| n == ancestor)
    }

    /// `node`, then its parent, up to the root.
    pub fn ancestors(&self, node: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.contains(node).then_some(node),
        }
    }

    /// Gestures attached to `node`, in attach order.
    #[must_use]
    pub fn gestures(&self, node: NodeId) -> &[GestureHandle] {
        self.nodes.get(&node).map_or(&[][..], |n| n.gestures.as_slice())
    }

    pub(crate) fn attach(&mut self, node: NodeId, gesture: GestureHandle) -> Result<(), GestureError> {
        let entry = self
            .nodes
            .get_mut(&node)
            .ok_or(GestureError::UnknownNode(node))?;
        entry.gestures.push(gesture);
        Ok(())
    }

    pub(crate) fn detach(&mut self, node: NodeId, gesture: GestureHandle) {
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.gestures.retain(|g| *g != gesture);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Iterator over a node's ancestor chain, the node itself first.
#[derive(Debug, Clone)]
pub struct Ancestors<'a> {
    tree: &'a SceneTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
