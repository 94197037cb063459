#![forbid(unsafe_code)]

//! Gesture output.
//!
//! The manager appends a [`GestureEvent`] for every state-change request and
//! for every recognizer-specific notification. Hosts drain them once per
//! frame, typically after [`TouchManager::update`](fingertip_core::TouchManager::update).

use std::time::Duration;

use ahash::AHashMap;
use fingertip_core::{NodeId, Vec2, Vec3};

use crate::gesture::GestureHandle;
use crate::state::GestureState;
use crate::transform_math::TransformDelta;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEventKind {
    /// Emitted for every state-change request, including rejected ones.
    StateChanged {
        previous: GestureState,
        requested: GestureState,
        current: GestureState,
    },
    Tapped { position: Vec2 },
    Pressed { position: Vec2 },
    Released { position: Vec2 },
    LongPressed { position: Vec2 },
    Flicked { vector: Vec2, duration: Duration },
    TransformStarted,
    Transformed(TransformDelta),
    TransformCompleted,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureEvent {
    pub gesture: GestureHandle,
    pub node: NodeId,
    pub kind: GestureEventKind,
}

impl GestureEvent {
    /// The new state, for state-change events that moved the gesture.
    #[must_use]
    pub fn entered_state(&self) -> Option<GestureState> {
        match self.kind {
            GestureEventKind::StateChanged {
                previous, current, ..
            } if previous != current || current == GestureState::Changed => Some(current),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Transform application
// ---------------------------------------------------------------------------

/// Receives transform deltas for scene nodes.
pub trait TransformSink {
    fn apply(&mut self, node: NodeId, delta: &TransformDelta);
    fn started(&mut self, _node: NodeId) {}
    fn completed(&mut self, _node: NodeId) {}
}

/// Forward every transform event in `events` to `sink`. Returns the number
/// of deltas applied.
pub fn dispatch_transforms<'a>(
    events: impl IntoIterator<Item = &'a GestureEvent>,
    sink: &mut dyn TransformSink,
) -> usize {
    let mut applied = 0;
    for event in events {
        match &event.kind {
            GestureEventKind::TransformStarted => sink.started(event.node),
            GestureEventKind::Transformed(delta) => {
                sink.apply(event.node, delta);
                applied += 1;
            }
            GestureEventKind::TransformCompleted => sink.completed(event.node),
            _ => {}
        }
    }
    applied
}

/// Accumulated transform of one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: Vec3,
    /// Degrees.
    pub rotation: f32,
    pub scale: f32,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: 0.0,
            scale: 1.0,
        }
    }
}

impl NodeTransform {
    /// Compose a delta onto this transform.
    pub fn apply(&mut self, delta: &TransformDelta) {
        self.position = self.position + delta.translation;
        self.rotation += delta.rotation;
        self.scale *= delta.scale;
    }
}

/// A [`TransformSink`] that keeps composed transforms per node.
#[derive(Debug, Clone, Default)]
pub struct TransformStore {
    nodes: AHashMap<NodeId, NodeTransform>,
    active: Vec<NodeId>,
}

impl TransformStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&NodeTransform> {
        self.nodes.get(&node)
    }

    /// Whether a transform has started and not yet completed on `node`.
    #[must_use]
    pub fn is_transforming(&self, node: NodeId) -> bool {
        self.active.contains(&node)
    }
}

impl TransformSink for TransformStore {
    fn apply(&mut self, node: NodeId, delta: &TransformDelta) {
        self.nodes.entry(node).or_default().apply(delta);
    }

    fn started(&mut self, node: NodeId) {
        if !self.active.contains(&node) {
            self.active.push(node);
        }
    }

    fn completed(&mut self, node: NodeId) {
        self.active.retain(|n| *n != node);
    }
}
