#![forbid(unsafe_code)]

//! Hit-test layers and the ordered [`LayerManager`].
//!
//! A layer answers "what does this screen position hit" with one of three
//! outcomes:
//!
//! - `Hit`: the search stops and the hit is returned.
//! - `Miss`: the next layer is tried.
//! - `Discard`: the search stops with no hit; lower layers are not tried.
//!
//! Layers are consulted in ascending `priority`; layers with equal priority
//! are consulted in the order they were added. The order is re-sorted lazily,
//! only after a change could have broken it.

use std::cell::{Cell, RefCell};
use std::fmt;

use ahash::AHashMap;

use crate::geometry::{Rect, Vec2};

/// Opaque handle of a node in the host's scene hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Host-chosen identity of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Three-valued outcome of a single layer's hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitResult {
    Hit,
    Miss,
    Discard,
}

/// What a layer reports it hit, before the manager stamps the layer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitTarget {
    pub node: NodeId,
    /// Collider or graphic the hit landed on, if the layer tracks one.
    pub collider: Option<u64>,
    /// Camera that rendered the target, if any.
    pub camera: Option<u32>,
}

impl HitTarget {
    #[must_use]
    pub const fn node(node: NodeId) -> Self {
        Self {
            node,
            collider: None,
            camera: None,
        }
    }
}

/// Outcome of [`TouchLayer::hit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerHit {
    Hit(HitTarget),
    Miss,
    Discard,
}

impl LayerHit {
    #[must_use]
    pub fn result(&self) -> HitResult {
        match self {
            Self::Hit(_) => HitResult::Hit,
            Self::Miss => HitResult::Miss,
            Self::Discard => HitResult::Discard,
        }
    }
}

/// Immutable result of a successful hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitData {
    pub target: NodeId,
    pub layer: LayerId,
    pub collider: Option<u64>,
    pub camera: Option<u32>,
    pub screen_position: Vec2,
}

/// A hit-testable region.
pub trait TouchLayer {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Initial priority; lower values are consulted first.
    fn priority(&self) -> i32 {
        0
    }

    fn hit(&self, position: Vec2) -> LayerHit;
}

/// Hits every position, always resolving to one node.
#[derive(Debug, Clone)]
pub struct FullscreenLayer {
    name: String,
    target: NodeId,
    priority: i32,
}

impl FullscreenLayer {
    #[must_use]
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl TouchLayer for FullscreenLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn hit(&self, _position: Vec2) -> LayerHit {
        LayerHit::Hit(HitTarget::node(self.target))
    }
}

#[derive(Debug, Clone, Copy)]
enum Region {
    Target(Rect, HitTarget),
    Blocker(Rect),
}

/// A flat list of screen rectangles; the most recently pushed region that
/// contains the position wins.
///
/// Blocking regions report [`LayerHit::Discard`], hiding every layer below.
#[derive(Debug, Clone, Default)]
pub struct RegionLayer {
    name: String,
    priority: i32,
    regions: Vec<Region>,
}

impl RegionLayer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            regions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_region(mut self, rect: Rect, node: NodeId) -> Self {
        self.push_region(rect, HitTarget::node(node));
        self
    }

    #[must_use]
    pub fn with_blocker(mut self, rect: Rect) -> Self {
        self.regions.push(Region::Blocker(rect));
        self
    }

    pub fn push_region(&mut self, rect: Rect, target: HitTarget) {
        self.regions.push(Region::Target(rect, target));
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }
}

impl TouchLayer for RegionLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn hit(&self, position: Vec2) -> LayerHit {
        for region in self.regions.iter().rev() {
            match *region {
                Region::Target(rect, target) if rect.contains(position) => {
                    return LayerHit::Hit(target);
                }
                Region::Blocker(rect) if rect.contains(position) => return LayerHit::Discard,
                _ => {}
            }
        }
        LayerHit::Miss
    }
}

struct LayerEntry {
    id: LayerId,
    priority: i32,
    layer: Box<dyn TouchLayer>,
}

/// Ordered set of hit-test layers.
pub struct LayerManager {
    entries: Vec<LayerEntry>,
    /// Insertion-order tiebreak per layer.
    tokens: AHashMap<LayerId, u64>,
    next_token: u64,
    /// Indices into `entries`, sorted when `dirty` is false.
    order: RefCell<Vec<usize>>,
    dirty: Cell<bool>,
    enabled: bool,
}

impl fmt::Debug for LayerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerManager")
            .field("layers", &self.entries.len())
            .field("enabled", &self.enabled)
            .field("dirty", &self.dirty.get())
            .finish()
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            tokens: AHashMap::new(),
            next_token: 0,
            order: RefCell::new(Vec::new()),
            dirty: Cell::new(false),
            enabled: true,
        }
    }

    /// Append a layer. Fails if a layer with this id is already present.
    pub fn add_layer(
        &mut self,
        id: LayerId,
        layer: Box<dyn TouchLayer>,
    ) -> Result<(), crate::TouchError> {
        if self.tokens.contains_key(&id) {
            return Err(crate::TouchError::DuplicateLayer(id));
        }
        let priority = layer.priority();
        tracing::debug!(
            target: "fingertip.layer",
            layer = %id,
            name = layer.name(),
            priority,
            "layer added"
        );

        // Appending keeps the order sorted unless the new priority sorts
        // before the current tail.
        if !self.dirty.get() {
            let order = self.order.borrow();
            if let Some(&last) = order.last()
                && self.entries[last].priority > priority
            {
                self.dirty.set(true);
            }
        }

        self.tokens.insert(id, self.next_token);
        self.next_token += 1;
        self.entries.push(LayerEntry {
            id,
            priority,
            layer,
        });
        self.order.borrow_mut().push(self.entries.len() - 1);
        Ok(())
    }

    /// Remove a layer, returning it.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Box<dyn TouchLayer>> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        let entry = self.entries.remove(index);
        self.tokens.remove(&id);

        let mut order = self.order.borrow_mut();
        order.retain(|&i| i != index);
        for i in order.iter_mut() {
            if *i > index {
                *i -= 1;
            }
        }
        tracing::debug!(target: "fingertip.layer", layer = %id, "layer removed");
        Some(entry.layer)
    }

    /// Change a layer's priority. Returns `false` for an unknown layer.
    pub fn set_priority(&mut self, id: LayerId, priority: i32) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        if entry.priority != priority {
            entry.priority = priority;
            self.dirty.set(true);
        }
        true
    }

    #[must_use]
    pub fn priority(&self, id: LayerId) -> Option<i32> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.priority)
    }

    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&dyn TouchLayer> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.layer.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Layer ids in the order hit tests consult them.
    #[must_use]
    pub fn layer_ids(&self) -> Vec<LayerId> {
        self.ensure_sorted();
        self.order
            .borrow()
            .iter()
            .map(|&i| self.entries[i].id)
            .collect()
    }

    /// Resolve the target under a screen position.
    #[must_use]
    pub fn get_hit_target(&self, position: Vec2) -> Option<HitData> {
        if !self.enabled {
            return None;
        }
        self.ensure_sorted();

        let order = self.order.borrow();
        for &index in order.iter() {
            let entry = &self.entries[index];
            match entry.layer.hit(position) {
                LayerHit::Hit(target) => {
                    tracing::trace!(
                        target: "fingertip.layer",
                        layer = %entry.id,
                        node = %target.node,
                        "hit"
                    );
                    return Some(HitData {
                        target: target.node,
                        layer: entry.id,
                        collider: target.collider,
                        camera: target.camera,
                        screen_position: position,
                    });
                }
                LayerHit::Miss => {}
                LayerHit::Discard => {
                    tracing::trace!(target: "fingertip.layer", layer = %entry.id, "discarded");
                    return None;
                }
            }
        }
        None
    }

    fn ensure_sorted(&self) {
        if !self.dirty.get() {
            return;
        }
        let mut order = self.order.borrow_mut();
        order.sort_by_key(|&i| {
            let entry = &self.entries[i];
            (entry.priority, self.tokens.get(&entry.id).copied().unwrap_or(u64::MAX))
        });
        self.dirty.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    /// Records every call and answers with a fixed outcome.
    struct ProbeLayer {
        name: &'static str,
        priority: i32,
        outcome: LayerHit,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl TouchLayer for ProbeLayer {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn hit(&self, _position: Vec2) -> LayerHit {
            self.log.borrow_mut().push(self.name);
            self.outcome
        }
    }

    fn probe(
        name: &'static str,
        priority: i32,
        outcome: LayerHit,
        log: &Rc<RefCell<Vec<&'static str>>>,
    ) -> Box<dyn TouchLayer> {
        Box::new(ProbeLayer {
            name,
            priority,
            outcome,
            log: Rc::clone(log),
        })
    }

    fn hit(node: u64) -> LayerHit {
        LayerHit::Hit(HitTarget::node(NodeId(node)))
    }

    #[test]
    fn lower_priority_value_is_consulted_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers
            .add_layer(LayerId(1), probe("b", 10, LayerHit::Miss, &log))
            .unwrap();
        layers
            .add_layer(LayerId(2), probe("a", 5, LayerHit::Miss, &log))
            .unwrap();

        assert_eq!(layers.get_hit_target(Vec2::ZERO), None);
        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(layers.layer_ids(), vec![LayerId(2), LayerId(1)]);
    }

    #[test]
    fn equal_priority_keeps_insertion_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        for (id, name) in [(1, "first"), (2, "second"), (3, "third")] {
            layers
                .add_layer(LayerId(id), probe(name, 0, LayerHit::Miss, &log))
                .unwrap();
        }
        let _ = layers.get_hit_target(Vec2::ZERO);
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn first_hit_short_circuits() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers.add_layer(LayerId(1), probe("a", 0, hit(7), &log)).unwrap();
        layers.add_layer(LayerId(2), probe("b", 1, hit(8), &log)).unwrap();

        let data = layers.get_hit_target(Vec2::new(3.0, 4.0)).unwrap();
        assert_eq!(data.target, NodeId(7));
        assert_eq!(data.layer, LayerId(1));
        assert_eq!(data.screen_position, Vec2::new(3.0, 4.0));
        assert_eq!(*log.borrow(), vec!["a"]);
    }

    #[test]
    fn discard_stops_search_without_hit() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers
            .add_layer(LayerId(1), probe("wall", 0, LayerHit::Discard, &log))
            .unwrap();
        layers.add_layer(LayerId(2), probe("below", 1, hit(1), &log)).unwrap();

        assert_eq!(layers.get_hit_target(Vec2::ZERO), None);
        assert_eq!(*log.borrow(), vec!["wall"]);
    }

    #[test]
    fn disabled_manager_never_queries_layers() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers.add_layer(LayerId(1), probe("a", 0, hit(1), &log)).unwrap();
        layers.set_enabled(false);

        assert_eq!(layers.get_hit_target(Vec2::ZERO), None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn duplicate_layer_is_rejected() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers.add_layer(LayerId(1), probe("a", 0, hit(1), &log)).unwrap();
        let err = layers
            .add_layer(LayerId(1), probe("again", 0, hit(1), &log))
            .unwrap_err();
        assert_eq!(err, crate::TouchError::DuplicateLayer(LayerId(1)));
        assert_eq!(layers.len(), 1);
    }

    #[test]
    fn priority_change_resorts_lazily() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers.add_layer(LayerId(1), probe("a", 0, LayerHit::Miss, &log)).unwrap();
        layers.add_layer(LayerId(2), probe("b", 1, LayerHit::Miss, &log)).unwrap();
        assert!(layers.set_priority(LayerId(2), -1));
        assert_eq!(layers.layer_ids(), vec![LayerId(2), LayerId(1)]);
        assert!(!layers.set_priority(LayerId(9), 0));
    }

    #[test]
    fn removal_forgets_layer_and_token() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut layers = LayerManager::new();
        layers.add_layer(LayerId(1), probe("a", 0, LayerHit::Miss, &log)).unwrap();
        layers.add_layer(LayerId(2), probe("b", 0, hit(2), &log)).unwrap();
        layers.add_layer(LayerId(3), probe("c", 0, hit(3), &log)).unwrap();

        assert!(layers.remove_layer(LayerId(2)).is_some());
        assert!(layers.remove_layer(LayerId(2)).is_none());
        assert_eq!(layers.layer_ids(), vec![LayerId(1), LayerId(3)]);
        assert_eq!(layers.get_hit_target(Vec2::ZERO).unwrap().target, NodeId(3));

        // Re-adding the id is allowed and sorts after existing equal-priority layers.
        layers.add_layer(LayerId(2), probe("b2", 0, hit(2), &log)).unwrap();
        assert_eq!(layers.layer_ids(), vec![LayerId(1), LayerId(3), LayerId(2)]);
    }

    #[test]
    fn region_layer_topmost_wins_and_blocks() {
        let layer = RegionLayer::new("ui")
            .with_region(Rect::new(0.0, 0.0, 100.0, 100.0), NodeId(1))
            .with_region(Rect::new(10.0, 10.0, 20.0, 20.0), NodeId(2))
            .with_blocker(Rect::new(50.0, 50.0, 10.0, 10.0));

        assert_eq!(layer.hit(Vec2::new(15.0, 15.0)), hit(2));
        assert_eq!(layer.hit(Vec2::new(80.0, 5.0)), hit(1));
        assert_eq!(layer.hit(Vec2::new(55.0, 55.0)), LayerHit::Discard);
        assert_eq!(layer.hit(Vec2::new(500.0, 5.0)), LayerHit::Miss);
        assert_eq!(LayerHit::Discard.result(), HitResult::Discard);
    }
}
