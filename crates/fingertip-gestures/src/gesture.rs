#![forbid(unsafe_code)]

//! Gesture identity and the state every recognizer shares.

use std::fmt;

use fingertip_core::{LayerId, NodeId, PointerId, Vec2};

use crate::kind::GestureKind;
use crate::state::{GestureState, PointersNumState};

/// Generational handle into the gesture manager's slab.
///
/// A handle whose gesture was removed stops resolving even if its slot is
/// reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureHandle {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl GestureHandle {
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for GestureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gesture#{}v{}", self.index, self.generation)
    }
}

/// Recognizer-independent gesture state, owned by the manager.
#[derive(Debug, Clone)]
pub struct GestureCore {
    pub(crate) node: NodeId,
    pub(crate) name: &'static str,
    pub(crate) state: GestureState,
    pub(crate) previous_state: GestureState,
    /// In delivery order.
    pub(crate) active_pointers: Vec<PointerId>,
    /// Retained while `Began`/`Changed`; released on `Ended`/`Cancelled`.
    pub(crate) retained: Vec<PointerId>,
    pub(crate) pointers_num_state: PointersNumState,
    /// Position of the last pointers, kept after they were released.
    pub(crate) cached_screen_position: Option<Vec2>,
    pub(crate) cached_previous_screen_position: Option<Vec2>,
    pub(crate) press_layer: Option<LayerId>,
    /// Hit target of the first pointer; arbitration walks its ancestors.
    pub(crate) press_target: Option<NodeId>,
    pub(crate) enabled: bool,
    pub(crate) friendly: Vec<GestureHandle>,
    pub(crate) require_to_fail: Option<GestureHandle>,
    pub(crate) delayed_state: Option<GestureState>,
    pub(crate) accept_returned: bool,
    pub(crate) reset_scheduled: bool,
    pub(crate) prevents: bool,
    pub(crate) preventable: bool,
}

impl GestureCore {
    pub(crate) fn new(node: NodeId, kind: &GestureKind) -> Self {
        let recognizer = kind.recognizer();
        Self {
            node,
            name: recognizer.name(),
            state: GestureState::Idle,
            previous_state: GestureState::Idle,
            active_pointers: Vec::new(),
            retained: Vec::new(),
            pointers_num_state: PointersNumState::Reset,
            cached_screen_position: None,
            cached_previous_screen_position: None,
            press_layer: None,
            press_target: None,
            enabled: true,
            friendly: Vec::new(),
            require_to_fail: None,
            delayed_state: None,
            accept_returned: true,
            reset_scheduled: false,
            prevents: recognizer.can_prevent_gesture(),
            preventable: recognizer.can_be_prevented(),
        }
    }

    #[inline]
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> GestureState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn previous_state(&self) -> GestureState {
        self.previous_state
    }

    #[must_use]
    pub fn active_pointers(&self) -> &[PointerId] {
        &self.active_pointers
    }

    #[must_use]
    pub fn num_pointers(&self) -> usize {
        self.active_pointers.len()
    }

    #[must_use]
    pub fn retained_pointers(&self) -> &[PointerId] {
        &self.retained
    }

    #[must_use]
    pub fn pointers_num_state(&self) -> PointersNumState {
        self.pointers_num_state
    }

    /// Layer the first pointer was pressed on.
    #[must_use]
    pub fn press_layer(&self) -> Option<LayerId> {
        self.press_layer
    }

    /// Node the first pointer was pressed on.
    #[must_use]
    pub fn press_target(&self) -> Option<NodeId> {
        self.press_target
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn friends(&self) -> &[GestureHandle] {
        &self.friendly
    }

    #[must_use]
    pub fn require_to_fail(&self) -> Option<GestureHandle> {
        self.require_to_fail
    }

    /// Recognition request parked until the required gesture fails.
    #[must_use]
    pub fn delayed_state(&self) -> Option<GestureState> {
        self.delayed_state
    }

    /// Whether pointers re-issued by cancel-with-return are accepted.
    #[must_use]
    pub fn accepts_returned(&self) -> bool {
        self.accept_returned
    }

    #[must_use]
    pub fn is_friendly_with(&self, other: GestureHandle) -> bool {
        self.friendly.contains(&other)
    }
}

/// A gesture slot: shared core plus its recognizer.
///
/// The recognizer is taken out while one of its callbacks runs so the
/// callback can drive the manager re-entrantly.
#[derive(Debug)]
pub struct Gesture {
    pub(crate) core: GestureCore,
    pub(crate) kind: Option<GestureKind>,
}

impl Gesture {
    pub(crate) fn new(node: NodeId, kind: GestureKind) -> Self {
        Self {
            core: GestureCore::new(node, &kind),
            kind: Some(kind),
        }
    }

    #[must_use]
    pub fn core(&self) -> &GestureCore {
        &self.core
    }

    /// `None` only while the recognizer's own callback is running.
    #[must_use]
    pub fn kind(&self) -> Option<&GestureKind> {
        self.kind.as_ref()
    }
}
