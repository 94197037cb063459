#![forbid(unsafe_code)]

//! Pointer identity and per-frame pointer state.
//!
//! A [`Pointer`] is one tracked contact: a finger, the mouse, a pen, or a
//! synthetic object. Pointers live in the [`PointerPool`](crate::pool::PointerPool)
//! and are recycled, so a `Pointer` borrowed during one frame must not be
//! assumed to describe the same contact later. Hold a [`PointerId`] instead.
//!
//! # Position buffering
//!
//! Input sources write [`Pointer::new_position`]; the pipeline advances
//! `previous_position <- position <- new_position` exactly once per frame so
//! every listener in a frame observes the same positions.

use std::cell::Cell;
use std::fmt;

use bitflags::bitflags;

use crate::geometry::Vec2;
use crate::input::InputSourceId;
use crate::layer::{HitData, LayerManager};

/// Identity of a pointer. Issued in strictly increasing order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointerId(pub i32);

impl PointerId {
    pub const INVALID: Self = Self(-1);

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= 0
    }
}

impl Default for PointerId {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for PointerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ptr#{}", self.0)
    }
}

/// Physical origin of a pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointerKind {
    #[default]
    Touch,
    Mouse,
    Pen,
    /// Tracked physical object or synthetic contact.
    Object,
}

bitflags! {
    /// Per-button state.
    ///
    /// `*_PRESSED` is held while the button is down. `*_DOWN` and `*_UP` are
    /// set only during the frame the transition happened.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerButtons: u16 {
        const FIRST_PRESSED  = 1 << 0;
        const FIRST_DOWN     = 1 << 1;
        const FIRST_UP       = 1 << 2;
        const SECOND_PRESSED = 1 << 3;
        const SECOND_DOWN    = 1 << 4;
        const SECOND_UP      = 1 << 5;
        const THIRD_PRESSED  = 1 << 6;
        const THIRD_DOWN     = 1 << 7;
        const THIRD_UP       = 1 << 8;

        const ANY_PRESSED = Self::FIRST_PRESSED.bits()
            | Self::SECOND_PRESSED.bits()
            | Self::THIRD_PRESSED.bits();
        const ANY_DOWN = Self::FIRST_DOWN.bits()
            | Self::SECOND_DOWN.bits()
            | Self::THIRD_DOWN.bits();
        const ANY_UP = Self::FIRST_UP.bits()
            | Self::SECOND_UP.bits()
            | Self::THIRD_UP.bits();
    }
}

/// Mouse-style button index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    First,
    Second,
    Third,
}

impl PointerButton {
    #[must_use]
    pub const fn pressed(self) -> PointerButtons {
        match self {
            Self::First => PointerButtons::FIRST_PRESSED,
            Self::Second => PointerButtons::SECOND_PRESSED,
            Self::Third => PointerButtons::THIRD_PRESSED,
        }
    }

    #[must_use]
    pub const fn down(self) -> PointerButtons {
        match self {
            Self::First => PointerButtons::FIRST_DOWN,
            Self::Second => PointerButtons::SECOND_DOWN,
            Self::Third => PointerButtons::THIRD_DOWN,
        }
    }

    #[must_use]
    pub const fn up(self) -> PointerButtons {
        match self {
            Self::First => PointerButtons::FIRST_UP,
            Self::Second => PointerButtons::SECOND_UP,
            Self::Third => PointerButtons::THIRD_UP,
        }
    }
}

impl PointerButtons {
    /// Mark `button` as going down this frame.
    pub fn press(&mut self, button: PointerButton) {
        self.remove(button.up());
        self.insert(button.pressed() | button.down());
    }

    /// Mark `button` as going up this frame.
    pub fn release(&mut self, button: PointerButton) {
        self.remove(button.pressed() | button.down());
        self.insert(button.up());
    }

    #[must_use]
    pub fn is_pressing(self) -> bool {
        self.intersects(Self::ANY_PRESSED)
    }
}

bitflags! {
    /// Pointer metadata.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PointerFlags: u8 {
        /// Produced by a synthetic source rather than hardware.
        const ARTIFICIAL = 1 << 0;
        /// Re-issued after a cancel-with-return.
        const RETURNED   = 1 << 1;
        /// Created by the library itself; hosts usually ignore these.
        const INTERNAL   = 1 << 2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum OverCache {
    #[default]
    Stale,
    Cached(Option<HitData>),
}

/// One live input contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Pointer {
    id: PointerId,
    kind: PointerKind,
    source: InputSourceId,
    flags: PointerFlags,
    pub(crate) buttons: PointerButtons,
    position: Vec2,
    previous_position: Vec2,
    pub(crate) new_position: Vec2,
    ref_count: u32,
    press_data: Option<HitData>,
    over_data: Cell<OverCache>,
    pub(crate) discarded: bool,
}

impl Default for Pointer {
    fn default() -> Self {
        Self::pooled()
    }
}

impl Pointer {
    /// A blank pointer as stored in a free pool slot.
    #[must_use]
    pub fn pooled() -> Self {
        Self {
            id: PointerId::INVALID,
            kind: PointerKind::Touch,
            source: InputSourceId::NONE,
            flags: PointerFlags::empty(),
            buttons: PointerButtons::empty(),
            position: Vec2::ZERO,
            previous_position: Vec2::ZERO,
            new_position: Vec2::ZERO,
            ref_count: 0,
            press_data: None,
            over_data: Cell::new(OverCache::Stale),
            discarded: false,
        }
    }

    /// Assign identity and an initial position to a pooled pointer.
    pub fn init(
        &mut self,
        id: PointerId,
        kind: PointerKind,
        source: InputSourceId,
        position: Vec2,
        flags: PointerFlags,
    ) {
        debug_assert!(id.is_valid(), "initializing pointer with invalid id");
        self.id = id;
        self.kind = kind;
        self.source = source;
        self.flags = flags;
        self.position = position;
        self.previous_position = position;
        self.new_position = position;
    }

    /// Restore the pooled state.
    pub fn reset(&mut self) {
        *self = Self::pooled();
    }

    /// Copy position and button state from another pointer.
    pub fn copy_from(&mut self, other: &Pointer) {
        self.kind = other.kind;
        self.buttons = other.buttons;
        self.position = other.position;
        self.previous_position = other.previous_position;
        self.new_position = other.new_position;
        self.invalidate_over_data();
    }

    /// Per-frame reset of transient button transitions.
    pub fn frame_started(&mut self) {
        self.buttons.remove(PointerButtons::ANY_DOWN | PointerButtons::ANY_UP);
    }

    /// Advance the double-buffered position by one frame.
    pub fn advance(&mut self) {
        self.previous_position = self.position;
        if self.position != self.new_position {
            self.position = self.new_position;
            self.invalidate_over_data();
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> PointerId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> PointerKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn source(&self) -> InputSourceId {
        self.source
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> PointerFlags {
        self.flags
    }

    #[inline]
    #[must_use]
    pub fn buttons(&self) -> PointerButtons {
        self.buttons
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    #[inline]
    #[must_use]
    pub fn previous_position(&self) -> Vec2 {
        self.previous_position
    }

    /// Position reported by the input source, applied on the next frame.
    #[inline]
    #[must_use]
    pub fn new_position(&self) -> Vec2 {
        self.new_position
    }

    #[inline]
    #[must_use]
    pub fn is_pressing(&self) -> bool {
        self.buttons.is_pressing()
    }

    #[inline]
    #[must_use]
    pub fn is_returned(&self) -> bool {
        self.flags.contains(PointerFlags::RETURNED)
    }

    /// Number of gestures currently retaining this pointer.
    #[inline]
    #[must_use]
    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Whether the input layer has let go of this pointer.
    #[inline]
    #[must_use]
    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    /// Hit data captured when the pointer was pressed.
    #[inline]
    #[must_use]
    pub fn press_data(&self) -> Option<HitData> {
        self.press_data
    }

    /// Hit data under the current position, computed on first use per position.
    #[must_use]
    pub fn over_data(&self, layers: &LayerManager) -> Option<HitData> {
        match self.over_data.get() {
            OverCache::Cached(data) => data,
            OverCache::Stale => {
                let data = layers.get_hit_target(self.position);
                self.over_data.set(OverCache::Cached(data));
                data
            }
        }
    }

    pub(crate) fn set_press_data(&mut self, data: Option<HitData>) {
        self.press_data = data;
    }

    pub(crate) fn retain(&mut self) -> u32 {
        self.ref_count += 1;
        self.ref_count
    }

    pub(crate) fn release(&mut self) -> u32 {
        debug_assert!(self.ref_count > 0, "releasing {} below zero", self.id);
        self.ref_count = self.ref_count.saturating_sub(1);
        self.ref_count
    }

    fn invalidate_over_data(&self) {
        self.over_data.set(OverCache::Stale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{FullscreenLayer, LayerId, NodeId};

    #[test]
    fn init_then_reset_restores_pooled_state() {
        let mut p = Pointer::pooled();
        p.init(
            PointerId(4),
            PointerKind::Mouse,
            InputSourceId(2),
            Vec2::new(10.0, 20.0),
            PointerFlags::RETURNED,
        );
        p.buttons.press(PointerButton::First);
        p.set_press_data(Some(HitData {
            target: NodeId(1),
            layer: LayerId(1),
            collider: None,
            camera: None,
            screen_position: Vec2::new(10.0, 20.0),
        }));
        p.retain();
        assert_ne!(p, Pointer::pooled());

        p.release();
        p.reset();
        assert_eq!(p, Pointer::pooled());
        assert_eq!(p.id(), PointerId::INVALID);
        assert_eq!(p.position(), Vec2::ZERO);
        assert!(p.press_data().is_none());
    }

    #[test]
    fn advance_shifts_positions_once() {
        let mut p = Pointer::pooled();
        p.init(
            PointerId(0),
            PointerKind::Touch,
            InputSourceId(0),
            Vec2::new(1.0, 1.0),
            PointerFlags::empty(),
        );
        p.new_position = Vec2::new(5.0, 5.0);
        p.advance();
        assert_eq!(p.previous_position(), Vec2::new(1.0, 1.0));
        assert_eq!(p.position(), Vec2::new(5.0, 5.0));
        p.advance();
        assert_eq!(p.previous_position(), Vec2::new(5.0, 5.0));
    }

    #[test]
    fn transient_button_bits_clear_on_frame_start() {
        let mut buttons = PointerButtons::empty();
        buttons.press(PointerButton::First);
        assert!(buttons.contains(PointerButtons::FIRST_DOWN));
        assert!(buttons.is_pressing());

        let mut p = Pointer::pooled();
        p.buttons = buttons;
        p.frame_started();
        assert_eq!(p.buttons(), PointerButtons::FIRST_PRESSED);

        p.buttons.release(PointerButton::First);
        assert_eq!(p.buttons(), PointerButtons::FIRST_UP);
        assert!(!p.is_pressing());
    }

    #[test]
    fn over_data_is_cached_until_moved() {
        let mut layers = LayerManager::new();
        layers
            .add_layer(LayerId(1), Box::new(FullscreenLayer::new("bg", NodeId(9))))
            .unwrap();

        let mut p = Pointer::pooled();
        p.init(
            PointerId(1),
            PointerKind::Touch,
            InputSourceId(0),
            Vec2::ZERO,
            PointerFlags::empty(),
        );
        assert_eq!(p.over_data(&layers).unwrap().target, NodeId(9));

        // A cached answer survives layer changes until the pointer moves.
        layers.set_enabled(false);
        assert!(p.over_data(&layers).is_some());
        p.new_position = Vec2::new(1.0, 0.0);
        p.advance();
        assert!(p.over_data(&layers).is_none());
    }

    #[test]
    fn pointer_id_validity() {
        assert!(!PointerId::INVALID.is_valid());
        assert!(PointerId(0).is_valid());
        assert_eq!(PointerId::default(), PointerId::INVALID);
        assert_eq!(PointerId(3).to_string(), "ptr#3");
    }
}
