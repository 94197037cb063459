#![forbid(unsafe_code)]

//! The input-source contract.
//!
//! An [`InputSource`] polls some device (or a host-fed queue) once per frame
//! and describes the result through an [`InputFrame`]: it issues pointers from
//! the shared pool and records their changes in the frame's change set. Every
//! pointer is owned by exactly the source that issued it.

use std::any::Any;
use std::fmt;

use crate::changes::PointerChanges;
use crate::geometry::Vec2;
use crate::pointer::{PointerButton, PointerButtons, PointerFlags, PointerId, PointerKind};
use crate::pool::PointerPool;

/// Index of an input source registered with the touch manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputSourceId(pub u16);

impl InputSourceId {
    /// Owner of pooled pointers.
    pub const NONE: Self = Self(u16::MAX);
}

impl fmt::Display for InputSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "input#{}", self.0)
    }
}

/// A device or feed producing pointers.
pub trait InputSource: Any {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Poll and record this frame's changes. Returns `true` when the source
    /// had any activity (used to let touch pre-empt mouse).
    fn update_input(&mut self, frame: &mut InputFrame<'_>) -> bool;

    /// Cancel one of this source's pointers.
    ///
    /// With `should_return` the source immediately issues a replacement
    /// pointer that continues the contact, and returns its id.
    fn cancel_pointer(
        &mut self,
        pointer: PointerId,
        should_return: bool,
        frame: &mut InputFrame<'_>,
    ) -> Option<PointerId>;

    /// The pipeline is done with a removed or cancelled pointer.
    fn discard_pointer(&mut self, _pointer: PointerId) {}

    /// Cancel everything this source owns; used on removal and shutdown.
    fn deactivate(&mut self, _frame: &mut InputFrame<'_>) {}

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A source's view of the pool and change set for one call.
pub struct InputFrame<'a> {
    source: InputSourceId,
    pool: &'a mut PointerPool,
    changes: &'a mut PointerChanges,
}

impl fmt::Debug for InputFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFrame")
            .field("source", &self.source)
            .field("pending", &self.changes.len())
            .finish()
    }
}

impl<'a> InputFrame<'a> {
    pub fn new(
        source: InputSourceId,
        pool: &'a mut PointerPool,
        changes: &'a mut PointerChanges,
    ) -> Self {
        Self {
            source,
            pool,
            changes,
        }
    }

    #[must_use]
    pub fn source(&self) -> InputSourceId {
        self.source
    }

    #[must_use]
    pub fn pool(&self) -> &PointerPool {
        self.pool
    }

    #[must_use]
    pub fn changes(&self) -> &PointerChanges {
        self.changes
    }

    /// Issue a pointer that hovers without pressing (e.g. the mouse).
    pub fn add(&mut self, kind: PointerKind, position: Vec2, flags: PointerFlags) -> PointerId {
        let id = self.pool.issue(kind, self.source, position, flags);
        self.changes.put_added(id);
        id
    }

    /// Issue a pointer that lands pressed (e.g. a finger).
    pub fn add_and_press(
        &mut self,
        kind: PointerKind,
        position: Vec2,
        flags: PointerFlags,
    ) -> PointerId {
        let id = self.pool.issue(kind, self.source, position, flags);
        if let Some(p) = self.pool.get_mut(id) {
            p.buttons.press(PointerButton::First);
        }
        self.changes.put_add_and_press(id);
        id
    }

    /// Record a button going down.
    ///
    /// The pointer counts as pressed only when its first held button goes
    /// down; additional buttons just update the button state.
    pub fn press(&mut self, id: PointerId, button: PointerButton) {
        let Some(p) = self.pool.get_mut(id) else {
            return;
        };
        let was_pressing = p.is_pressing();
        p.buttons.press(button);
        if !was_pressing {
            self.changes.put_pressed(id);
        }
    }

    /// Record a button going up; released when no held button remains.
    pub fn release(&mut self, id: PointerId, button: PointerButton) {
        let Some(p) = self.pool.get_mut(id) else {
            return;
        };
        if !p.buttons.contains(button.pressed()) {
            return;
        }
        p.buttons.release(button);
        if !p.is_pressing() {
            self.changes.put_released(id);
        }
    }

    /// Report a new position.
    pub fn move_to(&mut self, id: PointerId, position: Vec2) {
        let Some(p) = self.pool.get_mut(id) else {
            return;
        };
        if p.new_position != position {
            p.new_position = position;
            self.changes.put_updated(id);
        }
    }

    /// Lift a pressed pointer and end it in one frame.
    pub fn release_and_remove(&mut self, id: PointerId, position: Vec2) {
        self.move_to(id, position);
        if let Some(p) = self.pool.get_mut(id) {
            p.buttons.release(PointerButton::First);
            p.buttons.remove(PointerButtons::ANY_PRESSED);
        }
        self.changes.put_release_and_remove(id);
    }

    /// End a pointer that is not pressed.
    pub fn remove(&mut self, id: PointerId) {
        self.changes.put_removed(id);
    }

    pub fn cancel(&mut self, id: PointerId) {
        self.changes.put_cancelled(id);
    }

    /// A contact that began and ended between two polls.
    pub fn single_frame_tap(
        &mut self,
        kind: PointerKind,
        position: Vec2,
        flags: PointerFlags,
    ) -> PointerId {
        let id = self.pool.issue(kind, self.source, position, flags);
        if let Some(p) = self.pool.get_mut(id) {
            p.buttons.press(PointerButton::First);
        }
        self.changes.put_single_frame_tap(id);
        id
    }

    /// Cancel `id` and, when `should_return`, issue a replacement carrying
    /// its position and button state, flagged [`PointerFlags::RETURNED`].
    pub fn cancel_with_return(&mut self, id: PointerId, should_return: bool) -> Option<PointerId> {
        let original = self.pool.get(id)?.clone();
        self.changes.put_cancelled(id);
        if !should_return {
            return None;
        }

        let flags = original.flags() | PointerFlags::RETURNED;
        let new_id = self
            .pool
            .issue(original.kind(), self.source, original.new_position(), flags);
        if let Some(p) = self.pool.get_mut(new_id) {
            p.copy_from(&original);
        }
        if original.is_pressing() {
            self.changes.put_add_and_press(new_id);
        } else {
            self.changes.put_added(new_id);
        }
        tracing::debug!(
            target: "fingertip.input",
            cancelled = %id,
            returned = %new_id,
            "pointer returned"
        );
        Some(new_id)
    }
}
