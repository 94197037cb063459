#![forbid(unsafe_code)]

//! What a recognizer sees while one of its callbacks runs.

use fingertip_core::{FrameInfo, Instant, LayerManager, Pointer, PointerFrame, PointerId, Vec2};

use crate::events::GestureEventKind;
use crate::gesture::{GestureCore, GestureHandle};
use crate::manager::GestureManager;
use crate::state::{GestureState, PointersNumState};

/// Borrowed view of the manager and the current frame, scoped to one
/// gesture.
pub struct GestureContext<'a, 'p> {
    pub(crate) manager: &'a mut GestureManager,
    pub(crate) frame: &'a mut PointerFrame<'p>,
    pub(crate) handle: GestureHandle,
}

impl std::fmt::Debug for GestureContext<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GestureContext")
            .field("handle", &self.handle)
            .field("state", &self.state())
            .finish()
    }
}

impl<'a, 'p> GestureContext<'a, 'p> {
    pub(crate) fn new(
        manager: &'a mut GestureManager,
        frame: &'a mut PointerFrame<'p>,
        handle: GestureHandle,
    ) -> Self {
        Self {
            manager,
            frame,
            handle,
        }
    }

    #[inline]
    #[must_use]
    pub fn handle(&self) -> GestureHandle {
        self.handle
    }

    fn core(&self) -> Option<&GestureCore> {
        self.manager.core(self.handle)
    }

    #[must_use]
    pub fn state(&self) -> GestureState {
        self.core().map_or(GestureState::Idle, GestureCore::state)
    }

    #[must_use]
    pub fn previous_state(&self) -> GestureState {
        self.core().map_or(GestureState::Idle, GestureCore::previous_state)
    }

    #[must_use]
    pub fn num_pointers(&self) -> usize {
        self.core().map_or(0, GestureCore::num_pointers)
    }

    #[must_use]
    pub fn pointers_num_state(&self) -> PointersNumState {
        self.core()
            .map_or(PointersNumState::Reset, GestureCore::pointers_num_state)
    }

    /// Active pointers in delivery order.
    #[must_use]
    pub fn active_pointers(&self) -> &[PointerId] {
        self.core().map_or(&[][..], GestureCore::active_pointers)
    }

    /// `(previous, current)` position of the `index`-th active pointer.
    #[must_use]
    pub fn pointer_motion(&self, index: usize) -> Option<(Vec2, Vec2)> {
        let id = *self.active_pointers().get(index)?;
        let pointer = self.frame.pointer(id)?;
        Some((pointer.previous_position(), pointer.position()))
    }

    /// Centroid of the active pointers, or of the last pointers once they
    /// were all released.
    #[must_use]
    pub fn screen_position(&self) -> Option<Vec2> {
        let live = Vec2::centroid(
            self.active_pointers()
                .iter()
                .filter_map(|id| self.frame.pointer(*id))
                .map(Pointer::position),
        );
        live.or_else(|| self.core().and_then(|c| c.cached_screen_position))
    }

    /// Centroid of the same pointers' positions one frame earlier.
    #[must_use]
    pub fn previous_screen_position(&self) -> Option<Vec2> {
        let live = Vec2::centroid(
            self.active_pointers()
                .iter()
                .filter_map(|id| self.frame.pointer(*id))
                .map(Pointer::previous_position),
        );
        live.or_else(|| self.core().and_then(|c| c.cached_previous_screen_position))
    }

    #[must_use]
    pub fn pointer(&self, id: PointerId) -> Option<&Pointer> {
        self.frame.pointer(id)
    }

    #[must_use]
    pub fn frame_info(&self) -> FrameInfo {
        self.frame.info()
    }

    #[inline]
    #[must_use]
    pub fn now(&self) -> Instant {
        self.frame.now()
    }

    #[inline]
    #[must_use]
    pub fn dots_per_cm(&self) -> f32 {
        self.frame.dots_per_cm()
    }

    #[must_use]
    pub fn layers(&self) -> &LayerManager {
        self.frame.layers()
    }

    /// Request a state change; returns the state the gesture ended up in.
    pub fn set_state(&mut self, state: GestureState) -> GestureState {
        self.manager
            .change_state(self.frame, self.handle, state)
            .unwrap_or(GestureState::Failed)
    }

    /// Append a recognizer event for this gesture.
    pub fn emit(&mut self, kind: GestureEventKind) {
        self.manager.emit(self.handle, kind);
    }

    /// Cancel one of this gesture's pointers on the next frame.
    pub fn cancel_pointer(&mut self, pointer: PointerId, should_return: bool) {
        self.frame.cancel_pointer(pointer, should_return);
    }
}
