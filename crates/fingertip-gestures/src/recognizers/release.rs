#![forbid(unsafe_code)]

//! Recognizes the instant the last pointer lifts.

use fingertip_core::PointerId;

use crate::context::GestureContext;
use crate::events::GestureEventKind;
use crate::kind::Recognizer;
use crate::state::GestureState;

/// Ends when every pointer it received has been released. Neither prevents
/// nor can be prevented by other gestures.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseGesture;

impl ReleaseGesture {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Recognizer for ReleaseGesture {
    fn name(&self) -> &'static str {
        "release"
    }

    fn can_prevent_gesture(&self) -> bool {
        false
    }

    fn can_be_prevented(&self) -> bool {
        false
    }

    fn pointers_released(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        if ctx.state() == GestureState::Possible && ctx.num_pointers() == 0 {
            ctx.set_state(GestureState::Ended);
        }
    }

    fn on_state_entered(&mut self, ctx: &mut GestureContext<'_, '_>, state: GestureState) {
        if state == GestureState::Ended {
            let position = ctx.screen_position().unwrap_or_default();
            ctx.emit(GestureEventKind::Released { position });
        }
    }
}
