#![forbid(unsafe_code)]

//! Recognizes the instant the first pointer lands.

use fingertip_core::PointerId;

use crate::context::GestureContext;
use crate::events::GestureEventKind;
use crate::kind::Recognizer;
use crate::state::GestureState;

/// Ends as soon as pointers are pressed. Neither prevents nor can be
/// prevented by other gestures.
#[derive(Debug, Clone, Copy, Default)]
pub struct PressGesture;

impl PressGesture {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Recognizer for PressGesture {
    fn name(&self) -> &'static str {
        "press"
    }

    fn can_prevent_gesture(&self) -> bool {
        false
    }

    fn can_be_prevented(&self) -> bool {
        false
    }

    fn pointers_pressed(&mut self, ctx: &mut GestureContext<'_, '_>, pointers: &[PointerId]) {
        if ctx.state() == GestureState::Possible && ctx.num_pointers() == pointers.len() {
            ctx.set_state(GestureState::Ended);
        }
    }

    fn on_state_entered(&mut self, ctx: &mut GestureContext<'_, '_>, state: GestureState) {
        if state == GestureState::Ended {
            let position = ctx.screen_position().unwrap_or_default();
            ctx.emit(GestureEventKind::Pressed { position });
        }
    }
}
