#![forbid(unsafe_code)]

//! The recognizer seam.
//!
//! Built-in recognizers are enum variants; anything else plugs in through
//! [`GestureKind::Custom`].

use std::fmt;

use fingertip_core::{Pointer, PointerId};

use crate::context::GestureContext;
use crate::recognizers::{
    FlickGesture, LongPressGesture, PinnedTransformGesture, PressGesture, ReleaseGesture,
    TapGesture, TransformGesture,
};
use crate::state::GestureState;

/// Recognition logic for one gesture.
///
/// Callbacks run with the recognizer taken out of the manager, so they may
/// request state changes through the context. Entry hooks triggered while a
/// recognizer's own callback is running are delivered after it returns.
pub trait Recognizer: fmt::Debug {
    fn name(&self) -> &'static str;

    /// Whether this gesture may force others to fail when it recognizes.
    fn can_prevent_gesture(&self) -> bool {
        true
    }

    /// Whether other gestures may force this one to fail.
    fn can_be_prevented(&self) -> bool {
        true
    }

    /// Filter applied before a pressed pointer is delivered.
    fn should_receive_pointer(&self, _pointer: &Pointer) -> bool {
        true
    }

    fn pointers_pressed(&mut self, _ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {}
    fn pointers_updated(&mut self, _ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {}
    fn pointers_released(&mut self, _ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {}
    fn pointers_cancelled(&mut self, _ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {}

    /// Called at the start of every frame while `Possible`, `Began` or
    /// `Changed`; timers live here.
    fn tick(&mut self, _ctx: &mut GestureContext<'_, '_>) {}

    /// Entry hook for every state the gesture moves into.
    fn on_state_entered(&mut self, _ctx: &mut GestureContext<'_, '_>, _state: GestureState) {}

    /// Clear per-attempt data. Runs on the deferred reset back to `Idle`.
    fn reset(&mut self) {}
}

#[derive(Debug)]
pub enum GestureKind {
    Tap(TapGesture),
    Press(PressGesture),
    Release(ReleaseGesture),
    LongPress(LongPressGesture),
    Flick(FlickGesture),
    Transform(TransformGesture),
    PinnedTransform(PinnedTransformGesture),
    Custom(Box<dyn Recognizer>),
}

impl GestureKind {
    #[must_use]
    pub fn recognizer(&self) -> &dyn Recognizer {
        match self {
            Self::Tap(g) => g,
            Self::Press(g) => g,
            Self::Release(g) => g,
            Self::LongPress(g) => g,
            Self::Flick(g) => g,
            Self::Transform(g) => g,
            Self::PinnedTransform(g) => g,
            Self::Custom(g) => g.as_ref(),
        }
    }

    pub fn recognizer_mut(&mut self) -> &mut dyn Recognizer {
        match self {
            Self::Tap(g) => g,
            Self::Press(g) => g,
            Self::Release(g) => g,
            Self::LongPress(g) => g,
            Self::Flick(g) => g,
            Self::Transform(g) => g,
            Self::PinnedTransform(g) => g,
            Self::Custom(g) => g.as_mut(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.recognizer().name()
    }

    #[must_use]
    pub fn as_tap(&self) -> Option<&TapGesture> {
        match self {
            Self::Tap(g) => Some(g),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_transform(&self) -> Option<&TransformGesture> {
        match self {
            Self::Transform(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_pinned_transform_mut(&mut self) -> Option<&mut PinnedTransformGesture> {
        match self {
            Self::PinnedTransform(g) => Some(g),
            _ => None,
        }
    }
}

macro_rules! impl_from_recognizer {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for GestureKind {
                fn from(gesture: $ty) -> Self {
                    Self::$variant(gesture)
                }
            }
        )*
    };
}

impl_from_recognizer!(
    Tap(TapGesture),
    Press(PressGesture),
    Release(ReleaseGesture),
    LongPress(LongPressGesture),
    Flick(FlickGesture),
    Transform(TransformGesture),
    PinnedTransform(PinnedTransformGesture),
);

impl From<Box<dyn Recognizer>> for GestureKind {
    fn from(recognizer: Box<dyn Recognizer>) -> Self {
        Self::Custom(recognizer)
    }
}
