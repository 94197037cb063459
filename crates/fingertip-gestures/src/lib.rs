#![forbid(unsafe_code)]

//! Gestures: the recognition state machine and arbitration.
//!
//! # Role in fingertip
//! `fingertip-gestures` turns the pointer lifecycle produced by
//! `fingertip-core` into recognized gestures. [`GestureManager`] listens to
//! the touch pipeline, routes each pressed pointer to the gestures on its hit
//! target's ancestor chain, and arbitrates which gestures may recognize when
//! several compete for the same pointers.
//!
//! # Primary responsibilities
//! - **GestureState**: the per-gesture state machine with deferred reset.
//! - **GestureManager**: pointer routing, prevention, friendship and
//!   require-to-fail relationships.
//! - **Recognizers**: tap, press, release, long press, flick, transform and
//!   pinned transform, plus [`Recognizer`] for custom ones.
//! - **Transform math**: threshold-buffered translation, rotation and scale
//!   deltas.

pub mod context;
pub mod error;
pub mod events;
pub mod gesture;
pub mod kind;
pub mod manager;
pub mod recognizers;
pub mod scene;
pub mod state;
pub mod transform_math;

pub use context::GestureContext;
pub use error::GestureError;
pub use events::{
    GestureEvent, GestureEventKind, NodeTransform, TransformSink, TransformStore,
    dispatch_transforms,
};
pub use gesture::{Gesture, GestureCore, GestureHandle};
pub use kind::{GestureKind, Recognizer};
pub use manager::GestureManager;
pub use recognizers::{
    FlickConfig, FlickDirection, FlickGesture, LongPressConfig, LongPressGesture,
    PinnedTransformConfig, PinnedTransformGesture, PressGesture, ReleaseGesture, TapConfig,
    TapGesture, TransformConfig, TransformGesture,
};
pub use scene::{Ancestors, SceneTree};
pub use state::{GestureState, PointersNumState};
pub use transform_math::{
    DeltaAccumulator, OrthographicProjector, ProjectionMode, Projector, TransformDelta,
    TransformTypes,
};
