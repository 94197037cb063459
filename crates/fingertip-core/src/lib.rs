#![forbid(unsafe_code)]

//! Core: pointers, hit-test layers, input sources, and the frame pipeline.
//!
//! # Role in fingertip
//! `fingertip-core` is the input layer. It owns pointer identity and pooling,
//! collects raw device input into per-frame change sets, resolves which scene
//! node a screen position hits, and dispatches ordered pointer lifecycle
//! notifications once per frame.
//!
//! # Primary responsibilities
//! - **Pointer / PointerPool**: recycled pointer slots with retain counts.
//! - **PointerChanges**: the per-frame change-set contract between input
//!   sources and the pipeline.
//! - **LayerManager**: priority-ordered, three-valued hit testing.
//! - **TouchManager**: the deterministic per-frame dispatch pipeline.
//!
//! # How it fits in the system
//! `fingertip-gestures` implements [`PointerListener`] to route pointers to
//! gesture recognizers; the `fingertip` facade wires both together.

pub mod changes;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod layer;
pub mod logging;
pub mod manager;
pub mod pointer;
pub mod pool;
pub mod sources;

pub use changes::{PointerChange, PointerChanges};
pub use config::TouchConfig;
pub use error::TouchError;
pub use geometry::{Plane, Rect, Vec2, Vec3};
pub use input::{InputFrame, InputSource, InputSourceId};
pub use layer::{
    FullscreenLayer, HitData, HitResult, HitTarget, LayerHit, LayerId, LayerManager, NodeId,
    RegionLayer, TouchLayer,
};
pub use manager::{CancelRequest, FrameInfo, PointerFrame, PointerListener, TouchManager};
pub use pointer::{Pointer, PointerButton, PointerButtons, PointerFlags, PointerId, PointerKind};
pub use pool::{PointerPool, PoolStats};
pub use sources::{
    FakeSource, MouseInput, MouseSource, StandardInput, TouchEvent, TouchPhase, TouchSource,
};

/// Re-exported so hosts can construct [`FrameInfo`] timestamps.
pub use web_time::Instant;
