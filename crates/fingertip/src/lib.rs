#![forbid(unsafe_code)]

//! fingertip public facade.
//!
//! # Role in fingertip
//! `fingertip` is the crate hosts depend on. It wires the pointer pipeline
//! (`fingertip-core`) to the gesture manager (`fingertip-gestures`) through
//! [`TouchSystem`], and adds the unified [`Error`], the combined
//! [`FingertipConfig`], and logging setup.
//!
//! # Features
//! - `config`: serde derives plus TOML/JSON loading for [`FingertipConfig`].
//! - `subscriber`: [`logging::init`] on top of `tracing-subscriber`.
//!
//! # Example
//! ```
//! use fingertip::prelude::*;
//!
//! let mut system = TouchSystem::default();
//! system.add_node(NodeId(1), None).unwrap();
//! system
//!     .add_layer(LayerId(0), Box::new(FullscreenLayer::new("screen", NodeId(1))))
//!     .unwrap();
//! let input = system.add_input(Box::new(FakeSource::new()));
//! let tap = system.add_gesture(NodeId(1), TapGesture::default()).unwrap();
//!
//! system.source_mut::<FakeSource>(input).unwrap().tap(0, Vec2::new(10.0, 10.0));
//! system.advance(std::time::Duration::from_millis(16));
//!
//! let tapped = system
//!     .drain_events()
//!     .any(|e| e.gesture == tap && matches!(e.kind, GestureEventKind::Tapped { .. }));
//! assert!(tapped);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod system;

pub use config::FingertipConfig;
pub use error::{ConfigError, Error, Result};
pub use system::TouchSystem;

pub use fingertip_core as core;
pub use fingertip_gestures as gestures;

/// Everything a typical host touches.
pub mod prelude {
    pub use crate::config::FingertipConfig;
    pub use crate::error::{ConfigError, Error, Result};
    pub use crate::system::TouchSystem;

    pub use fingertip_core::{
        FakeSource, FullscreenLayer, HitTarget, InputSource, InputSourceId, Instant, LayerHit,
        LayerId, MouseInput, MouseSource, NodeId, Pointer, PointerFrame, PointerId,
        PointerListener, Rect, RegionLayer, StandardInput, TouchConfig, TouchEvent, TouchLayer,
        TouchPhase, TouchSource, Vec2, Vec3,
    };
    pub use fingertip_gestures::{
        FlickConfig, FlickDirection, FlickGesture, GestureContext, GestureEvent, GestureEventKind,
        GestureHandle, GestureKind, GestureState, LongPressConfig, LongPressGesture,
        PinnedTransformConfig, PinnedTransformGesture, PressGesture, Recognizer, ReleaseGesture,
        TapConfig, TapGesture, TransformConfig, TransformDelta, TransformGesture, TransformSink,
        TransformStore, TransformTypes,
    };
}
