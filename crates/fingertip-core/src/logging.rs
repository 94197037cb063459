#![forbid(unsafe_code)]

//! Tracing targets and panic reporting shared by the pipeline crates.
//!
//! Filter on these targets to focus on one subsystem, e.g.
//! `RUST_LOG=fingertip.gesture=debug`.

use std::any::Any;

/// Frame pipeline, pool and listener dispatch.
pub const TARGET_TOUCH: &str = "fingertip.touch";
/// Layer registration and hit testing.
pub const TARGET_LAYER: &str = "fingertip.layer";
/// Input sources.
pub const TARGET_INPUT: &str = "fingertip.input";
/// Gesture state machine and arbitration.
pub const TARGET_GESTURE: &str = "fingertip.gesture";

/// Every target, for building filters.
pub const TARGETS: [&str; 4] = [TARGET_TOUCH, TARGET_LAYER, TARGET_INPUT, TARGET_GESTURE];

/// Best-effort text of a caught panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}
