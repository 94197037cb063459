#![forbid(unsafe_code)]

//! Built-in recognizers.
//!
//! Distances in configuration are centimeters and are converted with the
//! frame's dots-per-centimeter; durations are seconds.

mod flick;
mod long_press;
mod pinned;
mod press;
mod release;
mod tap;
mod transform;

use std::time::Duration;

pub use flick::{FlickConfig, FlickDirection, FlickGesture};
pub use long_press::{LongPressConfig, LongPressGesture};
pub use pinned::{PinnedTransformConfig, PinnedTransformGesture};
pub use press::PressGesture;
pub use release::ReleaseGesture;
pub use tap::{TapConfig, TapGesture};
pub use transform::{TransformConfig, TransformGesture};

/// Seconds to a duration; negative or non-finite values clamp to zero.
pub(crate) fn seconds(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs).unwrap_or(Duration::ZERO)
}

/// Optional centimeter limit in pixels; `None` means unlimited.
pub(crate) fn limit_px(limit_cm: Option<f32>, dots_per_cm: f32) -> f32 {
    limit_cm.map_or(f32::INFINITY, |cm| cm * dots_per_cm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_clamp() {
        assert_eq!(seconds(0.5), Duration::from_millis(500));
        assert_eq!(seconds(-1.0), Duration::ZERO);
        assert_eq!(seconds(f32::NAN), Duration::ZERO);
    }

    #[test]
    fn unlimited_distance() {
        assert!(limit_px(None, 37.8).is_infinite());
        assert_eq!(limit_px(Some(2.0), 10.0), 20.0);
    }
}
