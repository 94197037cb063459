#![forbid(unsafe_code)]

//! Rotate and scale about a fixed pivot with a single pointer.

use fingertip_core::{PointerId, Vec2};

use crate::context::GestureContext;
use crate::kind::Recognizer;
use crate::recognizers::transform::{announce, finish, publish};
use crate::state::GestureState;
use crate::transform_math::{
    DeltaAccumulator, TransformDelta, TransformTypes, rotation_delta, rotation_pixels,
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PinnedTransformConfig {
    /// Screen motion needed before the transform starts, in centimeters.
    pub threshold_cm: f32,
    /// Translation is ignored.
    pub types: TransformTypes,
}

impl Default for PinnedTransformConfig {
    fn default() -> Self {
        Self {
            threshold_cm: 0.1,
            types: TransformTypes::ROTATION | TransformTypes::SCALING,
        }
    }
}

/// Screen-space transform of the first pointer around a host-supplied
/// pivot, usually the object's projected center.
#[derive(Debug, Clone)]
pub struct PinnedTransformGesture {
    config: PinnedTransformConfig,
    pivot: Vec2,
    accumulator: DeltaAccumulator,
    last_delta: TransformDelta,
}

impl Default for PinnedTransformGesture {
    fn default() -> Self {
        Self::new(PinnedTransformConfig::default(), Vec2::ZERO)
    }
}

impl PinnedTransformGesture {
    #[must_use]
    pub fn new(config: PinnedTransformConfig, pivot: Vec2) -> Self {
        Self {
            config,
            pivot,
            accumulator: DeltaAccumulator::new(),
            last_delta: TransformDelta::IDENTITY,
        }
    }

    #[must_use]
    pub fn pivot(&self) -> Vec2 {
        self.pivot
    }

    pub fn set_pivot(&mut self, pivot: Vec2) {
        self.pivot = pivot;
    }

    #[must_use]
    pub fn last_delta(&self) -> TransformDelta {
        self.last_delta
    }

    fn compute(&mut self, old: Vec2, new: Vec2, dots_per_cm: f32) -> TransformDelta {
        let threshold = self.config.threshold_cm * dots_per_cm;
        let pivot = self.pivot;
        let mut delta = TransformDelta::IDENTITY;
        // A pointer sitting on the pivot has no defined angle or radius.
        if old.distance(pivot) <= f32::EPSILON || new.distance(pivot) <= f32::EPSILON {
            return delta;
        }
        if self.config.types.contains(TransformTypes::ROTATION) {
            delta.rotation = self.accumulator.rotation(
                rotation_pixels(pivot, old, pivot, new),
                rotation_delta(
                    pivot.extend(0.0),
                    old.extend(0.0),
                    pivot.extend(0.0),
                    new.extend(0.0),
                    delta.normal,
                ),
                threshold,
            );
        }
        if self.config.types.contains(TransformTypes::SCALING) {
            delta.scale = self.accumulator.scaling(
                new.distance(pivot) - old.distance(pivot),
                new.distance(pivot) / old.distance(pivot),
                threshold,
            );
        }
        delta
    }
}

impl Recognizer for PinnedTransformGesture {
    fn name(&self) -> &'static str {
        "pinned_transform"
    }

    fn pointers_updated(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        let Some((old, new)) = ctx.pointer_motion(0) else {
            return;
        };
        let delta = self.compute(old, new, ctx.dots_per_cm());
        publish(ctx, &self.accumulator, delta, &mut self.last_delta);
    }

    fn pointers_released(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        finish(ctx);
    }

    fn on_state_entered(&mut self, ctx: &mut GestureContext<'_, '_>, state: GestureState) {
        announce(ctx, state, self.last_delta);
    }

    fn reset(&mut self) {
        self.accumulator.reset();
        self.last_delta = TransformDelta::IDENTITY;
    }
}
