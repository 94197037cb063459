#![forbid(unsafe_code)]

//! Free-form translate/rotate/scale with one or more pointers.
//!
//! One pointer, or two pointers closer than `min_points_distance_cm`,
//! only translate by the centroid motion. Two pointers far enough apart
//! also rotate and scale; translation is then the motion of the first
//! pointer that rotation and scale about the old pair center do not explain.

use fingertip_core::{PointerId, Vec2};

use crate::context::GestureContext;
use crate::events::GestureEventKind;
use crate::kind::Recognizer;
use crate::state::GestureState;
use crate::transform_math::{
    DeltaAccumulator, OrthographicProjector, ProjectionMode, Projector, TransformDelta,
    TransformTypes, project_point, rotation_delta, rotation_pixels, scale_delta,
    two_point_translation,
};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TransformConfig {
    /// Screen motion needed before the transform starts, in centimeters.
    pub threshold_cm: f32,
    /// Two pointers closer than this only translate, in centimeters.
    pub min_points_distance_cm: f32,
    pub types: TransformTypes,
    pub projection: ProjectionMode,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            threshold_cm: 0.1,
            min_points_distance_cm: 0.5,
            types: TransformTypes::all(),
            projection: ProjectionMode::Screen,
        }
    }
}

impl TransformConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.threshold_cm >= 0.0) {
            errors.push(format!("transform.threshold_cm must be non-negative, got {}", self.threshold_cm));
        }
        if !(self.min_points_distance_cm >= 0.0) {
            errors.push(format!(
                "transform.min_points_distance_cm must be non-negative, got {}",
                self.min_points_distance_cm
            ));
        }
        if self.types.is_empty() {
            errors.push("transform.types must enable at least one component".to_string());
        }
        errors
    }
}

#[derive(Debug)]
pub struct TransformGesture {
    config: TransformConfig,
    projector: Box<dyn Projector>,
    accumulator: DeltaAccumulator,
    last_delta: TransformDelta,
}

impl Default for TransformGesture {
    fn default() -> Self {
        Self::new(TransformConfig::default())
    }
}

impl TransformGesture {
    #[must_use]
    pub fn new(config: TransformConfig) -> Self {
        Self {
            config,
            projector: Box::new(OrthographicProjector::default()),
            accumulator: DeltaAccumulator::new(),
            last_delta: TransformDelta::IDENTITY,
        }
    }

    /// Use a host camera for non-screen projection modes.
    #[must_use]
    pub fn with_projector(mut self, projector: Box<dyn Projector>) -> Self {
        self.projector = projector;
        self
    }

    #[must_use]
    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// The delta most recently published.
    #[must_use]
    pub fn last_delta(&self) -> TransformDelta {
        self.last_delta
    }

    fn compute(&mut self, ctx: &GestureContext<'_, '_>) -> TransformDelta {
        let dots_per_cm = ctx.dots_per_cm();
        let threshold = self.config.threshold_cm * dots_per_cm;
        let min_distance = self.config.min_points_distance_cm * dots_per_cm;
        let types = self.config.types;
        let plane = self.config.projection.plane(self.projector.as_ref());
        let projector = self.projector.as_ref();
        let project = |screen: Vec2| project_point(screen, plane.as_ref(), projector);

        let mut delta = TransformDelta {
            normal: self.config.projection.normal(projector),
            ..TransformDelta::IDENTITY
        };

        let pair = if ctx.num_pointers() >= 2 && types.intersects(TransformTypes::ROTATION | TransformTypes::SCALING) {
            ctx.pointer_motion(0).zip(ctx.pointer_motion(1))
        } else {
            None
        };
        let spread = pair.filter(|&((old1, new1), (old2, new2))| {
            old1.distance(old2) >= min_distance && new1.distance(new2) >= min_distance
        });

        match spread {
            Some(((old1, new1), (old2, new2))) => {
                let (p_old1, p_old2) = (project(old1), project(old2));
                let (p_new1, p_new2) = (project(new1), project(new2));
                if types.contains(TransformTypes::ROTATION) {
                    delta.rotation = self.accumulator.rotation(
                        rotation_pixels(old1, old2, new1, new2),
                        rotation_delta(p_old1, p_old2, p_new1, p_new2, delta.normal),
                        threshold,
                    );
                }
                if types.contains(TransformTypes::SCALING) {
                    delta.scale = self.accumulator.scaling(
                        new1.distance(new2) - old1.distance(old2),
                        scale_delta(p_old1, p_old2, p_new1, p_new2),
                        threshold,
                    );
                }
                if types.contains(TransformTypes::TRANSLATION) {
                    let screen = if delta.rotation == 0.0 && delta.scale == 1.0 {
                        self.accumulator.translation(new1 - old1, threshold)
                    } else {
                        two_point_translation(old1, old2, new1, delta.rotation, delta.scale)
                    };
                    delta.translation = project(old1 + screen) - p_old1;
                }
            }
            None => {
                // Pointers too close for a pair follow the first pointer.
                let motion = match pair {
                    Some(((old1, new1), _)) => Some((old1, new1)),
                    None => ctx.previous_screen_position().zip(ctx.screen_position()),
                };
                if types.contains(TransformTypes::TRANSLATION)
                    && let Some((old, new)) = motion
                {
                    let screen = self.accumulator.translation(new - old, threshold);
                    delta.translation = project(old + screen) - project(old);
                }
            }
        }
        delta
    }
}

/// Move a transform recognizer forward after computing `delta`.
pub(crate) fn publish(
    ctx: &mut GestureContext<'_, '_>,
    accumulator: &DeltaAccumulator,
    delta: TransformDelta,
    last_delta: &mut TransformDelta,
) {
    if !accumulator.is_transforming() || delta.is_identity() {
        return;
    }
    *last_delta = delta;
    match ctx.state() {
        GestureState::Idle | GestureState::Possible => {
            ctx.set_state(GestureState::Began);
        }
        GestureState::Began | GestureState::Changed => {
            ctx.set_state(GestureState::Changed);
        }
        _ => {}
    }
}

/// Finish once every pointer is gone.
pub(crate) fn finish(ctx: &mut GestureContext<'_, '_>) {
    if ctx.num_pointers() != 0 {
        return;
    }
    match ctx.state() {
        GestureState::Began | GestureState::Changed => {
            ctx.set_state(GestureState::Ended);
        }
        GestureState::Possible => {
            ctx.set_state(GestureState::Failed);
        }
        _ => {}
    }
}

/// Transform events for entering `state`.
pub(crate) fn announce(ctx: &mut GestureContext<'_, '_>, state: GestureState, delta: TransformDelta) {
    match state {
        GestureState::Began => {
            ctx.emit(GestureEventKind::TransformStarted);
            ctx.emit(GestureEventKind::Transformed(delta));
        }
        GestureState::Changed => ctx.emit(GestureEventKind::Transformed(delta)),
        GestureState::Ended => ctx.emit(GestureEventKind::TransformCompleted),
        _ => {}
    }
}

impl Recognizer for TransformGesture {
    fn name(&self) -> &'static str {
        "transform"
    }

    fn pointers_updated(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        if ctx.num_pointers() == 0 {
            return;
        }
        let delta = self.compute(ctx);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_validation() {
        assert!(TransformConfig::default().validate().is_empty());
        let bad = TransformConfig {
            threshold_cm: -1.0,
            types: TransformTypes::empty(),
            ..TransformConfig::default()
        };
        assert_eq!(bad.validate().len(), 2);
    }
}
