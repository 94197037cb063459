#![forbid(unsafe_code)]

//! Quick swipe, measured over the final moments before release.

use std::collections::VecDeque;
use std::time::Duration;

use fingertip_core::{Instant, PointerId, Vec2};

use crate::context::GestureContext;
use crate::events::GestureEventKind;
use crate::kind::Recognizer;
use crate::recognizers::seconds;
use crate::state::GestureState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FlickDirection {
    #[default]
    Any,
    Horizontal,
    Vertical,
}

impl FlickDirection {
    fn project(self, vector: Vec2) -> Vec2 {
        match self {
            Self::Any => vector,
            Self::Horizontal => Vec2::new(vector.x, 0.0),
            Self::Vertical => Vec2::new(0.0, vector.y),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FlickConfig {
    /// Window before release the flick vector is measured over.
    pub flick_time_secs: f32,
    /// Minimum flick length, in centimeters.
    pub min_distance_cm: f32,
    /// Movement needed before motion counts at all, in centimeters.
    pub movement_threshold_cm: f32,
    pub direction: FlickDirection,
}

impl Default for FlickConfig {
    fn default() -> Self {
        Self {
            flick_time_secs: 0.1,
            min_distance_cm: 1.0,
            movement_threshold_cm: 0.5,
            direction: FlickDirection::Any,
        }
    }
}

impl FlickConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.flick_time_secs.is_finite() && self.flick_time_secs > 0.0) {
            errors.push(format!(
                "flick.flick_time_secs must be positive, got {}",
                self.flick_time_secs
            ));
        }
        if !(self.min_distance_cm >= 0.0) {
            errors.push(format!(
                "flick.min_distance_cm must be non-negative, got {}",
                self.min_distance_cm
            ));
        }
        if !(self.movement_threshold_cm >= 0.0) {
            errors.push(format!(
                "flick.movement_threshold_cm must be non-negative, got {}",
                self.movement_threshold_cm
            ));
        }
        errors
    }
}

/// Ends on release when the pointers covered `min_distance_cm` within the
/// last `flick_time_secs`.
#[derive(Debug, Clone, Default)]
pub struct FlickGesture {
    config: FlickConfig,
    moving: bool,
    movement: Vec2,
    /// Per-update centroid deltas inside the flick window.
    samples: VecDeque<(Instant, Vec2)>,
    vector: Vec2,
    duration: Duration,
}

impl FlickGesture {
    #[must_use]
    pub fn new(config: FlickConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &FlickConfig {
        &self.config
    }

    fn trim(&mut self, now: Instant) {
        let window = seconds(self.config.flick_time_secs);
        while let Some(&(at, _)) = self.samples.front() {
            if now.duration_since(at) > window {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Recognizer for FlickGesture {
    fn name(&self) -> &'static str {
        "flick"
    }

    fn pointers_pressed(&mut self, ctx: &mut GestureContext<'_, '_>, pointers: &[PointerId]) {
        if ctx.num_pointers() == pointers.len() {
            self.samples.clear();
            self.moving = false;
            self.movement = Vec2::ZERO;
        }
    }

    fn pointers_updated(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        let (Some(position), Some(previous)) = (ctx.screen_position(), ctx.previous_screen_position())
        else {
            return;
        };
        let delta = position - previous;
        let now = ctx.now();
        self.samples.push_back((now, delta));
        self.trim(now);
        if !self.moving {
            self.movement += delta;
            if self.movement.length() > self.config.movement_threshold_cm * ctx.dots_per_cm() {
                self.moving = true;
            }
        }
    }

    fn pointers_released(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        if ctx.num_pointers() != 0 || ctx.state() != GestureState::Possible {
            return;
        }
        if !self.moving {
            ctx.set_state(GestureState::Failed);
            return;
        }
        let now = ctx.now();
        self.trim(now);
        let vector = self
            .config
            .direction
            .project(self.samples.iter().fold(Vec2::ZERO, |sum, (_, d)| sum + *d));
        let duration = self
            .samples
            .front()
            .map_or(Duration::ZERO, |(at, _)| now.duration_since(*at));
        if vector.length() < self.config.min_distance_cm * ctx.dots_per_cm() {
            ctx.set_state(GestureState::Failed);
            return;
        }
        self.vector = vector;
        self.duration = duration;
        ctx.set_state(GestureState::Ended);
    }

    fn on_state_entered(&mut self, ctx: &mut GestureContext<'_, '_>, state: GestureState) {
        if state == GestureState::Ended {
            ctx.emit(GestureEventKind::Flicked {
                vector: self.vector,
                duration: self.duration,
            });
        }
    }

    fn reset(&mut self) {
        self.moving = false;
        self.movement = Vec2::ZERO;
        self.samples.clear();
        self.vector = Vec2::ZERO;
        self.duration = Duration::ZERO;
    }
}
