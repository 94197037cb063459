#![forbid(unsafe_code)]

//! Press and hold.

use fingertip_core::{Instant, PointerId, Vec2};

use crate::context::GestureContext;
use crate::events::GestureEventKind;
use crate::kind::Recognizer;
use crate::recognizers::{limit_px, seconds};
use crate::state::GestureState;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LongPressConfig {
    /// Hold time before recognition.
    pub time_to_press_secs: f32,
    /// Maximum drift while holding, in centimeters.
    pub distance_limit_cm: Option<f32>,
}

impl Default for LongPressConfig {
    fn default() -> Self {
        Self {
            time_to_press_secs: 1.0,
            distance_limit_cm: None,
        }
    }
}

impl LongPressConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.time_to_press_secs.is_finite() && self.time_to_press_secs >= 0.0) {
            errors.push(format!(
                "long_press.time_to_press_secs must be non-negative, got {}",
                self.time_to_press_secs
            ));
        }
        if let Some(limit) = self.distance_limit_cm
            && !(limit >= 0.0)
        {
            errors.push(format!("long_press.distance_limit_cm must be non-negative, got {limit}"));
        }
        errors
    }
}

/// Ends once pointers have been held for `time_to_press_secs` without
/// drifting; fails if they lift or drift first.
#[derive(Debug, Clone, Default)]
pub struct LongPressGesture {
    config: LongPressConfig,
    start: Option<Vec2>,
    deadline: Option<Instant>,
}

impl LongPressGesture {
    #[must_use]
    pub fn new(config: LongPressConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &LongPressConfig {
        &self.config
    }
}

impl Recognizer for LongPressGesture {
    fn name(&self) -> &'static str {
        "long_press"
    }

    fn pointers_pressed(&mut self, ctx: &mut GestureContext<'_, '_>, pointers: &[PointerId]) {
        if ctx.num_pointers() != pointers.len() {
            return;
        }
        self.start = ctx.screen_position();
        self.deadline = ctx
            .now()
            .checked_add(seconds(self.config.time_to_press_secs));
    }

    fn pointers_updated(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        let limit = limit_px(self.config.distance_limit_cm, ctx.dots_per_cm());
        if ctx.state() == GestureState::Possible
            && let (Some(start), Some(position)) = (self.start, ctx.screen_position())
            && start.distance(position) > limit
        {
            self.deadline = None;
            ctx.set_state(GestureState::Failed);
        }
    }

    fn pointers_released(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        if ctx.num_pointers() == 0 && ctx.state() == GestureState::Possible {
            self.deadline = None;
            ctx.set_state(GestureState::Failed);
        }
    }

    fn tick(&mut self, ctx: &mut GestureContext<'_, '_>) {
        if let Some(deadline) = self.deadline
            && ctx.now() >= deadline
            && ctx.state() == GestureState::Possible
        {
            self.deadline = None;
            ctx.set_state(GestureState::Ended);
        }
    }

    fn on_state_entered(&mut self, ctx: &mut GestureContext<'_, '_>, state: GestureState) {
        if state == GestureState::Ended {
            let position = ctx.screen_position().unwrap_or_default();
            ctx.emit(GestureEventKind::LongPressed { position });
        }
    }

    fn reset(&mut self) {
        self.start = None;
        self.deadline = None;
    }
}
