#![forbid(unsafe_code)]

//! Single and multi tap.

use fingertip_core::{Instant, PointerId, Vec2};

use crate::context::GestureContext;
use crate::events::GestureEventKind;
use crate::kind::Recognizer;
use crate::recognizers::{limit_px, seconds};
use crate::state::GestureState;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TapConfig {
    /// Taps needed to recognize.
    pub number_of_taps: u32,
    /// Whole sequence must finish within this many seconds.
    pub time_limit_secs: Option<f32>,
    /// Maximum drift from the first press, in centimeters.
    pub distance_limit_cm: Option<f32>,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            number_of_taps: 1,
            time_limit_secs: None,
            distance_limit_cm: None,
        }
    }
}

impl TapConfig {
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.number_of_taps == 0 {
            errors.push("tap.number_of_taps must be at least 1".to_string());
        }
        if let Some(limit) = self.time_limit_secs
            && !(limit.is_finite() && limit > 0.0)
        {
            errors.push(format!("tap.time_limit_secs must be positive, got {limit}"));
        }
        if let Some(limit) = self.distance_limit_cm
            && !(limit >= 0.0)
        {
            errors.push(format!("tap.distance_limit_cm must be non-negative, got {limit}"));
        }
        errors
    }
}

/// Recognizes `number_of_taps` press/release cycles. Fails on drift past
/// the distance limit or when the time limit runs out.
#[derive(Debug, Clone, Default)]
pub struct TapGesture {
    config: TapConfig,
    taps_done: u32,
    start: Option<Vec2>,
    deadline: Option<Instant>,
}

impl TapGesture {
    #[must_use]
    pub fn new(config: TapConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &TapConfig {
        &self.config
    }

    /// Completed taps in the current attempt.
    #[must_use]
    pub fn taps_done(&self) -> u32 {
        self.taps_done
    }

    fn drifted(&self, ctx: &GestureContext<'_, '_>) -> bool {
        if ctx.state() != GestureState::Possible {
            return false;
        }
        let limit = limit_px(self.config.distance_limit_cm, ctx.dots_per_cm());
        match (self.start, ctx.screen_position()) {
            (Some(start), Some(position)) => start.distance(position) > limit,
            _ => false,
        }
    }
}

impl Recognizer for TapGesture {
    fn name(&self) -> &'static str {
        "tap"
    }

    fn pointers_pressed(&mut self, ctx: &mut GestureContext<'_, '_>, pointers: &[PointerId]) {
        if ctx.num_pointers() != pointers.len() {
            return;
        }
        if self.taps_done == 0 {
            self.start = ctx.screen_position();
            if let Some(limit) = self.config.time_limit_secs {
                self.deadline = ctx.now().checked_add(seconds(limit));
            }
        } else if self.drifted(ctx) {
            ctx.set_state(GestureState::Failed);
        }
    }

    fn pointers_updated(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        if self.drifted(ctx) {
            ctx.set_state(GestureState::Failed);
        }
    }

    fn pointers_released(&mut self, ctx: &mut GestureContext<'_, '_>, _pointers: &[PointerId]) {
        if ctx.num_pointers() != 0 || ctx.state() != GestureState::Possible {
            return;
        }
        if self.drifted(ctx) {
            ctx.set_state(GestureState::Failed);
            return;
        }
        self.taps_done += 1;
        if self.taps_done >= self.config.number_of_taps {
            ctx.set_state(GestureState::Ended);
        }
    }

    fn tick(&mut self, ctx: &mut GestureContext<'_, '_>) {
        if let Some(deadline) = self.deadline
            && ctx.now() >= deadline
            && ctx.state() == GestureState::Possible
        {
            self.deadline = None;
            ctx.set_state(GestureState::Failed);
        }
    }

    fn on_state_entered(&mut self, ctx: &mut GestureContext<'_, '_>, state: GestureState) {
        if state == GestureState::Ended {
            let position = ctx.screen_position().unwrap_or_default();
            ctx.emit(GestureEventKind::Tapped { position });
        }
    }

    fn reset(&mut self) {
        self.taps_done = 0;
        self.start = None;
        self.deadline = None;
    }
}
