#![forbid(unsafe_code)]

//! Gesture recognition states.
//!
//! ```text
//!          first pointer          recognize (arbitrated)
//!   Idle ───────────────▶ Possible ──────────────▶ Began ──▶ Changed ─┐
//!    ▲                      │  │                     │  ▲──────────┘  │
//!    │                      │  └── recognize ──▶ Ended ◀──────────────┤
//!    │                      └──▶ Failed                │              │
//!    │                                  Cancelled ◀────┴──────────────┘
//!    └──────────── deferred reset (Ended / Failed / Cancelled) ────────
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Possible,
    Began,
    Changed,
    /// Recognized. Discrete gestures go here straight from `Possible`.
    Ended,
    Cancelled,
    Failed,
}

impl GestureState {
    /// `Began` or `Changed`: a continuous gesture in progress.
    #[inline]
    #[must_use]
    pub const fn is_started(self) -> bool {
        matches!(self, Self::Began | Self::Changed)
    }

    /// `Idle` or `Possible`.
    #[inline]
    #[must_use]
    pub const fn is_waiting(self) -> bool {
        matches!(self, Self::Idle | Self::Possible)
    }

    /// Waiting for the deferred reset.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled | Self::Failed)
    }

    /// States that require winning arbitration.
    #[inline]
    #[must_use]
    pub const fn is_recognition(self) -> bool {
        matches!(self, Self::Began | Self::Ended)
    }
}

impl fmt::Display for GestureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Possible => "possible",
            Self::Began => "began",
            Self::Changed => "changed",
            Self::Ended => "ended",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Whether a gesture currently holds any pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PointersNumState {
    /// Nothing delivered since the last reset.
    #[default]
    Reset,
    /// Had pointers, all gone now.
    None,
    Exists,
}

impl PointersNumState {
    #[must_use]
    pub fn from_count(count: usize) -> Self {
        if count == 0 { Self::None } else { Self::Exists }
    }
}
