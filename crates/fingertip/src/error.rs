#![forbid(unsafe_code)]

//! Unified error model for fingertip hosts.
//!
//! # Design Principles
//!
//! 1. **Result at the API edge**: registration, control and config loading
//!    return typed errors; recognition itself never errors.
//! 2. **Subsystem errors stay typed**: [`Error`] wraps the pipeline,
//!    gesture and configuration errors so callers can match on the one they
//!    care about and propagate the rest with `?`.
//! 3. **Shutdown is the only dead end**: every other variant leaves the
//!    system usable, which [`Error::is_recoverable`] reports.

use std::fmt;
use std::path::PathBuf;

pub use fingertip_core::TouchError;
pub use fingertip_gestures::GestureError;

// ── Configuration ───────────────────────────────────────────────────────

/// Loading or validating a [`FingertipConfig`](crate::config::FingertipConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// Reading the file failed.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// TOML parse error.
    #[cfg(feature = "config")]
    Toml(toml::de::Error),
    /// JSON parse error.
    #[cfg(feature = "config")]
    Json(serde_json::Error),
    /// Out-of-range values, one message each.
    Validation(Vec<String>),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "reading {}: {source}", path.display()),
            #[cfg(feature = "config")]
            Self::Toml(e) => write!(f, "TOML parse error: {e}"),
            #[cfg(feature = "config")]
            Self::Json(e) => write!(f, "JSON parse error: {e}"),
            Self::Validation(errors) => write!(f, "validation errors: {}", errors.join("; ")),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            #[cfg(feature = "config")]
            Self::Toml(e) => Some(e),
            #[cfg(feature = "config")]
            Self::Json(e) => Some(e),
            Self::Validation(_) => None,
        }
    }
}

// ── Unified Error ───────────────────────────────────────────────────────

/// Top-level error type for fingertip hosts.
#[derive(Debug)]
pub enum Error {
    /// Pointer pipeline failure.
    Touch(TouchError),
    /// Gesture registration or control failure.
    Gesture(GestureError),
    /// Configuration loading or validation failure.
    Config(ConfigError),
}

/// Standard result type for fingertip APIs.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Error type label for tracing fields, `"<subsystem>.<kind>"`.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Touch(e) => match e {
                TouchError::UnknownPointer(_) => "touch.unknown_pointer",
                TouchError::UnknownInputSource(_) => "touch.unknown_input_source",
                TouchError::UnknownLayer(_) => "touch.unknown_layer",
                TouchError::DuplicateLayer(_) => "touch.duplicate_layer",
                TouchError::ShutDown => "touch.shut_down",
            },
            Self::Gesture(e) => match e {
                GestureError::UnknownNode(_) => "gesture.unknown_node",
                GestureError::UnknownGesture(_) => "gesture.unknown_gesture",
                GestureError::ManagerShutDown => "gesture.manager_shut_down",
                GestureError::HierarchyCycle { .. } => "gesture.hierarchy_cycle",
            },
            Self::Config(e) => match e {
                ConfigError::Io { .. } => "config.io",
                #[cfg(feature = "config")]
                ConfigError::Toml(_) => "config.toml",
                #[cfg(feature = "config")]
                ConfigError::Json(_) => "config.json",
                ConfigError::Validation(_) => "config.validation",
            },
        }
    }

    /// Whether the system is still usable after this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::Touch(TouchError::ShutDown) | Self::Gesture(GestureError::ManagerShutDown)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Touch(err) => write!(f, "{err}"),
            Self::Gesture(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "config: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Touch(err) => Some(err),
            Self::Gesture(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

// ── From conversions ────────────────────────────────────────────────────

impl From<TouchError> for Error {
    fn from(err: TouchError) -> Self {
        Self::Touch(err)
    }
}

impl From<GestureError> for Error {
    fn from(err: GestureError) -> Self {
        Self::Gesture(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}
