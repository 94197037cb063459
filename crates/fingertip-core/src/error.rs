#![forbid(unsafe_code)]

//! Errors returned by the pointer pipeline.
//!
//! Only expected negative outcomes surface here. Contract violations are
//! `debug_assert!`s, and listener panics are caught and logged by the
//! pipeline instead of being propagated.

use std::fmt;

use crate::input::InputSourceId;
use crate::layer::LayerId;
use crate::pointer::PointerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TouchError {
    /// The pointer was never issued or has already been recycled.
    UnknownPointer(PointerId),
    /// No input source is registered under this id.
    UnknownInputSource(InputSourceId),
    UnknownLayer(LayerId),
    /// A layer with this id is already registered.
    DuplicateLayer(LayerId),
    /// The manager was shut down.
    ShutDown,
}

impl TouchError {
    /// Label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownPointer(_) => "unknown_pointer",
            Self::UnknownInputSource(_) => "unknown_input_source",
            Self::UnknownLayer(_) => "unknown_layer",
            Self::DuplicateLayer(_) => "duplicate_layer",
            Self::ShutDown => "shut_down",
        }
    }
}

impl fmt::Display for TouchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPointer(id) => write!(f, "unknown pointer {id}"),
            Self::UnknownInputSource(id) => write!(f, "unknown input source {id}"),
            Self::UnknownLayer(id) => write!(f, "unknown layer {id}"),
            Self::DuplicateLayer(id) => write!(f, "layer {id} is already registered"),
            Self::ShutDown => write!(f, "touch manager is shut down"),
        }
    }
}

impl std::error::Error for TouchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_subject() {
        assert_eq!(
            TouchError::UnknownPointer(PointerId(3)).to_string(),
            "unknown pointer ptr#3"
        );
        assert_eq!(
            TouchError::DuplicateLayer(LayerId(2)).to_string(),
            "layer layer#2 is already registered"
        );
        assert_eq!(TouchError::ShutDown.error_type(), "shut_down");
    }
}
