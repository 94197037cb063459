#![forbid(unsafe_code)]

//! Errors returned by gesture registration and control.
//!
//! Recognition never errors: a gesture that loses arbitration simply ends up
//! `Failed`.

use std::fmt;

use fingertip_core::NodeId;

use crate::gesture::GestureHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureError {
    /// The node is not registered in the scene.
    UnknownNode(NodeId),
    /// The handle is stale or was never issued.
    UnknownGesture(GestureHandle),
    /// The manager was shut down.
    ManagerShutDown,
    /// Re-parenting would make a node its own ancestor.
    HierarchyCycle { node: NodeId, parent: NodeId },
}

impl GestureError {
    /// Label for tracing fields.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownNode(_) => "unknown_node",
            Self::UnknownGesture(_) => "unknown_gesture",
            Self::ManagerShutDown => "manager_shut_down",
            Self::HierarchyCycle { .. } => "hierarchy_cycle",
        }
    }
}

impl fmt::Display for GestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNode(node) => write!(f, "unknown scene node {node}"),
            Self::UnknownGesture(handle) => write!(f, "unknown gesture {handle}"),
            Self::ManagerShutDown => write!(f, "gesture manager is shut down"),
            Self::HierarchyCycle { node, parent } => {
                write!(f, "parenting {node} under {parent} would create a cycle")
            }
        }
    }
}

impl std::error::Error for GestureError {}
