#![forbid(unsafe_code)]

//! Tracing targets and optional subscriber setup.
//!
//! The pipeline only emits `tracing` events; installing a subscriber is the
//! host's call. With the `subscriber` feature, [`init`] installs a plain
//! formatter filtered by `RUST_LOG` when set, otherwise by `default_filter`.

pub use fingertip_core::logging::{
    TARGET_GESTURE, TARGET_INPUT, TARGET_LAYER, TARGET_TOUCH, TARGETS,
};

/// Filter directive enabling `level` for every fingertip target.
#[must_use]
pub fn directive(level: &str) -> String {
    TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install a global fmt subscriber. Returns `false` if one was already set.
#[cfg(feature = "subscriber")]
pub fn init(default_filter: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
