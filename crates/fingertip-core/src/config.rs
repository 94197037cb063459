#![forbid(unsafe_code)]

//! Pipeline configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Centimetres per inch.
pub const CM_PER_INCH: f32 = 2.54;

/// Tunables for [`TouchManager`](crate::manager::TouchManager).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TouchConfig {
    /// Screen density used to convert centimetre thresholds to pixels.
    pub dpi: f32,
    /// Global hit-testing switch; when off every press has no target.
    pub hit_testing: bool,
    /// Pointer slots allocated up front.
    pub pool_capacity: usize,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            hit_testing: true,
            pool_capacity: 16,
        }
    }
}

impl TouchConfig {
    #[must_use]
    pub fn dots_per_cm(&self) -> f32 {
        self.dpi / CM_PER_INCH
    }

    /// Range problems, one message each; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !(self.dpi.is_finite() && self.dpi > 0.0) {
            errors.push(format!("touch.dpi must be positive, got {}", self.dpi));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_density() {
        let config = TouchConfig::default();
        assert!((config.dots_per_cm() - 37.795_277).abs() < 1e-4);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn rejects_non_positive_dpi() {
        let config = TouchConfig {
            dpi: 0.0,
            ..TouchConfig::default()
        };
        assert_eq!(config.validate().len(), 1);
    }
}
