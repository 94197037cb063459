#![forbid(unsafe_code)]

//! One configuration document for the pipeline and the built-in recognizers.
//!
//! Every section has defaults, so a file only names what it changes:
//!
//! ```toml
//! [touch]
//! dpi = 160.0
//!
//! [tap]
//! number_of_taps = 2
//! time_limit_secs = 0.3
//! ```
//!
//! Loading (`from_toml_*`, `from_json_*`) needs the `config` feature.
//! Loading only parses; call [`FingertipConfig::validate`] or
//! [`FingertipConfig::validated`] before use.

#[cfg(feature = "config")]
use std::path::Path;

use fingertip_core::TouchConfig;
use fingertip_gestures::{
    FlickConfig, FlickGesture, LongPressConfig, LongPressGesture, TapConfig, TapGesture,
    TransformConfig, TransformGesture,
};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct FingertipConfig {
    pub touch: TouchConfig,
    pub tap: TapConfig,
    pub long_press: LongPressConfig,
    pub flick: FlickConfig,
    pub transform: TransformConfig,
}

impl FingertipConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&read(path.as_ref())?)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path.as_ref())?)
    }

    /// Serialize to pretty TOML.
    #[cfg(feature = "config")]
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Range problems across every section; empty when valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.touch.validate();
        errors.extend(self.tap.validate());
        errors.extend(self.long_press.validate());
        errors.extend(self.flick.validate());
        errors.extend(self.transform.validate());
        errors
    }

    /// `self` if valid, otherwise every problem at once.
    pub fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    #[must_use]
    pub fn tap_gesture(&self) -> TapGesture {
        TapGesture::new(self.tap.clone())
    }

    #[must_use]
    pub fn long_press_gesture(&self) -> LongPressGesture {
        LongPressGesture::new(self.long_press.clone())
    }

    #[must_use]
    pub fn flick_gesture(&self) -> FlickGesture {
        FlickGesture::new(self.flick.clone())
    }

    #[must_use]
    pub fn transform_gesture(&self) -> TransformGesture {
        TransformGesture::new(self.transform.clone())
    }
}

#[cfg(feature = "config")]
fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
