//! Session configuration.

use std::path::Path;

use duet_core::PathStyle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::StrokeFraming;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Drawing session settings shared by the synchronizer and assembler.
///
/// The wire cap is not part of this: it is fixed at
/// [`WIRE_CAP`](crate::codec::WIRE_CAP).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Stroke boundary representation; both peers must match.
    pub framing: StrokeFraming,
    /// Style of strokes drawn on this device.
    pub local_style: PathStyle,
    /// Style of strokes received from the peer.
    pub remote_style: PathStyle,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            framing: StrokeFraming::Marked,
            local_style: PathStyle::local_default(),
            remote_style: PathStyle::remote_default(),
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        log::debug!("Loaded session config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Config speaking the bare coordinate-list wire format.
    pub fn legacy() -> Self {
        Self {
            framing: StrokeFraming::Legacy,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_core::Color;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.framing, StrokeFraming::Marked);
        assert_eq!(config.local_style.color, Color::from_argb(0xFFFF_FF00));
        assert_eq!(config.remote_style.color, Color::from_argb(0xFFFF_00FF));
        assert_eq!(config.local_style.width, 3.0);
    }

    #[test]
    fn test_partial_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "framing": "legacy" }}"#).unwrap();

        let config = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.framing, StrokeFraming::Legacy);
        assert_eq!(config.remote_style, PathStyle::remote_default());
    }

    #[test]
    fn test_full_json_roundtrip() {
        let mut original = SessionConfig::legacy();
        original.local_style.width = 7.5;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string_pretty(&original).unwrap().as_bytes())
            .unwrap();

        let loaded = SessionConfig::from_json_file(file.path()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_file() {
        let result = SessionConfig::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ framing: ").unwrap();
        assert!(matches!(
            SessionConfig::from_json_file(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
