//! Configuration file handling
//!
//! Settings for capture devices, the recorder and artifact URLs, stored as TOML.
//! Every key is optional; missing keys fall back to their defaults.

use crate::recorder::blob::DEFAULT_ORIGIN;
use crate::recorder::{RecorderOptions, DEFAULT_MIME_TYPE};
use crate::utils::error::RelayResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "capture_relay=debug";

/// Capture device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_true")]
    pub video: bool,

    #[serde(default = "default_true")]
    pub audio: bool,

    /// Microphone to use. Options:
    /// - "default" for the system default input
    /// - numeric index from `capture-relay list-devices`
    /// - device name from `capture-relay list-devices`
    #[serde(default = "default_device")]
    pub audio_device: String,

    /// Camera to use, same forms as `audio_device`
    #[serde(default = "default_device")]
    pub camera: String,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_fps")]
    pub fps: u32,
}

fn default_true() -> bool {
    true
}

fn default_device() -> String {
    "default".to_string()
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> u32 {
    30
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
            audio_device: default_device(),
            camera: default_device(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
        }
    }
}

/// Options handed to the recorder on enable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderConfig {
    #[serde(default = "default_mime_type")]
    pub mime_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bits_per_second: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bits_per_second: Option<u32>,
}

fn default_mime_type() -> String {
    DEFAULT_MIME_TYPE.to_string()
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            mime_type: default_mime_type(),
            audio_bits_per_second: None,
            video_bits_per_second: None,
        }
    }
}

impl RecorderConfig {
    pub fn to_options(&self) -> RecorderOptions {
        RecorderOptions {
            audio_bits_per_second: self.audio_bits_per_second,
            video_bits_per_second: self.video_bits_per_second,
            ..RecorderOptions::with_mime_type(self.mime_type.clone())
        }
    }
}

/// Object URL settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactsConfig {
    /// Origin part of `blob:<origin>/<id>` URLs
    #[serde(default = "default_origin")]
    pub origin: String,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub recorder: RecorderConfig,

    #[serde(default)]
    pub artifacts: ArtifactsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Read configuration from a TOML file
    pub fn load(path: &Path) -> RelayResult<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> RelayResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> RelayResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::debug!("Saved configuration to {}", path.display());
        Ok(())
    }

    /// Recorder options for `enable`
    pub fn recorder_options(&self) -> RecorderOptions {
        self.recorder.to_options()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::RelayError;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = RelayConfig::from_toml_str("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.capture.width, 1280);
        assert_eq!(config.capture.height, 720);
        assert_eq!(config.capture.fps, 30);
        assert_eq!(config.artifacts.origin, "capture-relay");
        assert_eq!(config.logging.filter, "capture_relay=debug");
    }

    #[test]
    fn test_partial_sections() {
        let config = RelayConfig::from_toml_str(
            r#"
            [capture]
            camera = "1"
            audio = false

            [recorder]
            mime_type = "video/webm;codecs=vp8,opus"
            video_bits_per_second = 2500000
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.camera, "1");
        assert!(!config.capture.audio);
        assert!(config.capture.video);
        assert_eq!(config.capture.audio_device, "default");

        let options = config.recorder_options();
        assert_eq!(options.mime_type.as_deref(), Some("video/webm;codecs=vp8,opus"));
        assert_eq!(options.video_bits_per_second, Some(2_500_000));
        assert_eq!(options.audio_bits_per_second, None);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let result = RelayConfig::from_toml_str("[capture\nwidth = ");
        assert!(matches!(result, Err(RelayError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("relay.toml");

        let mut config = RelayConfig::default();
        config.capture.fps = 15;
        config.artifacts.origin = "localhost".to_string();
        config.save(&path).unwrap();

        assert_eq!(RelayConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RelayConfig::load(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(RelayError::Io(_))));
    }
}
