//! Capture trait definitions
//!
//! Platform-agnostic traits and types for capture sources.

use super::stream::MediaStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while acquiring a capture stream
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    NotAllowed(String),

    #[error("Device not found: {0}")]
    NotFound(String),

    #[error("Device not readable: {0}")]
    NotReadable(String),

    #[error("Constraints cannot be satisfied: {0}")]
    Overconstrained(String),

    #[error("Capture aborted: {0}")]
    Aborted(String),
}

impl CaptureError {
    /// DOMException-style name of the error
    pub fn name(&self) -> &'static str {
        match self {
            CaptureError::NotAllowed(_) => "NotAllowedError",
            CaptureError::NotFound(_) => "NotFoundError",
            CaptureError::NotReadable(_) => "NotReadableError",
            CaptureError::Overconstrained(_) => "OverconstrainedError",
            CaptureError::Aborted(_) => "AbortError",
        }
    }

    /// Message without the kind prefix
    pub fn message(&self) -> &str {
        match self {
            CaptureError::NotAllowed(m)
            | CaptureError::NotFound(m)
            | CaptureError::NotReadable(m)
            | CaptureError::Overconstrained(m)
            | CaptureError::Aborted(m) => m,
        }
    }
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Which tracks a capture request asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl MediaConstraints {
    /// Combined camera and microphone capture
    pub const AUDIO_VIDEO: MediaConstraints = MediaConstraints {
        video: true,
        audio: true,
    };

    /// Whether at least one track kind is requested
    pub fn is_satisfiable(&self) -> bool {
        self.video || self.audio
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::AUDIO_VIDEO
    }
}

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// A track of a live capture stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub kind: TrackKind,

    /// Human readable device label
    pub label: String,
}

/// Source of live capture streams
///
/// The device side of the adapter: hands out a [`MediaStream`] for a set of
/// constraints, or fails when the request is denied or cannot be satisfied.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Request a live stream carrying the requested tracks
    async fn get_user_media(&self, constraints: MediaConstraints) -> CaptureResult<MediaStream>;
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDeviceInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Whether this is an input device
    pub is_input: bool,

    /// Whether this is the default device
    pub is_default: bool,
}

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Unique device ID
    pub id: String,

    /// Device name
    pub name: String,

    /// Supported resolutions
    pub supported_resolutions: Vec<Resolution>,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}
