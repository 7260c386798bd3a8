//! Typed host notifications
//!
//! Message form of the [`HostBridge`](super::HostBridge) callbacks, for hosts
//! that prefer a channel of `(event, payload)` messages.

use serde::{Deserialize, Serialize};

/// Result of a finished recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMedia {
    /// `blob:` URL of the recorded artifact
    pub object_url: String,

    /// Artifact size in bytes
    pub file_size: u64,
}

/// A recorder error as reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderFailure {
    /// Error code
    #[serde(rename = "type")]
    pub code: u16,

    pub message: String,
}

/// One host notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum HostNotification {
    DataAvailable(f64),
    RecordingStopped(RecordedMedia),
    RecordingError(RecorderFailure),
    RecordingStarted(String),
    RecordingPaused(String),
    RecordingResumed(String),
}

impl HostNotification {
    /// Event name as sent to the host
    pub fn name(&self) -> &'static str {
        match self {
            HostNotification::DataAvailable(_) => "data-available",
            HostNotification::RecordingStopped(_) => "recording-stopped",
            HostNotification::RecordingError(_) => "recording-error",
            HostNotification::RecordingStarted(_) => "recording-started",
            HostNotification::RecordingPaused(_) => "recording-paused",
            HostNotification::RecordingResumed(_) => "recording-resumed",
        }
    }

    /// Rebuild a notification from an event name and the raw callback argument
    pub fn decode(event: &str, raw: &str) -> Result<Self, serde_json::Error> {
        let notification = match event {
            "data-available" => HostNotification::DataAvailable(serde_json::from_str(raw)?),
            "recording-stopped" => HostNotification::RecordingStopped(serde_json::from_str(raw)?),
            "recording-error" => HostNotification::RecordingError(serde_json::from_str(raw)?),
            "recording-started" => HostNotification::RecordingStarted(raw.to_string()),
            "recording-paused" => HostNotification::RecordingPaused(raw.to_string()),
            "recording-resumed" => HostNotification::RecordingResumed(raw.to_string()),
            other => {
                return Err(serde::de::Error::custom(format!("unknown event '{other}'")));
            }
        };
        Ok(notification)
    }
}
