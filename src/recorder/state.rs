//! Recording state management
//!
//! Defines the recorder state machine, the pass-through recorder options and
//! the segment clock used to timestamp fragments.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current state of a recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// Not recording
    #[default]
    Inactive,
    /// Currently recording
    Recording,
    /// Recording is paused
    Paused,
}

impl RecorderState {
    /// Label reported to the host
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Inactive => "inactive",
            RecorderState::Recording => "recording",
            RecorderState::Paused => "paused",
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, RecorderState::Inactive)
    }
}

impl std::fmt::Display for RecorderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options handed to the recorder unchanged by the adapter
///
/// Unknown keys are kept in `extra` so hosts can pass hints the recorder may
/// learn to use later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecorderOptions {
    /// Container/codec hint, e.g. `video/webm;codecs=vp9`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bits_per_second: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_bits_per_second: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits_per_second: Option<u32>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RecorderOptions {
    /// Options with only a MIME type set
    pub fn with_mime_type(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: Some(mime_type.into()),
            ..Self::default()
        }
    }

    /// Parse options from the host's JSON representation
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One uninterrupted stretch of recording
///
/// A new segment is started each time recording is resumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSegment {
    /// Segment index (0, 1, 2, ...)
    pub index: usize,

    /// Duration of this segment in milliseconds
    pub duration_ms: f64,

    /// Time when the segment started, relative to recording start
    pub process_time_start_ms: f64,

    /// Time when the segment ended
    pub process_time_end_ms: f64,

    /// Unix timestamp when the segment started
    pub unix_start_ms: u64,

    /// Unix timestamp when the segment ended
    pub unix_end_ms: u64,
}

impl RecordingSegment {
    /// Create a new segment starting now
    pub fn new(index: usize, process_time_ms: f64) -> Self {
        let now = Utc::now();
        Self {
            index,
            duration_ms: 0.0,
            process_time_start_ms: process_time_ms,
            process_time_end_ms: process_time_ms,
            unix_start_ms: now.timestamp_millis() as u64,
            unix_end_ms: now.timestamp_millis() as u64,
        }
    }

    /// End the segment
    pub fn end(&mut self, process_time_ms: f64) {
        self.process_time_end_ms = process_time_ms;
        self.duration_ms = self.process_time_end_ms - self.process_time_start_ms;
        self.unix_end_ms = Utc::now().timestamp_millis() as u64;
    }
}

/// Tracks recorded (unpaused) time across pause/resume cycles
#[derive(Debug, Clone, Default)]
pub struct RecordingClock {
    segments: Vec<RecordingSegment>,
    open: bool,
}

impl RecordingClock {
    /// Reset and open the first segment
    pub fn start(&mut self, process_time_ms: f64) {
        self.segments.clear();
        self.segments.push(RecordingSegment::new(0, process_time_ms));
        self.open = true;
    }

    /// Close the running segment
    pub fn pause(&mut self, process_time_ms: f64) {
        if !self.open {
            return;
        }
        if let Some(segment) = self.segments.last_mut() {
            segment.end(process_time_ms);
        }
        self.open = false;
    }

    /// Open a new segment
    pub fn resume(&mut self, process_time_ms: f64) {
        if self.open {
            return;
        }
        let index = self.segments.len();
        self.segments.push(RecordingSegment::new(index, process_time_ms));
        self.open = true;
    }

    /// Recorded milliseconds at `process_time_ms`
    pub fn recorded_ms(&self, process_time_ms: f64) -> f64 {
        let closed = if self.open {
            self.segments.len().saturating_sub(1)
        } else {
            self.segments.len()
        };

        let completed: f64 = self.segments.iter().take(closed).map(|s| s.duration_ms).sum();

        let current = if self.open {
            self.segments
                .last()
                .map(|s| process_time_ms - s.process_time_start_ms)
                .unwrap_or(0.0)
        } else {
            0.0
        };

        completed + current
    }

    pub fn segments(&self) -> &[RecordingSegment] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_labels() {
        assert_eq!(RecorderState::Inactive.to_string(), "inactive");
        assert_eq!(RecorderState::Recording.to_string(), "recording");
        assert_eq!(RecorderState::Paused.as_str(), "paused");
        assert_eq!(
            serde_json::to_string(&RecorderState::Paused).unwrap(),
            "\"paused\""
        );
    }

    #[test]
    fn test_options_pass_unknown_keys_through() {
        let options = RecorderOptions::from_json(
            r#"{
                "mimeType": "video/webm;codecs=vp8",
                "videoBitsPerSecond": 2500000,
                "videoKeyFrameIntervalDuration": 1000
            }"#,
        )
        .unwrap();

        assert_eq!(options.mime_type.as_deref(), Some("video/webm;codecs=vp8"));
        assert_eq!(options.video_bits_per_second, Some(2_500_000));
        assert_eq!(
            options.extra.get("videoKeyFrameIntervalDuration"),
            Some(&serde_json::json!(1000))
        );

        let round = serde_json::to_value(&options).unwrap();
        assert_eq!(round["videoKeyFrameIntervalDuration"], 1000);
    }

    #[test]
    fn test_clock_excludes_paused_time() {
        let mut clock = RecordingClock::default();
        clock.start(0.0);
        assert_eq!(clock.recorded_ms(400.0), 400.0);

        clock.pause(1000.0);
        assert_eq!(clock.recorded_ms(5000.0), 1000.0);

        clock.resume(3000.0);
        assert_eq!(clock.recorded_ms(3500.0), 1500.0);
        assert_eq!(clock.segments().len(), 2);
    }
}
