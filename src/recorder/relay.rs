//! Event translation
//!
//! Turns recorder events into host bridge calls. The relay owns the fragment
//! buffer of its session; it is the only writer and the only reader.

use super::blob::ObjectUrlStore;
use super::buffer::FragmentBuffer;
use super::media_recorder::{RecorderEvent, RecorderEvents};
use crate::bridge::{HostBridge, RecordedMedia, RecorderFailure};
use std::sync::Arc;

/// MIME type of assembled recordings
pub const RECORDING_MIME_TYPE: &str = "video/webm";

pub struct EventRelay {
    buffer: FragmentBuffer,
    bridge: Arc<dyn HostBridge>,
    urls: ObjectUrlStore,
}

impl EventRelay {
    pub fn new(bridge: Arc<dyn HostBridge>, urls: ObjectUrlStore) -> Self {
        Self {
            buffer: FragmentBuffer::new(),
            bridge,
            urls,
        }
    }

    /// Relay events until the recorder goes away
    pub async fn run(mut self, mut events: RecorderEvents) {
        while let Some(event) = events.recv().await {
            self.handle(event);
        }
        tracing::debug!("Event relay finished");
    }

    /// Translate one event
    pub fn handle(&mut self, event: RecorderEvent) {
        match event {
            RecorderEvent::DataAvailable { data, timecode } => {
                self.buffer.push(data);
                self.bridge.on_data_available(timecode);
            }
            RecorderEvent::Stop => self.relay_stop(),
            RecorderEvent::Error(error) => {
                let failure = RecorderFailure {
                    code: error.code(),
                    message: error.message().to_string(),
                };
                match serde_json::to_string(&failure) {
                    Ok(payload) => self.bridge.on_error(&payload),
                    Err(e) => tracing::error!("Failed to encode error payload: {}", e),
                }
            }
            RecorderEvent::Start { state } => {
                // A new recording never sees fragments of the previous one
                self.buffer.clear();
                self.bridge.on_start(state.as_str());
            }
            RecorderEvent::Pause { state } => self.bridge.on_pause(state.as_str()),
            RecorderEvent::Resume { state } => self.bridge.on_resume(state.as_str()),
        }
    }

    fn relay_stop(&mut self) {
        let blob = self.buffer.assemble(RECORDING_MIME_TYPE);
        let file_size = blob.size();
        let object_url = self.urls.create_object_url(blob);

        tracing::info!(
            "Recording assembled: {} fragments, {} bytes at {}",
            self.buffer.len(),
            file_size,
            object_url
        );

        let media = RecordedMedia {
            object_url,
            file_size,
        };
        match serde_json::to_string(&media) {
            Ok(payload) => self.bridge.on_stop(&payload),
            Err(e) => tracing::error!("Failed to encode stop payload: {}", e),
        }
    }

    /// Bytes buffered for the current recording
    pub fn buffered_bytes(&self) -> usize {
        self.buffer.byte_len()
    }
}
