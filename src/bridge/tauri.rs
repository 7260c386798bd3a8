//! Tauri host bridge
//!
//! Emits every recorder event to the webview through Tauri's event system,
//! under [`HostNotification::name`] with the typed payload.

use super::{HostNotification, NotificationSink};
use tauri::{AppHandle, Emitter, Runtime};

/// Forwards recorder events to the frontend as Tauri events
pub struct TauriBridge<R: Runtime> {
    app: AppHandle<R>,
}

impl<R: Runtime> TauriBridge<R> {
    pub fn new(app: AppHandle<R>) -> Self {
        Self { app }
    }
}

impl<R: Runtime> NotificationSink for TauriBridge<R> {
    fn deliver(&self, notification: HostNotification) {
        let event = notification.name();
        let result = match notification {
            HostNotification::DataAvailable(timecode) => self.app.emit(event, timecode),
            HostNotification::RecordingStopped(media) => self.app.emit(event, media),
            HostNotification::RecordingError(failure) => self.app.emit(event, failure),
            HostNotification::RecordingStarted(state)
            | HostNotification::RecordingPaused(state)
            | HostNotification::RecordingResumed(state) => self.app.emit(event, state),
        };
        if let Err(e) = result {
            tracing::warn!("Failed to emit {}: {}", event, e);
        }
    }
}
