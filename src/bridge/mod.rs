//! Host bridge
//!
//! The adapter reports every recorder event to the host through a
//! [`HostBridge`]. Each event is a single call; structured results are passed
//! as JSON strings.

pub mod channel;
pub mod notification;

#[cfg(feature = "tauri")]
pub mod tauri;

pub use channel::ChannelBridge;
pub use notification::{HostNotification, RecordedMedia, RecorderFailure};

/// Callbacks the host receives from a recorder session
pub trait HostBridge: Send + Sync {
    /// A fragment was recorded at `timecode` milliseconds
    fn on_data_available(&self, timecode: f64);

    /// Recording finished. `payload` is `{"objectUrl": ..., "fileSize": ...}`
    fn on_stop(&self, payload: &str);

    /// Recording failed. `payload` is `{"type": <code>, "message": ...}`
    fn on_error(&self, payload: &str);

    fn on_start(&self, state: &str);

    fn on_pause(&self, state: &str);

    fn on_resume(&self, state: &str);
}

/// A host that takes typed [`HostNotification`]s instead of raw callbacks
///
/// Every sink is a [`HostBridge`]; malformed payloads are logged and dropped.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: HostNotification);
}

fn deliver_json<S: NotificationSink + ?Sized>(sink: &S, event: &str, payload: &str) {
    match HostNotification::decode(event, payload) {
        Ok(notification) => sink.deliver(notification),
        Err(e) => tracing::warn!("Malformed {} payload: {}", event, e),
    }
}

impl<T: NotificationSink> HostBridge for T {
    fn on_data_available(&self, timecode: f64) {
        self.deliver(HostNotification::DataAvailable(timecode));
    }

    fn on_stop(&self, payload: &str) {
        deliver_json(self, "recording-stopped", payload);
    }

    fn on_error(&self, payload: &str) {
        deliver_json(self, "recording-error", payload);
    }

    fn on_start(&self, state: &str) {
        self.deliver(HostNotification::RecordingStarted(state.to_string()));
    }

    fn on_pause(&self, state: &str) {
        self.deliver(HostNotification::RecordingPaused(state.to_string()));
    }

    fn on_resume(&self, state: &str) {
        self.deliver(HostNotification::RecordingResumed(state.to_string()));
    }
}
