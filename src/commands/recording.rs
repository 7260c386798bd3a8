//! Recording commands

use crate::bridge::HostBridge;
use crate::recorder::{
    CaptureRelay, ObjectUrlStore, RecorderOptions, RecorderSession, RecorderState,
};
use crate::utils::error::{ErrorResponse, RelayError};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Command-level state: the adapter environment and the current session
pub struct RelayState {
    relay: CaptureRelay,
    bridge: Arc<dyn HostBridge>,
    session: Mutex<Option<RecorderSession>>,
}

impl RelayState {
    pub fn new(relay: CaptureRelay, bridge: Arc<dyn HostBridge>) -> Self {
        Self {
            relay,
            bridge,
            session: Mutex::new(None),
        }
    }

    pub fn relay(&self) -> &CaptureRelay {
        &self.relay
    }

    pub fn object_urls(&self) -> &ObjectUrlStore {
        self.relay.object_urls()
    }

    async fn with_session<T>(
        &self,
        f: impl FnOnce(&RecorderSession) -> Result<T, RelayError>,
    ) -> Result<T, ErrorResponse> {
        let session = self.session.lock().await;
        let session = session.as_ref().ok_or(RelayError::NotEnabled)?;
        Ok(f(session)?)
    }
}

/// Acquire camera and microphone for `surface_id` and create a recorder.
///
/// Replaces any previous session. Returns the id of the new capture stream.
pub async fn enable_camera(
    state: &RelayState,
    surface_id: String,
    options: RecorderOptions,
) -> Result<String, ErrorResponse> {
    let mut current = state.session.lock().await;
    if let Some(previous) = current.take() {
        tracing::info!("Replacing session on '{}'", previous.surface_id());
        if let Err(e) = previous.stop() {
            tracing::warn!("Failed to stop previous session: {}", e);
        }
    }

    let session = state
        .relay
        .enable(&surface_id, options, state.bridge.clone())
        .await
        .map_err(|e| {
            tracing::error!("Enable failed: {}", e);
            ErrorResponse::from(e)
        })?;
    let stream_id = session.stream_id().to_string();
    *current = Some(session);
    Ok(stream_id)
}

/// Release the current session and its capture stream
pub async fn disable_camera(state: &RelayState) -> Result<(), ErrorResponse> {
    let session = state.session.lock().await.take();
    match session {
        Some(session) => {
            tracing::info!("Disabling capture on '{}'", session.surface_id());
            Ok(())
        }
        None => Err(RelayError::NotEnabled.into()),
    }
}

pub async fn start_recording(state: &RelayState) -> Result<(), ErrorResponse> {
    state.with_session(|s| s.start()).await
}

pub async fn pause_recording(state: &RelayState) -> Result<(), ErrorResponse> {
    state.with_session(|s| s.pause()).await
}

pub async fn resume_recording(state: &RelayState) -> Result<(), ErrorResponse> {
    state.with_session(|s| s.resume()).await
}

pub async fn stop_recording(state: &RelayState) -> Result<(), ErrorResponse> {
    state.with_session(|s| s.stop()).await
}

/// Current recorder state; `inactive` when nothing is enabled
pub async fn get_recording_state(state: &RelayState) -> Result<RecorderState, ErrorResponse> {
    let session = state.session.lock().await;
    Ok(session
        .as_ref()
        .map(|s| s.state())
        .unwrap_or(RecorderState::Inactive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{ChannelBridge, HostNotification};
    use crate::capture::{LoopbackDevices, TrackKind};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn relay_state(devices: &LoopbackDevices) -> (RelayState, UnboundedReceiver<HostNotification>) {
        let relay = CaptureRelay::new(Arc::new(devices.clone()));
        relay.surfaces().register("camera-view");
        let (bridge, rx) = ChannelBridge::new();
        (RelayState::new(relay, Arc::new(bridge)), rx)
    }

    #[tokio::test]
    async fn test_commands_before_enable() {
        let (state, _rx) = relay_state(&LoopbackDevices::new());

        let error = start_recording(&state).await.unwrap_err();
        assert_eq!(error.code, "NOT_ENABLED");
        assert!(stop_recording(&state).await.is_err());
        assert!(disable_camera(&state).await.is_err());
        assert_eq!(get_recording_state(&state).await.unwrap(), RecorderState::Inactive);
    }

    #[tokio::test]
    async fn test_record_through_commands() {
        let devices = LoopbackDevices::new();
        let (state, mut rx) = relay_state(&devices);

        let stream_id = enable_camera(&state, "camera-view".to_string(), RecorderOptions::default())
            .await
            .unwrap();
        assert_eq!(
            state.relay().surfaces().binding("camera-view").unwrap().stream_id,
            stream_id
        );
        let feed = devices.take_feed().unwrap();

        start_recording(&state).await.unwrap();
        assert_eq!(get_recording_state(&state).await.unwrap(), RecorderState::Recording);
        assert!(matches!(rx.recv().await, Some(HostNotification::RecordingStarted(_))));

        feed.push(TrackKind::Video, vec![5u8; 64]);
        stop_recording(&state).await.unwrap();

        let media = loop {
            match rx.recv().await {
                Some(HostNotification::RecordingStopped(media)) => break media,
                Some(_) => continue,
                None => panic!("bridge closed"),
            }
        };
        assert_eq!(media.file_size, 64);
        assert_eq!(state.object_urls().resolve(&media.object_url).unwrap().size(), 64);
    }

    #[tokio::test]
    async fn test_enable_errors_map_to_codes() {
        let (state, _rx) = relay_state(&LoopbackDevices::denied());
        let error = enable_camera(&state, "camera-view".to_string(), RecorderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.code, "PERMISSION_DENIED");

        let (state, _rx) = relay_state(&LoopbackDevices::new());
        let error = enable_camera(&state, "elsewhere".to_string(), RecorderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.code, "SURFACE_NOT_FOUND");

        let error = pause_recording(&state).await.unwrap_err();
        assert_eq!(error.code, "NOT_ENABLED");
    }

    #[tokio::test]
    async fn test_denied_enable_leaves_nothing_to_record() {
        let (state, mut rx) = relay_state(&LoopbackDevices::denied());
        let error = enable_camera(&state, "camera-view".to_string(), RecorderOptions::default())
            .await
            .unwrap_err();
        assert_eq!(error.code, "PERMISSION_DENIED");

        let error = start_recording(&state).await.unwrap_err();
        assert_eq!(error.code, "NOT_ENABLED");
        assert_eq!(get_recording_state(&state).await.unwrap(), RecorderState::Inactive);
        assert!(state.relay().surfaces().binding("camera-view").is_none());

        drop(state);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_pause_before_start_is_invalid_state() {
        let (state, _rx) = relay_state(&LoopbackDevices::new());
        enable_camera(&state, "camera-view".to_string(), RecorderOptions::default())
            .await
            .unwrap();

        let error = pause_recording(&state).await.unwrap_err();
        assert_eq!(error.code, "INVALID_STATE");
    }

    #[tokio::test]
    async fn test_enable_replaces_previous_session() {
        let devices = LoopbackDevices::new();
        let (state, _rx) = relay_state(&devices);

        let first = enable_camera(&state, "camera-view".to_string(), RecorderOptions::default())
            .await
            .unwrap();
        let second = enable_camera(&state, "camera-view".to_string(), RecorderOptions::default())
            .await
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(devices.streams_created(), 2);
        assert_eq!(
            state.relay().surfaces().binding("camera-view").unwrap().stream_id,
            second
        );

        disable_camera(&state).await.unwrap();
        assert!(state.relay().surfaces().binding("camera-view").is_none());
    }
}
