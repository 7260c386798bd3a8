//! Recorder sessions
//!
//! [`CaptureRelay`] holds what the adapter needs from its environment (capture
//! devices, display surfaces, object URLs). [`CaptureRelay::enable`] builds a
//! [`RecorderSession`]: one capture stream, one recorder and the relay task
//! that reports the recorder's events to the host.

use super::blob::ObjectUrlStore;
use super::media_recorder::MediaRecorder;
use super::relay::EventRelay;
use super::state::{RecorderOptions, RecorderState};
use crate::bridge::HostBridge;
use crate::capture::{MediaConstraints, MediaDevices, SurfaceRegistry};
use crate::utils::error::{RelayError, RelayResult};
use std::sync::Arc;
use std::time::Duration;

/// Interval at which fragments are emitted while recording
pub const FRAGMENT_INTERVAL: Duration = Duration::from_secs(1);

/// Host-side environment of the adapter
#[derive(Clone)]
pub struct CaptureRelay {
    devices: Arc<dyn MediaDevices>,
    surfaces: SurfaceRegistry,
    urls: ObjectUrlStore,
}

impl CaptureRelay {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            surfaces: SurfaceRegistry::new(),
            urls: ObjectUrlStore::default(),
        }
    }

    /// Use `urls` for recorded artifacts
    pub fn with_object_urls(mut self, urls: ObjectUrlStore) -> Self {
        self.urls = urls;
        self
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    pub fn object_urls(&self) -> &ObjectUrlStore {
        &self.urls
    }

    /// Acquire camera and microphone, show them on `surface_id` and build a
    /// recorder with `options`.
    ///
    /// Fails when capture is denied or impossible, when the surface is
    /// unknown, or when the recorder rejects the options. No session exists
    /// after a failure.
    pub async fn enable(
        &self,
        surface_id: &str,
        options: RecorderOptions,
        bridge: Arc<dyn HostBridge>,
    ) -> RelayResult<RecorderSession> {
        tracing::info!("Enabling capture for surface '{}'", surface_id);

        let stream = self
            .devices
            .get_user_media(MediaConstraints::AUDIO_VIDEO)
            .await?;

        if !self.surfaces.bind(surface_id, &stream) {
            tracing::warn!("Display surface '{}' is not registered", surface_id);
            return Err(RelayError::SurfaceNotFound(surface_id.to_string()));
        }

        let stream_id = stream.id().to_string();
        let (recorder, events) = match MediaRecorder::new(stream, options) {
            Ok(created) => created,
            Err(e) => {
                self.surfaces.release(surface_id, &stream_id);
                return Err(e.into());
            }
        };

        let relay = EventRelay::new(bridge, self.urls.clone());
        tokio::spawn(relay.run(events));

        tracing::info!(
            "Recorder enabled on stream {} ({}, video {:?} bps, audio {:?} bps)",
            stream_id,
            recorder.mime_type(),
            recorder.options().video_bits_per_second,
            recorder.options().audio_bits_per_second
        );

        Ok(RecorderSession {
            recorder,
            surface_id: surface_id.to_string(),
            surfaces: self.surfaces.clone(),
        })
    }
}

/// An enabled recorder and its capture stream
///
/// Commands return as soon as the recorder has accepted them; outcomes reach
/// the host through its bridge. Dropping the session releases the stream.
#[derive(Debug)]
pub struct RecorderSession {
    recorder: MediaRecorder,
    surface_id: String,
    surfaces: SurfaceRegistry,
}

impl RecorderSession {
    /// Start a new recording with one fragment per [`FRAGMENT_INTERVAL`].
    ///
    /// The fragment buffer is emptied before the first fragment of the new
    /// recording is taken in.
    pub fn start(&self) -> RelayResult<()> {
        self.recorder.start(Some(FRAGMENT_INTERVAL))?;
        Ok(())
    }

    pub fn pause(&self) -> RelayResult<()> {
        self.recorder.pause()?;
        Ok(())
    }

    pub fn resume(&self) -> RelayResult<()> {
        self.recorder.resume()?;
        Ok(())
    }

    /// Ask the recorder to stop; the artifact is reported with the stop event
    pub fn stop(&self) -> RelayResult<()> {
        self.recorder.stop()?;
        Ok(())
    }

    pub fn state(&self) -> RecorderState {
        self.recorder.state()
    }

    pub fn mime_type(&self) -> &str {
        self.recorder.mime_type()
    }

    /// Options the recorder was enabled with
    pub fn options(&self) -> &RecorderOptions {
        self.recorder.options()
    }

    pub fn stream_id(&self) -> &str {
        self.recorder.stream_id()
    }

    pub fn surface_id(&self) -> &str {
        &self.surface_id
    }
}

impl Drop for RecorderSession {
    fn drop(&mut self) {
        self.surfaces
            .release(&self.surface_id, self.recorder.stream_id());
        tracing::debug!("Recorder session on '{}' closed", self.surface_id);
    }
}
