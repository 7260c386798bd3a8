//! Native device capture
//!
//! Microphone capture through cpal and camera capture through nokhwa, combined
//! into one [`MediaStream`].

pub mod audio;
pub mod webcam;

pub use audio::{list_audio_inputs, MicrophoneCapture};
pub use webcam::{list_cameras, CameraRequest, WebcamCapture};

use crate::capture::stream::{chunk_channel, MediaStream, StreamGuard};
use crate::capture::traits::{CaptureError, CaptureResult, MediaConstraints, MediaDevices};
use crate::config::CaptureConfig;
use async_trait::async_trait;

/// Stops every device of a combined stream
struct CombinedGuard {
    guards: Vec<Box<dyn StreamGuard>>,
}

impl StreamGuard for CombinedGuard {
    fn stop(&mut self) {
        for guard in &mut self.guards {
            guard.stop();
        }
    }
}

/// Capture from the machine's microphone and camera
#[derive(Debug, Clone)]
pub struct NativeMediaDevices {
    video: bool,
    audio: bool,
    audio_device: String,
    camera: String,
    request: CameraRequest,
}

impl NativeMediaDevices {
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            video: config.video,
            audio: config.audio,
            audio_device: config.audio_device.clone(),
            camera: config.camera.clone(),
            request: CameraRequest {
                width: config.width,
                height: config.height,
                fps: config.fps,
            },
        }
    }

    fn open(&self, constraints: MediaConstraints) -> CaptureResult<MediaStream> {
        let (sender, rx) = chunk_channel();
        let mut guards: Vec<Box<dyn StreamGuard>> = Vec::new();
        let mut tracks = Vec::new();

        if constraints.video && self.video {
            let (capture, track) =
                WebcamCapture::start(&self.camera, self.request, sender.clone())?;
            guards.push(Box::new(capture));
            tracks.push(track);
        }

        if constraints.audio && self.audio {
            match MicrophoneCapture::start(&self.audio_device, sender) {
                Ok((capture, track)) => {
                    guards.push(Box::new(capture));
                    tracks.push(track);
                }
                Err(e) => {
                    // Release the camera we may already hold
                    CombinedGuard { guards }.stop();
                    return Err(e);
                }
            }
        }

        Ok(MediaStream::new(tracks, rx).with_guard(Box::new(CombinedGuard { guards })))
    }
}

#[async_trait]
impl MediaDevices for NativeMediaDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> CaptureResult<MediaStream> {
        if !constraints.is_satisfiable() {
            return Err(CaptureError::Overconstrained(
                "at least one of audio or video must be requested".to_string(),
            ));
        }

        if !(constraints.video && self.video) && !(constraints.audio && self.audio) {
            return Err(CaptureError::NotFound(
                "every requested device kind is disabled in the configuration".to_string(),
            ));
        }

        let devices = self.clone();
        let stream = tokio::task::spawn_blocking(move || devices.open(constraints))
            .await
            .map_err(|e| CaptureError::Aborted(format!("Capture task failed: {e}")))??;

        tracing::info!(
            "Native stream {} opened with {} tracks",
            stream.id(),
            stream.tracks().len()
        );
        Ok(stream)
    }
}
