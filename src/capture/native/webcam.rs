//! Webcam capture using nokhwa
//!
//! Raw frame buffers are forwarded as they come from the camera, in the
//! camera's native pixel format. No decoding happens here.

use crate::capture::stream::{ChunkSender, StreamGuard};
use crate::capture::traits::{
    CameraInfo, CaptureError, CaptureResult, Resolution, TrackInfo, TrackKind,
};
use bytes::Bytes;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
};
use nokhwa::Camera;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

/// Consecutive frame failures tolerated before the track is reported dead
const MAX_FRAME_FAILURES: u32 = 30;

/// Get list of available cameras
pub fn list_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };

                // Common resolutions
                let supported_resolutions = vec![
                    Resolution {
                        width: 1920,
                        height: 1080,
                    },
                    Resolution {
                        width: 1280,
                        height: 720,
                    },
                    Resolution {
                        width: 640,
                        height: 480,
                    },
                ];

                CameraInfo {
                    id,
                    name: info.human_name().to_string(),
                    supported_resolutions,
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Map a camera spec ("default", index or device string) to a nokhwa index
fn camera_index(spec: &str) -> CameraIndex {
    if spec == "default" {
        return CameraIndex::Index(0);
    }
    match spec.parse::<u32>() {
        Ok(idx) => CameraIndex::Index(idx),
        Err(_) => CameraIndex::String(spec.to_string()),
    }
}

/// Requested camera format
#[derive(Debug, Clone, Copy)]
pub struct CameraRequest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

/// Running webcam capture
pub struct WebcamCapture {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl WebcamCapture {
    /// Open the camera and start pushing frames into `sender`
    pub fn start(
        camera_spec: &str,
        request: CameraRequest,
        sender: ChunkSender,
    ) -> CaptureResult<(Self, TrackInfo)> {
        if list_cameras().is_empty() {
            return Err(CaptureError::NotFound("No cameras found".to_string()));
        }

        let index = camera_index(camera_spec);
        let running = Arc::new(AtomicBool::new(true));
        let thread_running = running.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<CaptureResult<String>>();

        let thread = std::thread::Builder::new()
            .name("webcam-capture".to_string())
            .spawn(move || {
                let closest = CameraFormat::new_from(
                    request.width,
                    request.height,
                    FrameFormat::MJPEG,
                    request.fps,
                );
                let format =
                    RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(closest));

                let mut camera = match Camera::new(index.clone(), format) {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = ready_tx.send(Err(CaptureError::NotReadable(format!(
                            "Failed to open camera {index:?}: {e}"
                        ))));
                        return;
                    }
                };

                if let Err(e) = camera.open_stream() {
                    let _ = ready_tx.send(Err(CaptureError::NotReadable(format!(
                        "Failed to open camera stream: {e}"
                    ))));
                    return;
                }

                let camera_format = camera.camera_format();
                tracing::info!(
                    "Webcam opened: {}x{} @ {}fps, format={:?} (requested {}x{} @ {}fps)",
                    camera_format.resolution().width(),
                    camera_format.resolution().height(),
                    camera_format.frame_rate(),
                    camera_format.format(),
                    request.width,
                    request.height,
                    request.fps
                );
                let _ = ready_tx.send(Ok(camera.info().human_name().to_string()));

                let mut failures = 0u32;
                while thread_running.load(Ordering::SeqCst) {
                    // Blocks until the camera delivers the next frame
                    match camera.frame() {
                        Ok(frame) => {
                            failures = 0;
                            let data = Bytes::copy_from_slice(frame.buffer());
                            if !sender.send_chunk(TrackKind::Video, data) {
                                break;
                            }
                        }
                        Err(e) => {
                            failures += 1;
                            tracing::debug!("Failed to capture frame: {:?}", e);
                            if failures >= MAX_FRAME_FAILURES {
                                sender.fail(CaptureError::NotReadable(format!(
                                    "Camera stopped delivering frames: {e}"
                                )));
                                break;
                            }
                        }
                    }
                }

                if let Err(e) = camera.stop_stream() {
                    tracing::warn!("Error stopping camera stream: {:?}", e);
                }
                tracing::debug!("Webcam capture thread stopped");
            })
            .map_err(|e| CaptureError::Aborted(format!("Failed to spawn capture thread: {e}")))?;

        let label = ready_rx
            .recv()
            .map_err(|_| CaptureError::Aborted("Webcam capture thread exited".to_string()))??;

        Ok((
            Self {
                running,
                thread: Some(thread),
            },
            TrackInfo {
                kind: TrackKind::Video,
                label,
            },
        ))
    }
}

impl StreamGuard for WebcamCapture {
    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_index_parsing() {
        assert_eq!(camera_index("default"), CameraIndex::Index(0));
        assert_eq!(camera_index("2"), CameraIndex::Index(2));
        assert_eq!(
            camera_index("/dev/video4"),
            CameraIndex::String("/dev/video4".to_string())
        );
    }
}
