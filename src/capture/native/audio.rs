//! Microphone capture using cpal
//!
//! Samples are delivered as interleaved signed 16-bit little-endian PCM at the
//! device's native rate and channel count.

use crate::capture::stream::{ChunkSender, StreamGuard};
use crate::capture::traits::{AudioDeviceInfo, CaptureError, CaptureResult, TrackInfo, TrackKind};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::mpsc;
use std::thread::JoinHandle;

/// List available audio input devices
pub fn list_audio_inputs() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    match host.input_devices() {
        Ok(devices) => devices
            .enumerate()
            .map(|(index, device)| {
                let name = device
                    .name()
                    .unwrap_or_else(|_| "Unknown device".to_string());
                AudioDeviceInfo {
                    id: index.to_string(),
                    is_default: default_name.as_deref() == Some(name.as_str()),
                    name,
                    is_input: true,
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate audio devices: {}", e);
            Vec::new()
        }
    }
}

/// Find an input device by "default", numeric index or exact name
fn find_input_device(host: &cpal::Host, device_spec: &str) -> CaptureResult<cpal::Device> {
    if device_spec == "default" {
        return host
            .default_input_device()
            .ok_or_else(|| CaptureError::NotFound("No audio input device available".to_string()));
    }

    let devices: Vec<_> = host
        .input_devices()
        .map_err(|e| CaptureError::NotReadable(format!("Failed to enumerate devices: {e}")))?
        .collect();

    if let Ok(index) = device_spec.parse::<usize>() {
        let count = devices.len();
        return devices.into_iter().nth(index).ok_or_else(|| {
            CaptureError::NotFound(format!(
                "Device index {} is out of range (0-{})",
                index,
                count.saturating_sub(1)
            ))
        });
    }

    devices
        .into_iter()
        .find(|d| d.name().map(|n| n == device_spec).unwrap_or(false))
        .ok_or_else(|| {
            CaptureError::NotFound(format!("Audio input device '{device_spec}' not found"))
        })
}

fn push_samples<T, F>(sender: &ChunkSender, data: &[T], convert: F)
where
    T: Copy,
    F: Fn(T) -> i16,
{
    let mut bytes = Vec::with_capacity(data.len() * 2);
    for &sample in data {
        bytes.extend_from_slice(&convert(sample).to_le_bytes());
    }
    sender.send_chunk(TrackKind::Audio, bytes);
}

/// Reacts to errors reported by a running cpal stream
///
/// Backend hiccups are logged and capture goes on. Losing the device ends the
/// track, reported once.
struct StreamErrors {
    sender: ChunkSender,
    device_lost: bool,
}

impl StreamErrors {
    fn new(sender: ChunkSender) -> Self {
        Self {
            sender,
            device_lost: false,
        }
    }

    fn handle(&mut self, err: cpal::StreamError) {
        match err {
            cpal::StreamError::DeviceNotAvailable => {
                if self.device_lost {
                    return;
                }
                self.device_lost = true;
                tracing::error!("Audio input device is no longer available");
                self.sender.fail(CaptureError::NotFound(
                    "audio input device is no longer available".to_string(),
                ));
            }
            other => tracing::warn!("Audio stream error: {}", other),
        }
    }
}

fn build_stream(device: &cpal::Device, sender: ChunkSender) -> CaptureResult<cpal::Stream> {
    let config = device
        .default_input_config()
        .map_err(|e| CaptureError::NotReadable(format!("No usable input config: {e}")))?;

    tracing::debug!(
        "Microphone configuration: {}Hz, {} channels, {:?}",
        config.sample_rate().0,
        config.channels(),
        config.sample_format()
    );

    let mut errors = StreamErrors::new(sender.clone());
    let on_error = move |err: cpal::StreamError| errors.handle(err);

    let stream_config: cpal::StreamConfig = config.clone().into();
    let stream = match config.sample_format() {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| push_samples(&sender, data, |s| s),
            on_error,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                push_samples(&sender, data, |s| (s as i32 - 32768) as i16)
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                push_samples(&sender, data, |s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
            },
            on_error,
            None,
        ),
        other => {
            return Err(CaptureError::NotReadable(format!(
                "Unsupported sample format {other:?}"
            )))
        }
    }
    .map_err(|e| CaptureError::NotReadable(format!("Failed to open audio stream: {e}")))?;

    stream
        .play()
        .map_err(|e| CaptureError::NotReadable(format!("Failed to start audio stream: {e}")))?;

    Ok(stream)
}

/// Running microphone capture
///
/// The cpal stream lives on its own thread until the guard is stopped.
pub struct MicrophoneCapture {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl MicrophoneCapture {
    /// Open the device and start pushing samples into `sender`
    pub fn start(device_spec: &str, sender: ChunkSender) -> CaptureResult<(Self, TrackInfo)> {
        let (ready_tx, ready_rx) = mpsc::channel::<CaptureResult<String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let device_spec = device_spec.to_string();

        let thread = std::thread::Builder::new()
            .name("microphone-capture".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let opened = find_input_device(&host, &device_spec).and_then(|device| {
                    let name = device
                        .name()
                        .unwrap_or_else(|_| "Unknown device".to_string());
                    build_stream(&device, sender).map(|stream| (stream, name))
                });

                let stream = match opened {
                    Ok((stream, name)) => {
                        let _ = ready_tx.send(Ok(name));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Blocks until the guard drops its sender
                let _ = stop_rx.recv();
                drop(stream);
                tracing::debug!("Microphone capture thread stopped");
            })
            .map_err(|e| CaptureError::Aborted(format!("Failed to spawn capture thread: {e}")))?;

        let label = ready_rx
            .recv()
            .map_err(|_| CaptureError::Aborted("Microphone capture thread exited".to_string()))??;

        tracing::info!("Recording device: {}", label);
        Ok((
            Self {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            },
            TrackInfo {
                kind: TrackKind::Audio,
                label,
            },
        ))
    }
}

impl StreamGuard for MicrophoneCapture {
    fn stop(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::stream::{chunk_channel, CaptureMessage};

    #[test]
    fn test_backend_errors_keep_capture_running() {
        let (sender, mut rx) = chunk_channel();
        let mut errors = StreamErrors::new(sender);

        errors.handle(cpal::StreamError::BackendSpecific {
            err: cpal::BackendSpecificError {
                description: "buffer overrun".to_string(),
            },
        });

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_lost_device_is_reported_once() {
        let (sender, mut rx) = chunk_channel();
        let mut errors = StreamErrors::new(sender);

        errors.handle(cpal::StreamError::DeviceNotAvailable);
        errors.handle(cpal::StreamError::DeviceNotAvailable);

        assert!(matches!(
            rx.try_recv(),
            Ok(CaptureMessage::Failed(CaptureError::NotFound(_)))
        ));
        assert!(rx.try_recv().is_err());
    }
}
