//! Device and system information commands

use crate::capture::{AudioDeviceInfo, CameraInfo};
use serde::{Deserialize, Serialize};

/// Capture devices visible to the adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceList {
    pub audio_inputs: Vec<AudioDeviceInfo>,
    pub cameras: Vec<CameraInfo>,
}

/// System information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    pub version: String,
    /// Whether native capture devices are compiled in
    pub native_capture: bool,
}

/// List microphones and cameras
///
/// Empty unless the crate is built with native capture.
pub async fn list_devices() -> DeviceList {
    #[cfg(feature = "native")]
    {
        let listed = tokio::task::spawn_blocking(|| DeviceList {
            audio_inputs: crate::capture::native::list_audio_inputs(),
            cameras: crate::capture::native::list_cameras(),
        })
        .await;
        match listed {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!("Device enumeration failed: {}", e);
                DeviceList::default()
            }
        }
    }

    #[cfg(not(feature = "native"))]
    {
        tracing::debug!("Native capture not compiled in, no devices to list");
        DeviceList::default()
    }
}

pub fn get_system_info() -> SystemInfo {
    SystemInfo {
        os: std::env::consts::OS.to_string(),
        arch: std::env::consts::ARCH.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        native_capture: cfg!(feature = "native"),
    }
}
