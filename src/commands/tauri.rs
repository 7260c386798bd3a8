//! Tauri commands
//!
//! The recording and system commands packaged as a Tauri plugin. The
//! frontend invokes them as `plugin:capture-relay|<command>` and listens for
//! the recorder events emitted by [`TauriBridge`].

use super::recording::{self, RelayState};
use super::system::{self, DeviceList, SystemInfo};
use crate::bridge::tauri::TauriBridge;
use crate::recorder::{CaptureRelay, RecorderOptions, RecorderState};
use crate::utils::error::ErrorResponse;
use std::sync::Arc;
use tauri::plugin::{Builder, TauriPlugin};
use tauri::{Manager, Runtime, State};

/// Build the plugin around `relay`
///
/// Display surfaces may be registered on `relay` up front or later through
/// `register_surface`.
pub fn init<R: Runtime>(relay: CaptureRelay) -> TauriPlugin<R> {
    Builder::new("capture-relay")
        .invoke_handler(tauri::generate_handler![
            register_surface,
            enable_camera,
            disable_camera,
            start_recording,
            pause_recording,
            resume_recording,
            stop_recording,
            get_recording_state,
            revoke_recording,
            list_devices,
            get_system_info,
        ])
        .setup(move |app, _api| {
            let bridge = TauriBridge::new(app.clone());
            app.manage(RelayState::new(relay, Arc::new(bridge)));
            tracing::info!("capture-relay plugin initialized");
            Ok(())
        })
        .build()
}

/// Make a display surface available to `enable_camera`
#[tauri::command]
async fn register_surface(
    state: State<'_, RelayState>,
    surface_id: String,
) -> Result<(), ErrorResponse> {
    state.relay().surfaces().register(surface_id);
    Ok(())
}

#[tauri::command]
async fn enable_camera(
    state: State<'_, RelayState>,
    surface_id: String,
    options: Option<RecorderOptions>,
) -> Result<String, ErrorResponse> {
    recording::enable_camera(&state, surface_id, options.unwrap_or_default()).await
}

#[tauri::command]
async fn disable_camera(state: State<'_, RelayState>) -> Result<(), ErrorResponse> {
    recording::disable_camera(&state).await
}

#[tauri::command]
async fn start_recording(state: State<'_, RelayState>) -> Result<(), ErrorResponse> {
    recording::start_recording(&state).await
}

#[tauri::command]
async fn pause_recording(state: State<'_, RelayState>) -> Result<(), ErrorResponse> {
    recording::pause_recording(&state).await
}

#[tauri::command]
async fn resume_recording(state: State<'_, RelayState>) -> Result<(), ErrorResponse> {
    recording::resume_recording(&state).await
}

#[tauri::command]
async fn stop_recording(state: State<'_, RelayState>) -> Result<(), ErrorResponse> {
    recording::stop_recording(&state).await
}

#[tauri::command]
async fn get_recording_state(
    state: State<'_, RelayState>,
) -> Result<RecorderState, ErrorResponse> {
    recording::get_recording_state(&state).await
}

/// Release a recorded artifact. Returns false if the URL was unknown.
#[tauri::command]
async fn revoke_recording(
    state: State<'_, RelayState>,
    object_url: String,
) -> Result<bool, ErrorResponse> {
    Ok(state.object_urls().revoke_object_url(&object_url))
}

#[tauri::command]
async fn list_devices() -> Result<DeviceList, ErrorResponse> {
    Ok(system::list_devices().await)
}

#[tauri::command]
async fn get_system_info() -> Result<SystemInfo, ErrorResponse> {
    Ok(system::get_system_info())
}
