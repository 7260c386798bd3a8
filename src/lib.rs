//! capture-relay - camera and microphone capture relayed to a host.
//!
//! A host enables capture for one of its display surfaces, drives a chunked
//! media recorder with start/pause/resume/stop, and is told about every
//! recorder event through a [`bridge::HostBridge`]. A finished recording is
//! handed back as an in-memory artifact behind a `blob:` object URL.

pub mod bridge;
pub mod capture;
pub mod commands;
pub mod config;
pub mod logging;
pub mod recorder;
pub mod utils;

pub use bridge::{ChannelBridge, HostBridge, HostNotification, NotificationSink};
pub use config::RelayConfig;
pub use recorder::{CaptureRelay, RecorderOptions, RecorderSession, RecorderState};
pub use utils::{ErrorResponse, RelayError, RelayResult};
