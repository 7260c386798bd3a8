//! Capture sources
//!
//! This module provides the device side of the adapter: the `MediaDevices`
//! trait, live streams, display surfaces and the concrete devices.

pub mod loopback;
pub mod stream;
pub mod surface;
pub mod traits;

#[cfg(feature = "native")]
pub mod native;

pub use loopback::{LoopbackDevices, LoopbackFeed};
pub use stream::{
    chunk_channel, CaptureMessage, ChunkSender, MediaChunk, MediaStream, StreamGuard,
};
pub use surface::{SurfaceBinding, SurfaceRegistry};
pub use traits::{
    AudioDeviceInfo, CameraInfo, CaptureError, CaptureResult, MediaConstraints, MediaDevices,
    Resolution, TrackInfo, TrackKind,
};
