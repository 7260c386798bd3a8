//! In-memory capture device
//!
//! The host pushes media into the stream itself through a [`LoopbackFeed`].
//! Useful for headless hosts that already hold captured media, and for tests.

use super::stream::{chunk_channel, ChunkSender, MediaStream};
use super::traits::{
    CaptureError, CaptureResult, MediaConstraints, MediaDevices, TrackInfo, TrackKind,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;

/// Host-side handle feeding a loopback stream
#[derive(Debug)]
pub struct LoopbackFeed {
    sender: ChunkSender,
}

impl LoopbackFeed {
    /// Push bytes on the given track. Returns false once the stream is gone.
    pub fn push(&self, kind: TrackKind, data: impl Into<Bytes>) -> bool {
        self.sender.send_chunk(kind, data)
    }

    /// Make the source fail with an aborted track
    pub fn fail(&self, message: impl Into<String>) -> bool {
        self.sender.fail(CaptureError::Aborted(message.into()))
    }

    /// Make the source fail with a specific capture error
    pub fn fail_with(&self, error: CaptureError) -> bool {
        self.sender.fail(error)
    }

    /// End the stream, as if every track had been unplugged
    pub fn end(self) {}
}

#[derive(Debug, Default)]
struct LoopbackInner {
    denied: bool,
    pending_feed: Option<LoopbackFeed>,
    streams_created: usize,
}

/// Capture device backed by host-supplied bytes
#[derive(Debug, Clone, Default)]
pub struct LoopbackDevices {
    inner: Arc<Mutex<LoopbackInner>>,
}

impl LoopbackDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses every capture request
    pub fn denied() -> Self {
        let devices = Self::default();
        devices.set_permission(false);
        devices
    }

    /// Grant or revoke capture permission for later requests
    pub fn set_permission(&self, granted: bool) {
        self.inner.lock().denied = !granted;
    }

    /// Take the feed of the most recently created stream
    pub fn take_feed(&self) -> Option<LoopbackFeed> {
        self.inner.lock().pending_feed.take()
    }

    /// Number of streams handed out so far
    pub fn streams_created(&self) -> usize {
        self.inner.lock().streams_created
    }
}

#[async_trait]
impl MediaDevices for LoopbackDevices {
    async fn get_user_media(&self, constraints: MediaConstraints) -> CaptureResult<MediaStream> {
        if !constraints.is_satisfiable() {
            return Err(CaptureError::Overconstrained(
                "at least one of audio or video must be requested".to_string(),
            ));
        }

        let mut inner = self.inner.lock();
        if inner.denied {
            tracing::warn!("Loopback capture request denied");
            return Err(CaptureError::NotAllowed(
                "capture permission was denied".to_string(),
            ));
        }

        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(TrackInfo {
                kind: TrackKind::Video,
                label: "Loopback video".to_string(),
            });
        }
        if constraints.audio {
            tracks.push(TrackInfo {
                kind: TrackKind::Audio,
                label: "Loopback audio".to_string(),
            });
        }

        let (sender, rx) = chunk_channel();
        inner.pending_feed = Some(LoopbackFeed { sender });
        inner.streams_created += 1;

        let stream = MediaStream::new(tracks, rx);
        tracing::debug!("Loopback stream {} created", stream.id());
        Ok(stream)
    }
}
