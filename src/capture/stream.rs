//! Live capture streams
//!
//! A [`MediaStream`] is the receiving end of a capture source. Sources push
//! [`CaptureMessage`]s through a [`ChunkSender`]; the stream is consumed by the
//! recorder bound to it.

use super::traits::{CaptureError, TrackInfo, TrackKind};
use bytes::Bytes;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One piece of captured media
#[derive(Debug, Clone)]
pub struct MediaChunk {
    pub kind: TrackKind,
    pub data: Bytes,
}

/// Message delivered by a capture source
#[derive(Debug, Clone)]
pub enum CaptureMessage {
    /// Captured media bytes
    Chunk(MediaChunk),
    /// The source failed and will not deliver further chunks
    Failed(CaptureError),
}

/// Releases the resources behind a stream (threads, devices)
///
/// `stop` may block until the device is released. Inside a tokio runtime it is
/// run on the blocking pool.
pub trait StreamGuard: Send + 'static {
    fn stop(&mut self);
}

/// Sending half handed to a capture source
#[derive(Debug, Clone)]
pub struct ChunkSender {
    tx: mpsc::UnboundedSender<CaptureMessage>,
}

impl ChunkSender {
    /// Push captured bytes. Returns false once the stream has been dropped.
    pub fn send_chunk(&self, kind: TrackKind, data: impl Into<Bytes>) -> bool {
        self.tx
            .send(CaptureMessage::Chunk(MediaChunk {
                kind,
                data: data.into(),
            }))
            .is_ok()
    }

    /// Report a source failure
    pub fn fail(&self, error: CaptureError) -> bool {
        self.tx.send(CaptureMessage::Failed(error)).is_ok()
    }

    /// Whether the receiving stream is gone
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a connected sender/receiver pair for a new stream
pub fn chunk_channel() -> (ChunkSender, mpsc::UnboundedReceiver<CaptureMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChunkSender { tx }, rx)
}

/// A live audio/video capture stream
pub struct MediaStream {
    id: String,
    tracks: Vec<TrackInfo>,
    chunks: mpsc::UnboundedReceiver<CaptureMessage>,
    guard: Option<Box<dyn StreamGuard>>,
}

impl MediaStream {
    /// Create a stream over a chunk receiver
    pub fn new(tracks: Vec<TrackInfo>, chunks: mpsc::UnboundedReceiver<CaptureMessage>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
            chunks,
            guard: None,
        }
    }

    /// Attach the guard that is stopped together with the stream
    pub fn with_guard(mut self, guard: Box<dyn StreamGuard>) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Unique stream ID
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tracks carried by this stream
    pub fn tracks(&self) -> &[TrackInfo] {
        &self.tracks
    }

    pub fn has_track(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }

    /// Wait for the next message. `None` once every source has ended.
    pub async fn next_message(&mut self) -> Option<CaptureMessage> {
        self.chunks.recv().await
    }

    /// Take a message that is already queued, without waiting
    pub fn try_next_message(&mut self) -> Option<CaptureMessage> {
        self.chunks.try_recv().ok()
    }

    /// Stop all tracks
    ///
    /// Returns without waiting for the devices when called on a tokio runtime.
    pub fn stop(&mut self) {
        self.chunks.close();
        let Some(mut guard) = self.guard.take() else {
            return;
        };

        let id = self.id.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || {
                    guard.stop();
                    tracing::debug!("Stream {} stopped", id);
                });
            }
            Err(_) => {
                guard.stop();
                tracing::debug!("Stream {} stopped", id);
            }
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks)
            .finish()
    }
}
