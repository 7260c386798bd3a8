//! Display surfaces
//!
//! Surfaces are preview targets owned by the host. A capture stream is bound
//! to one surface when the recorder is enabled.

use super::stream::MediaStream;
use super::traits::TrackInfo;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Which stream is shown on a surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfaceBinding {
    pub stream_id: String,
    pub tracks: Vec<TrackInfo>,
    pub bound_at: DateTime<Utc>,
}

/// Registry of host display surfaces
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    surfaces: Arc<RwLock<HashMap<String, Option<SurfaceBinding>>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a surface the host can display streams on
    pub fn register(&self, surface_id: impl Into<String>) {
        let surface_id = surface_id.into();
        tracing::debug!("Registered display surface '{}'", surface_id);
        self.surfaces.write().entry(surface_id).or_insert(None);
    }

    /// Remove a surface and its binding
    pub fn unregister(&self, surface_id: &str) -> bool {
        self.surfaces.write().remove(surface_id).is_some()
    }

    pub fn contains(&self, surface_id: &str) -> bool {
        self.surfaces.read().contains_key(surface_id)
    }

    /// Show `stream` on the surface, replacing any previous binding.
    /// Returns false if the surface is unknown.
    pub fn bind(&self, surface_id: &str, stream: &MediaStream) -> bool {
        let mut surfaces = self.surfaces.write();
        match surfaces.get_mut(surface_id) {
            Some(slot) => {
                *slot = Some(SurfaceBinding {
                    stream_id: stream.id().to_string(),
                    tracks: stream.tracks().to_vec(),
                    bound_at: Utc::now(),
                });
                tracing::debug!("Stream {} bound to surface '{}'", stream.id(), surface_id);
                true
            }
            None => false,
        }
    }

    /// Clear the binding if it still refers to `stream_id`
    pub fn release(&self, surface_id: &str, stream_id: &str) {
        if let Some(slot) = self.surfaces.write().get_mut(surface_id) {
            if slot.as_ref().map(|b| b.stream_id.as_str()) == Some(stream_id) {
                *slot = None;
            }
        }
    }

    /// Current binding of a surface
    pub fn binding(&self, surface_id: &str) -> Option<SurfaceBinding> {
        self.surfaces.read().get(surface_id).cloned().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::stream::chunk_channel;

    #[test]
    fn test_bind_requires_registered_surface() {
        let registry = SurfaceRegistry::new();
        let (_tx, rx) = chunk_channel();
        let stream = MediaStream::new(Vec::new(), rx);

        assert!(!registry.bind("preview", &stream));

        registry.register("preview");
        assert!(registry.bind("preview", &stream));
        assert_eq!(registry.binding("preview").unwrap().stream_id, stream.id());
    }

    #[test]
    fn test_release_ignores_newer_binding() {
        let registry = SurfaceRegistry::new();
        registry.register("preview");

        let (_tx1, rx1) = chunk_channel();
        let first = MediaStream::new(Vec::new(), rx1);
        let (_tx2, rx2) = chunk_channel();
        let second = MediaStream::new(Vec::new(), rx2);

        registry.bind("preview", &first);
        registry.bind("preview", &second);
        registry.release("preview", first.id());

        assert_eq!(registry.binding("preview").unwrap().stream_id, second.id());

        registry.release("preview", second.id());
        assert!(registry.binding("preview").is_none());
        assert!(registry.contains("preview"));
    }
}
