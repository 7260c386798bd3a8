//! Recorded artifacts and object URLs
//!
//! A [`Blob`] is an immutable byte buffer with a MIME type. An
//! [`ObjectUrlStore`] hands out `blob:` URLs that refer to blobs for as long
//! as the store lives; nothing is written to disk.

use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Origin used when none is configured
pub const DEFAULT_ORIGIN: &str = "capture-relay";

/// Immutable recorded data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Bytes,
    mime_type: String,
}

impl Blob {
    pub fn new(data: Bytes, mime_type: impl Into<String>) -> Self {
        Self {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }
}

/// Registry of `blob:` URLs
#[derive(Debug, Clone)]
pub struct ObjectUrlStore {
    origin: String,
    blobs: Arc<RwLock<HashMap<String, Blob>>>,
}

impl Default for ObjectUrlStore {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl ObjectUrlStore {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            blobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register `blob` and return its URL
    pub fn create_object_url(&self, blob: Blob) -> String {
        let url = format!("blob:{}/{}", self.origin, Uuid::new_v4());
        tracing::debug!("Created object URL {} ({} bytes)", url, blob.size());
        self.blobs.write().insert(url.clone(), blob);
        url
    }

    /// Blob behind `url`, if it has not been revoked
    pub fn resolve(&self, url: &str) -> Option<Blob> {
        self.blobs.read().get(url).cloned()
    }

    /// Release the blob behind `url`
    pub fn revoke_object_url(&self, url: &str) -> bool {
        let removed = self.blobs.write().remove(url).is_some();
        if removed {
            tracing::debug!("Revoked object URL {}", url);
        }
        removed
    }

    /// Number of live URLs
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_unique_and_resolvable() {
        let store = ObjectUrlStore::new("localhost");
        let first = store.create_object_url(Blob::new(Bytes::from_static(b"one"), "video/webm"));
        let second = store.create_object_url(Blob::new(Bytes::from_static(b"two"), "video/webm"));

        assert_ne!(first, second);
        assert!(first.starts_with("blob:localhost/"));
        assert_eq!(store.resolve(&second).unwrap().bytes().as_ref(), b"two");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_revoked_url_no_longer_resolves() {
        let store = ObjectUrlStore::default();
        let url = store.create_object_url(Blob::new(Bytes::from_static(b"data"), "video/webm"));

        assert!(store.revoke_object_url(&url));
        assert!(!store.revoke_object_url(&url));
        assert!(store.resolve(&url).is_none());
        assert!(store.is_empty());
    }
}
