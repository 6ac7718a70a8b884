//! In-memory blobs and object URLs
//!
//! An object URL keeps its blob alive until it is revoked. The registry counts
//! live URLs so a missing or doubled revoke shows up in tests.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Immutable binary object tagged with a media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    data: Arc<[u8]>,
    mime_type: String,
}

impl Blob {
    /// Concatenate chunks in order
    pub fn from_chunks<C: AsRef<[u8]>>(chunks: &[C], mime_type: &str) -> Self {
        let total = chunks.iter().map(|c| c.as_ref().len()).sum();
        let mut data = Vec::with_capacity(total);
        for chunk in chunks {
            data.extend_from_slice(chunk.as_ref());
        }
        Self {
            data: data.into(),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

/// Transient reference to a registered blob
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct RegistryInner {
    live: HashMap<ObjectUrl, Blob>,
    created: usize,
    revoked: usize,
}

/// Registry of live object URLs, shared by the controller and the sinks
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blob and hand out a URL for it
    pub fn create_object_url(&self, blob: Blob) -> ObjectUrl {
        let url = ObjectUrl(format!("blob:webcam-recorder/{}", Uuid::new_v4()));
        let mut inner = self.inner.lock();
        inner.live.insert(url.clone(), blob);
        inner.created += 1;
        tracing::debug!("Created object URL {}", url);
        url
    }

    /// Release a URL. Returns false if it was not live.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let mut inner = self.inner.lock();
        if inner.live.remove(url).is_some() {
            inner.revoked += 1;
            tracing::debug!("Revoked object URL {}", url);
            true
        } else {
            tracing::warn!("Revoke of unknown object URL {}", url);
            false
        }
    }

    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.inner.lock().live.get(url).cloned()
    }

    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    /// Total URLs ever created and revoked
    pub fn totals(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.created, inner.revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_chunks_preserves_order() {
        let chunks = vec![vec![1u8, 2], vec![3], vec![], vec![4, 5]];
        let blob = Blob::from_chunks(&chunks, "video/webm");
        assert_eq!(blob.bytes(), &[1, 2, 3, 4, 5]);
        assert_eq!(blob.size(), 5);
        assert_eq!(blob.mime_type(), "video/webm");
    }

    #[test]
    fn test_revoke_once() {
        let registry = ObjectUrlRegistry::new();
        let url = registry.create_object_url(Blob::from_chunks(&[vec![0u8; 4]], "video/webm"));
        assert_eq!(registry.live_count(), 1);
        assert_eq!(registry.resolve(&url).map(|b| b.size()), Some(4));

        assert!(registry.revoke(&url));
        assert!(!registry.revoke(&url));
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.totals(), (1, 1));
        assert!(registry.resolve(&url).is_none());
    }
}
