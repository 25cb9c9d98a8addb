//! Transient content handles for produced segments.
//!
//! Handles stay valid until the next batch is published or the store is
//! cleared, whichever comes first.

use std::collections::HashMap;

use bytes::Bytes;
use parking_lot::RwLock;
use slicer_core::ContentHandle;

#[derive(Debug, Default)]
pub struct SegmentStore {
    entries: RwLock<HashMap<ContentHandle, Bytes>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current generation with `contents`, returning one handle
    /// per item in order. Every previously issued handle is revoked.
    pub fn publish(&self, contents: impl IntoIterator<Item = Bytes>) -> Vec<ContentHandle> {
        let fresh: Vec<(ContentHandle, Bytes)> = contents
            .into_iter()
            .map(|bytes| (ContentHandle::new(), bytes))
            .collect();
        let handles = fresh.iter().map(|(h, _)| *h).collect();

        let mut entries = self.entries.write();
        let revoked = entries.len();
        *entries = fresh.into_iter().collect();
        if revoked > 0 {
            tracing::debug!("Revoked {revoked} content handles");
        }
        handles
    }

    pub fn fetch(&self, handle: ContentHandle) -> Option<Bytes> {
        self.entries.read().get(&handle).cloned()
    }

    /// Revoke a single handle. Returns whether it was live.
    pub fn revoke(&self, handle: ContentHandle) -> bool {
        self.entries.write().remove(&handle).is_some()
    }

    /// Revoke everything.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        if !entries.is_empty() {
            tracing::debug!("Clearing {} content handles", entries.len());
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
