use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::Context as _;

use crate::foundation::error::{RenderError, RenderResult};
use crate::store::ArtifactStore;
use crate::store::layout::normalize_key;

/// One stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    /// Object bytes.
    pub data: Vec<u8>,
    /// Content type recorded at upload.
    pub content_type: String,
}

/// In-memory store for tests and debugging.
///
/// Counts every trait call and can simulate an unreachable backend.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    calls: AtomicUsize,
    offline: AtomicBool,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object directly, bypassing the call counter.
    pub fn put(&self, key: &str, data: impl Into<Vec<u8>>) {
        self.objects().insert(
            key.to_owned(),
            StoredObject {
                data: data.into(),
                content_type: "application/octet-stream".to_owned(),
            },
        );
    }

    /// Fetch a copy of an object.
    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects().get(key).cloned()
    }

    /// Sorted list of stored keys.
    pub fn keys(&self) -> Vec<String> {
        self.objects().keys().cloned().collect()
    }

    /// Number of [`ArtifactStore`] calls served so far (including failed ones).
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every subsequent call fail with a storage access error (or recover).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn objects(&self) -> MutexGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, key: &str) -> RenderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(RenderError::storage_access(format!(
                "in-memory store is offline (key '{key}')"
            )));
        }
        normalize_key(key)
    }
}

impl ArtifactStore for InMemoryStore {
    fn upload(&self, local_path: &Path, key: &str) -> RenderResult<String> {
        let key = self.enter(key)?;
        let data = std::fs::read(local_path)
            .with_context(|| format!("read '{}' for upload", local_path.display()))?;
        self.objects().insert(
            key.clone(),
            StoredObject {
                data,
                content_type: "application/octet-stream".to_owned(),
            },
        );
        Ok(self.uri(&key))
    }

    fn upload_bytes(&self, data: &[u8], key: &str, content_type: &str) -> RenderResult<String> {
        let key = self.enter(key)?;
        self.objects().insert(
            key.clone(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_owned(),
            },
        );
        Ok(self.uri(&key))
    }

    fn exists(&self, key: &str) -> RenderResult<bool> {
        let key = self.enter(key)?;
        Ok(self.objects().contains_key(&key))
    }

    fn uri(&self, key: &str) -> String {
        format!("mem://{key}")
    }
}
