//! Durable object storage for cloud job inputs, outputs and marker objects.

use std::path::Path;

use crate::foundation::error::RenderResult;

/// Directory-backed store.
pub mod fs;
/// Google Cloud Storage backed store.
pub mod gcs;
/// Per-job object layout.
pub mod layout;
/// Thread-safe in-memory store for tests and stubs.
pub mod memory;

/// Object store contract used by the dispatcher and the status tracker.
///
/// Every call is a synchronous round-trip. Keys are `/`-separated relative paths.
pub trait ArtifactStore: Send + Sync {
    /// Upload a local file under `key` and return its URI.
    fn upload(&self, local_path: &Path, key: &str) -> RenderResult<String>;

    /// Upload bytes under `key` with the given content type and return its URI.
    fn upload_bytes(&self, data: &[u8], key: &str, content_type: &str) -> RenderResult<String>;

    /// Whether an object exists under `key`.
    ///
    /// Not-found is `Ok(false)`. Only connectivity or permission failures are errors
    /// ([`crate::RenderError::StorageAccess`]).
    fn exists(&self, key: &str) -> RenderResult<bool>;

    /// Addressable URI for `key` (for example `gs://bucket/key`).
    fn uri(&self, key: &str) -> String;
}
