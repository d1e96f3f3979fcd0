use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::foundation::error::{RenderError, RenderResult};
use crate::store::ArtifactStore;
use crate::store::layout::normalize_key;

/// Store rooted at a local directory; URIs are `file://` paths.
///
/// Useful for development and for sharing a job namespace through a mounted volume.
#[derive(Clone, Debug)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Create a store rooted at `root` (created lazily on first upload).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing `key`.
    pub fn path_for(&self, key: &str) -> RenderResult<PathBuf> {
        let key = normalize_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |p, seg| p.join(seg)))
    }

    fn prepare_target(&self, key: &str) -> RenderResult<PathBuf> {
        let target = self.path_for(key)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                RenderError::storage_access(format!(
                    "failed to create '{}': {e}",
                    parent.display()
                ))
            })?;
        }
        Ok(target)
    }
}

impl ArtifactStore for FsStore {
    fn upload(&self, local_path: &Path, key: &str) -> RenderResult<String> {
        let target = self.prepare_target(key)?;
        tracing::info!(from = %local_path.display(), to = %target.display(), "uploading file");
        std::fs::copy(local_path, &target).map_err(|e| {
            RenderError::storage_access(format!(
                "failed to copy '{}' to '{}': {e}",
                local_path.display(),
                target.display()
            ))
        })?;
        Ok(self.uri(key))
    }

    fn upload_bytes(&self, data: &[u8], key: &str, _content_type: &str) -> RenderResult<String> {
        let target = self.prepare_target(key)?;
        tracing::info!(to = %target.display(), bytes = data.len(), "uploading bytes");
        std::fs::write(&target, data).map_err(|e| {
            RenderError::storage_access(format!("failed to write '{}': {e}", target.display()))
        })?;
        Ok(self.uri(key))
    }

    fn exists(&self, key: &str) -> RenderResult<bool> {
        let target = self.path_for(key)?;
        match std::fs::metadata(&target) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(RenderError::storage_access(format!(
                "failed to stat '{}': {e}",
                target.display()
            ))),
        }
    }

    fn uri(&self, key: &str) -> String {
        format!("file://{}/{}", self.root.display(), key.trim_start_matches('/'))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/fs.rs"]
mod tests;
