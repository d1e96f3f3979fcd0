use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::RenderResult;

/// File removed when the guard drops, unless kept.
///
/// Removal failures are logged and never replace the render outcome.
#[derive(Debug)]
pub(crate) struct TempFile {
    path: PathBuf,
    armed: bool,
}

impl TempFile {
    /// Write `data` to `path` and guard it.
    pub(crate) fn write(path: PathBuf, data: &[u8]) -> RenderResult<Self> {
        std::fs::write(&path, data)
            .with_context(|| format!("write temp file '{}'", path.display()))?;
        tracing::debug!(path = %path.display(), "wrote temp file");
        Ok(Self { path, armed: true })
    }

    /// Guard a path that something else may create later.
    pub(crate) fn guard(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Disarm the guard and hand back the path.
    pub(crate) fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "temp file cleanup failed")
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/temp.rs"]
mod tests;
