use std::path::Path;

use crate::foundation::core::JobId;
use crate::foundation::error::{RenderError, RenderResult};

/// Prefix under which every job's objects live.
pub const RENDERS_PREFIX: &str = "renders";
/// Marker object written after the output object on success.
pub const SUCCESS_MARKER: &str = "_SUCCESS";
/// Marker object (empty or a diagnostic log) written on failure.
pub const FAILURE_MARKER: &str = "_FAILED";
/// Composition object name.
pub const INPUT_CONFIG: &str = "input.json";

const DEFAULT_ASSET_EXTENSION: &str = "glb";

/// Object keys for one job under `renders/<job_id>/`.
///
/// Marker names are a wire contract shared with the VM startup script and any other poller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobLayout {
    prefix: String,
    asset_extension: String,
    output_extension: String,
}

impl JobLayout {
    /// Layout for `job_id` with the given asset and output extensions (without dots).
    pub fn new(job_id: &JobId, asset_extension: &str, output_extension: &str) -> Self {
        Self {
            prefix: format!("{RENDERS_PREFIX}/{job_id}"),
            asset_extension: clean_extension(asset_extension, DEFAULT_ASSET_EXTENSION),
            output_extension: clean_extension(output_extension, "mov"),
        }
    }

    /// Layout whose asset extension is taken from `asset_path` (`glb` when it has none).
    pub fn for_asset(job_id: &JobId, asset_path: &Path, output_extension: &str) -> Self {
        let ext = asset_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(DEFAULT_ASSET_EXTENSION);
        Self::new(job_id, ext, output_extension)
    }

    /// `renders/<job_id>`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Extension of the uploaded asset.
    pub fn asset_extension(&self) -> &str {
        &self.asset_extension
    }

    /// Extension of the rendered output.
    pub fn output_extension(&self) -> &str {
        &self.output_extension
    }

    /// `renders/<job_id>/input.<ext>`.
    pub fn input_asset(&self) -> String {
        format!("{}/input.{}", self.prefix, self.asset_extension)
    }

    /// `renders/<job_id>/input.json`.
    pub fn input_config(&self) -> String {
        format!("{}/{INPUT_CONFIG}", self.prefix)
    }

    /// `renders/<job_id>/output.<ext>`.
    pub fn output(&self) -> String {
        format!("{}/output.{}", self.prefix, self.output_extension)
    }

    /// `renders/<job_id>/_SUCCESS`.
    pub fn success_marker(&self) -> String {
        format!("{}/{SUCCESS_MARKER}", self.prefix)
    }

    /// `renders/<job_id>/_FAILED`.
    pub fn failure_marker(&self) -> String {
        format!("{}/{FAILURE_MARKER}", self.prefix)
    }
}

fn clean_extension(ext: &str, fallback: &str) -> String {
    checked_extension(ext).unwrap_or_else(|| {
        tracing::warn!(extension = ext, fallback, "unusable file extension, using fallback");
        fallback.to_owned()
    })
}

/// Lowercased extension without its leading dot, or `None` unless it is non-empty ASCII
/// alphanumeric.
fn checked_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    (!ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric())).then_some(ext)
}

/// Validate an object key: non-empty, relative, `/`-separated, no `.`/`..` segments.
pub fn normalize_key(key: &str) -> RenderResult<String> {
    let normalized = key.replace('\\', "/");
    if normalized.is_empty() || normalized.starts_with('/') {
        return Err(RenderError::invalid_request(format!(
            "object key must be a non-empty relative path, got '{key}'"
        )));
    }
    if normalized
        .split('/')
        .any(|seg| seg.is_empty() || seg == "." || seg == "..")
    {
        return Err(RenderError::invalid_request(format!(
            "object key has an empty, '.' or '..' segment: '{key}'"
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
#[path = "../../tests/unit/store/layout.rs"]
mod tests;
