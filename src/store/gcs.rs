use std::path::Path;
use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;

use crate::cloud::auth::TokenSource;
use crate::foundation::error::{RenderError, RenderResult};
use crate::store::ArtifactStore;
use crate::store::layout::normalize_key;

const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";

/// Google Cloud Storage bucket accessed through the JSON API.
#[derive(Clone, Debug)]
pub struct GcsStore {
    client: Client,
    tokens: Arc<TokenSource>,
    bucket: String,
    endpoint: String,
}

impl GcsStore {
    /// Store for `bucket` using the shared token source.
    pub fn new(client: Client, tokens: Arc<TokenSource>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            tokens,
            bucket: bucket.into(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }

    /// Point the store at another API endpoint (emulators, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn bearer(&self) -> RenderResult<String> {
        self.tokens
            .bearer()
            .map_err(|e| RenderError::storage_access(format!("no storage credentials: {e:#}")))
    }

    fn upload_url(&self) -> String {
        format!("{}/upload/storage/v1/b/{}/o", self.endpoint, self.bucket)
    }

    fn object_url(&self, key: &str) -> RenderResult<Url> {
        let mut url = Url::parse(&format!("{}/storage/v1/b", self.endpoint)).map_err(|e| {
            RenderError::invalid_configuration(format!("bad storage endpoint: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|_| RenderError::invalid_configuration("storage endpoint cannot be a base"))?
            .push(&self.bucket)
            .push("o")
            .push(key);
        Ok(url)
    }

    fn put(
        &self,
        key: &str,
        body: reqwest::blocking::Body,
        content_type: &str,
    ) -> RenderResult<String> {
        let key = normalize_key(key)?;
        let resp = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key.as_str())])
            .bearer_auth(self.bearer()?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .map_err(|e| RenderError::storage_access(format!("upload of '{key}' failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            return Err(RenderError::storage_access(format!(
                "upload of '{key}' rejected with {status}: {}",
                detail.trim()
            )));
        }
        tracing::info!(uri = %self.uri(&key), "uploaded object");
        Ok(self.uri(&key))
    }
}

impl ArtifactStore for GcsStore {
    fn upload(&self, local_path: &Path, key: &str) -> RenderResult<String> {
        tracing::info!(from = %local_path.display(), to = %self.uri(key), "uploading file");
        let file = std::fs::File::open(local_path).map_err(|e| {
            RenderError::invalid_request(format!(
                "cannot open '{}' for upload: {e}",
                local_path.display()
            ))
        })?;
        self.put(key, file.into(), "application/octet-stream")
    }

    fn upload_bytes(&self, data: &[u8], key: &str, content_type: &str) -> RenderResult<String> {
        self.put(key, data.to_vec().into(), content_type)
    }

    fn exists(&self, key: &str) -> RenderResult<bool> {
        let key = normalize_key(key)?;
        let resp = self
            .client
            .get(self.object_url(&key)?)
            .bearer_auth(self.bearer()?)
            .send()
            .map_err(|e| RenderError::storage_access(format!("lookup of '{key}' failed: {e}")))?;

        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(RenderError::storage_access(format!(
                "lookup of '{key}' returned {status}"
            ))),
        }
    }

    fn uri(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/gcs.rs"]
mod tests;
