use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use reqwest::blocking::Client;
use serde::Deserialize;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

/// Source of OAuth bearer tokens for Google Cloud REST calls.
///
/// Either a static token from configuration or the instance metadata server, whose tokens
/// are cached until shortly before they expire.
pub struct TokenSource {
    inner: Inner,
}

enum Inner {
    Static(String),
    Metadata {
        client: Client,
        cached: Mutex<Option<(String, Instant)>>,
    },
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.inner {
            Inner::Static(_) => "static",
            Inner::Metadata { .. } => "metadata",
        };
        f.debug_struct("TokenSource").field("kind", &kind).finish()
    }
}

impl TokenSource {
    /// Use `token` when set, the metadata server otherwise.
    pub fn new(token: Option<&str>, client: Client) -> Self {
        let inner = match token.filter(|t| !t.trim().is_empty()) {
            Some(token) => Inner::Static(token.trim().to_owned()),
            None => Inner::Metadata {
                client,
                cached: Mutex::new(None),
            },
        };
        Self { inner }
    }

    /// Current bearer token.
    pub fn bearer(&self) -> anyhow::Result<String> {
        match &self.inner {
            Inner::Static(token) => Ok(token.clone()),
            Inner::Metadata { client, cached } => {
                let mut cached = cached
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if let Some((token, valid_until)) = cached.as_ref()
                    && Instant::now() < *valid_until
                {
                    return Ok(token.clone());
                }

                tracing::debug!("fetching access token from metadata server");
                let fresh: MetadataToken = client
                    .get(METADATA_TOKEN_URL)
                    .header("Metadata-Flavor", "Google")
                    .send()
                    .context("metadata server unreachable")?
                    .error_for_status()
                    .context("metadata server refused token request")?
                    .json()
                    .context("metadata server returned malformed token")?;

                let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(EXPIRY_SLACK);
                *cached = Some((fresh.access_token.clone(), Instant::now() + lifetime));
                Ok(fresh.access_token)
            }
        }
    }
}
