//! Single-purpose cloud VMs that download inputs, render, upload results and delete themselves.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::blocking::Client;

use crate::cloud::auth::TokenSource;
use crate::cloud::gce::GceLauncher;
use crate::command::builder::CommandBuilder;
use crate::foundation::core::JobId;
use crate::foundation::error::{RenderError, RenderResult};
use crate::settings::RenderConfig;
use crate::store::gcs::GcsStore;

/// OAuth token sources for Google Cloud REST calls.
pub mod auth;
/// Compute Engine launcher.
pub mod gce;
/// Startup script generation.
pub mod script;

/// Everything a launcher needs to start one render VM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Job identity (used for logging and instance labels).
    pub job_id: JobId,
    /// URI of the uploaded asset.
    pub asset_uri: String,
    /// Extension of the asset (the VM keeps it for the renderer's importer).
    pub asset_extension: String,
    /// URI of the uploaded composition.
    pub composition_uri: String,
    /// Where the VM uploads the rendered output.
    pub output_uri: String,
    /// Extension of the rendered output.
    pub output_extension: String,
    /// Where the VM uploads the success marker, after the output.
    pub success_marker_uri: String,
    /// Where the VM uploads the failure marker (its log) on any failure.
    pub failure_marker_uri: String,
    /// Opaque completion webhook forwarded to the VM. Delivery is not tracked.
    pub webhook_url: Option<String>,
}

/// Acknowledgement that provisioning was accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchReceipt {
    /// Name of the VM that will run the job.
    pub instance_name: String,
}

/// Fire-and-forget launcher of render VMs.
///
/// `launch` returns as soon as the provider accepts the request; it never waits for the render.
/// A rejected request is a [`crate::RenderError::Provisioning`] and creates no marker.
pub trait JobLauncher: Send + Sync {
    /// Provision one VM for `request`.
    fn launch(&self, request: &LaunchRequest) -> RenderResult<LaunchReceipt>;
}

const INSTANCE_SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const INSTANCE_SUFFIX_LEN: usize = 8;

/// Random VM name `render-job-<8 lowercase alphanumerics>`.
pub fn instance_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let suffix: String = (0..INSTANCE_SUFFIX_LEN)
        .map(|_| {
            INSTANCE_SUFFIX_ALPHABET[rng.random_range(0..INSTANCE_SUFFIX_ALPHABET.len())] as char
        })
        .collect();
    format!("render-job-{suffix}")
}

const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the Google Cloud store and launcher from `config`.
///
/// Fails with [`RenderError::InvalidConfiguration`] before any network traffic when the cloud
/// settings are incomplete. Both share one HTTP client and one token source.
pub fn connect(config: &RenderConfig) -> RenderResult<(GcsStore, GceLauncher)> {
    let cloud = config.cloud.validate()?;
    let client = Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| RenderError::invalid_configuration(format!("http client: {e}")))?;
    let tokens = Arc::new(TokenSource::new(cloud.access_token.as_deref(), client.clone()));

    tracing::debug!(
        project = %cloud.project_id,
        zone = %cloud.zone,
        bucket = %cloud.bucket,
        ?tokens,
        "connecting to google cloud"
    );
    let store = GcsStore::new(client.clone(), tokens.clone(), cloud.bucket.clone());
    let launcher = GceLauncher::new(
        client,
        tokens,
        cloud,
        CommandBuilder::new(config.renderer.clone()),
    );
    Ok((store, launcher))
}
