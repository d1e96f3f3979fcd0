//! Typed configuration, loaded once at startup and passed to every component by reference.
//!
//! Precedence is file → process environment. Keys are the upper-case environment names
//! (`BLENDER_APP`, `GCS_BUCKET_NAME`, ...); in a config file the same keys are written in
//! lower case.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::foundation::core::ExecutionEnvironment;
use crate::foundation::error::{RenderError, RenderResult};

const DEFAULT_FUNCTION_NAME: &str = "process";
const DEFAULT_OUTPUT_EXTENSION: &str = "mov";
const DEFAULT_TEMP_DIR: &str = "temp_dir";
const DEFAULT_MACHINE_TYPE: &str = "n1-standard-4";
const DEFAULT_SERVICE_ACCOUNT: &str = "default";
const DEFAULT_VM_MAX_RUN_SECS: u64 = 3600;
const GCE_METADATA_HOST_MARKER: &str = "metadata.google.internal";

/// Everything the dispatch engine needs to know about its surroundings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderConfig {
    /// Renderer invocation settings.
    pub renderer: RendererConfig,
    /// Explicitly configured environment, if any.
    pub environment: Option<ExecutionEnvironment>,
    /// Platform hints used when no environment is configured.
    pub platform: PlatformHints,
    /// Scratch directory for temporary config files and local outputs.
    pub temp_dir: PathBuf,
    /// Extension of rendered outputs (without the dot).
    pub output_extension: String,
    /// Cloud settings; only validated when the cloud path is used.
    pub cloud: CloudConfig,
}

/// Renderer binary, script and scene wiring.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RendererConfig {
    /// Renderer executable (`BLENDER_APP`).
    pub app: Option<String>,
    /// Script passed to `--python` (`BLENDER_SCRIPT_FILE`).
    pub script_file: Option<String>,
    /// Default scene/base file (`BLENDER_BASE_FILE`).
    pub base_scene: Option<String>,
    /// Entry point selected with `--function` (`BLENDER_FUNCTION_NAME`).
    pub function_name: String,
}

/// Runtime platform signals consulted by [`RenderConfig::resolve_environment`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformHints {
    /// Value of `GCE_METADATA_HOST`.
    pub gce_metadata_host: Option<String>,
    /// Value of `K_SERVICE` (set on Cloud Run).
    pub k_service: Option<String>,
}

/// Google Cloud project, compute and storage settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudConfig {
    /// `GCP_PROJECT_ID`.
    pub project_id: Option<String>,
    /// `GCP_ZONE`.
    pub zone: Option<String>,
    /// `GCP_MACHINE_TYPE`.
    pub machine_type: String,
    /// Renderer container image (`GCP_CONTAINER_IMAGE`).
    pub container_image: Option<String>,
    /// Service account attached to render VMs (`GCP_SERVICE_ACCOUNT_EMAIL`).
    pub service_account_email: String,
    /// Hard wall-clock limit of the render container (`GCP_VM_MAX_RUN_DURATION_SECONDS`).
    pub max_run_duration_secs: u64,
    /// Bucket holding job artifacts (`GCS_BUCKET_NAME`).
    pub bucket: Option<String>,
    /// Static bearer token (`GCP_ACCESS_TOKEN`); the metadata server is used when unset.
    pub access_token: Option<String>,
    /// Opaque completion webhook handed to the VM (`RENDER_WEBHOOK_URL`).
    pub webhook_url: Option<String>,
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            zone: None,
            machine_type: DEFAULT_MACHINE_TYPE.to_owned(),
            container_image: None,
            service_account_email: DEFAULT_SERVICE_ACCOUNT.to_owned(),
            max_run_duration_secs: DEFAULT_VM_MAX_RUN_SECS,
            bucket: None,
            access_token: None,
            webhook_url: None,
        }
    }
}

/// Cloud settings after validation: every required value is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedCloud {
    /// Project id.
    pub project_id: String,
    /// Compute zone.
    pub zone: String,
    /// Machine type name.
    pub machine_type: String,
    /// Renderer container image.
    pub container_image: String,
    /// Service account email.
    pub service_account_email: String,
    /// Container timeout in seconds.
    pub max_run_duration_secs: u64,
    /// Artifact bucket.
    pub bucket: String,
    /// Static bearer token, if configured.
    pub access_token: Option<String>,
    /// Opaque webhook passthrough.
    pub webhook_url: Option<String>,
}

impl CloudConfig {
    /// Check that project, zone, container image and bucket are set.
    pub fn validate(&self) -> RenderResult<ResolvedCloud> {
        fn required(value: &Option<String>, key: &str) -> RenderResult<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .ok_or_else(|| RenderError::invalid_configuration(format!("{key} is not set")))
        }

        if self.max_run_duration_secs == 0 {
            return Err(RenderError::invalid_configuration(
                "GCP_VM_MAX_RUN_DURATION_SECONDS must be non-zero",
            ));
        }

        Ok(ResolvedCloud {
            project_id: required(&self.project_id, "GCP_PROJECT_ID")?,
            zone: required(&self.zone, "GCP_ZONE")?,
            machine_type: self.machine_type.clone(),
            container_image: required(&self.container_image, "GCP_CONTAINER_IMAGE")?,
            service_account_email: self.service_account_email.clone(),
            max_run_duration_secs: self.max_run_duration_secs,
            bucket: required(&self.bucket, "GCS_BUCKET_NAME")?,
            access_token: self.access_token.clone(),
            webhook_url: self.webhook_url.clone(),
        })
    }
}

impl RenderConfig {
    /// Configuration for local rendering with the given renderer wiring and defaults elsewhere.
    pub fn local(renderer: RendererConfig, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            environment: Some(ExecutionEnvironment::Local),
            platform: PlatformHints::default(),
            temp_dir: temp_dir.into(),
            output_extension: DEFAULT_OUTPUT_EXTENSION.to_owned(),
            cloud: CloudConfig::default(),
        }
    }

    /// Pick the execution environment.
    ///
    /// An explicit setting wins. Otherwise a GCE metadata host or a Cloud Run service name
    /// selects the cloud; everything else renders locally.
    pub fn resolve_environment(&self) -> ExecutionEnvironment {
        if let Some(env) = self.environment {
            return env;
        }
        let on_gce = self
            .platform
            .gce_metadata_host
            .as_deref()
            .is_some_and(|h| h.contains(GCE_METADATA_HOST_MARKER));
        let on_cloud_run = self
            .platform
            .k_service
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        if on_gce || on_cloud_run {
            tracing::info!("cloud platform detected, rendering on cloud");
            ExecutionEnvironment::Cloud
        } else {
            ExecutionEnvironment::Local
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            app: None,
            script_file: None,
            base_scene: None,
            function_name: DEFAULT_FUNCTION_NAME.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    blender_app: Option<String>,
    blender_script_file: Option<String>,
    blender_base_file: Option<String>,
    blender_function_name: Option<String>,
    render_environment: Option<String>,
    render_temp_dir: Option<PathBuf>,
    render_output_extension: Option<String>,
    render_webhook_url: Option<String>,
    gcp_project_id: Option<String>,
    gcp_zone: Option<String>,
    gcp_machine_type: Option<String>,
    gcp_container_image: Option<String>,
    gcp_service_account_email: Option<String>,
    gcp_vm_max_run_duration_seconds: Option<u64>,
    gcp_access_token: Option<String>,
    gcs_bucket_name: Option<String>,
    gce_metadata_host: Option<String>,
    k_service: Option<String>,
}

/// Load settings from an optional config file layered under the process environment.
pub fn load(config_file: Option<&Path>) -> RenderResult<RenderConfig> {
    let mut builder = Config::builder();
    if let Some(path) = config_file {
        builder = builder.add_source(File::from(path).required(true));
    }
    builder = builder.add_source(Environment::default());

    let raw: RawSettings = builder
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| RenderError::invalid_configuration(format!("failed to load settings: {e}")))?;

    from_raw(raw)
}

fn from_raw(raw: RawSettings) -> RenderResult<RenderConfig> {
    let environment = non_empty(raw.render_environment)
        .map(|s| s.parse::<ExecutionEnvironment>())
        .transpose()?;

    let temp_dir = match raw.render_temp_dir {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| {
                RenderError::invalid_configuration(format!("cannot resolve working directory: {e}"))
            })?
            .join(DEFAULT_TEMP_DIR),
    };

    let output_extension = non_empty(raw.render_output_extension)
        .map(|ext| ext.trim_start_matches('.').to_owned())
        .unwrap_or_else(|| DEFAULT_OUTPUT_EXTENSION.to_owned());

    let defaults = CloudConfig::default();
    Ok(RenderConfig {
        renderer: RendererConfig {
            app: non_empty(raw.blender_app),
            script_file: non_empty(raw.blender_script_file),
            base_scene: non_empty(raw.blender_base_file),
            function_name: non_empty(raw.blender_function_name)
                .unwrap_or_else(|| DEFAULT_FUNCTION_NAME.to_owned()),
        },
        environment,
        platform: PlatformHints {
            gce_metadata_host: non_empty(raw.gce_metadata_host),
            k_service: non_empty(raw.k_service),
        },
        temp_dir,
        output_extension,
        cloud: CloudConfig {
            project_id: non_empty(raw.gcp_project_id),
            zone: non_empty(raw.gcp_zone),
            machine_type: non_empty(raw.gcp_machine_type).unwrap_or(defaults.machine_type),
            container_image: non_empty(raw.gcp_container_image),
            service_account_email: non_empty(raw.gcp_service_account_email)
                .unwrap_or(defaults.service_account_email),
            max_run_duration_secs: raw
                .gcp_vm_max_run_duration_seconds
                .unwrap_or(defaults.max_run_duration_secs),
            bucket: non_empty(raw.gcs_bucket_name),
            access_token: non_empty(raw.gcp_access_token),
            webhook_url: non_empty(raw.render_webhook_url),
        },
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
#[path = "../../tests/unit/settings/mod.rs"]
mod tests;
