use std::sync::Arc;

use reqwest::blocking::Client;
use serde_json::{Value, json};

use crate::cloud::auth::TokenSource;
use crate::cloud::script::{ScriptParams, VmPaths, startup_script};
use crate::cloud::{JobLauncher, LaunchReceipt, LaunchRequest, instance_name};
use crate::command::builder::CommandBuilder;
use crate::foundation::error::{RenderError, RenderResult};
use crate::settings::ResolvedCloud;

const DEFAULT_ENDPOINT: &str = "https://compute.googleapis.com/compute/v1";
const BOOT_IMAGE: &str = "projects/cos-cloud/global/images/family/cos-stable";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
/// Time on top of the render limit for downloads, uploads and the cleanup trap.
const RUN_DURATION_MARGIN_SECS: u64 = 600;

/// Launches render VMs on Compute Engine through `instances.insert`.
#[derive(Debug)]
pub struct GceLauncher {
    client: Client,
    tokens: Arc<TokenSource>,
    cloud: ResolvedCloud,
    commands: CommandBuilder,
    endpoint: String,
}

impl GceLauncher {
    /// Launcher for the validated cloud settings.
    ///
    /// `commands` resolves the renderer contract inside the container, so its paths are
    /// container paths.
    pub fn new(
        client: Client,
        tokens: Arc<TokenSource>,
        cloud: ResolvedCloud,
        commands: CommandBuilder,
    ) -> Self {
        Self {
            client,
            tokens,
            cloud,
            commands,
            endpoint: DEFAULT_ENDPOINT.to_owned(),
        }
    }

    /// Point the launcher at another API endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_owned();
        self
    }

    /// Build the startup script for `request` on a VM called `instance`.
    pub fn render_script(&self, request: &LaunchRequest, instance: &str) -> RenderResult<String> {
        let paths = VmPaths::new(&request.asset_extension, &request.output_extension);
        let contract = self
            .commands
            .build(&paths.asset, &paths.config, &paths.output, None)?;
        Ok(startup_script(&ScriptParams {
            instance_name: instance,
            zone: &self.cloud.zone,
            container_image: &self.cloud.container_image,
            max_run_secs: self.cloud.max_run_duration_secs,
            contract: &contract,
            paths: &paths,
            asset_uri: &request.asset_uri,
            composition_uri: &request.composition_uri,
            output_uri: &request.output_uri,
            success_marker_uri: &request.success_marker_uri,
            failure_marker_uri: &request.failure_marker_uri,
            webhook_url: request.webhook_url.as_deref(),
        }))
    }

    /// Instance resource sent to `instances.insert`.
    ///
    /// Compute Engine deletes the VM once the render limit plus a margin has passed, even if
    /// the startup script never reaches its own self-delete.
    pub fn instance_resource(
        &self,
        request: &LaunchRequest,
        instance: &str,
        script: &str,
    ) -> Value {
        let mut metadata = vec![json!({ "key": "startup-script", "value": script })];
        if let Some(url) = request.webhook_url.as_deref() {
            metadata.push(json!({ "key": "render-webhook-url", "value": url }));
        }

        let machine_type = format!(
            "zones/{}/machineTypes/{}",
            self.cloud.zone, self.cloud.machine_type
        );
        let max_run = self
            .cloud
            .max_run_duration_secs
            .saturating_add(RUN_DURATION_MARGIN_SECS);

        json!({
            "name": instance,
            "machineType": machine_type,
            "labels": { "render-job": request.job_id.as_str().to_ascii_lowercase() },
            "disks": [{
                "boot": true,
                "autoDelete": true,
                "initializeParams": { "sourceImage": BOOT_IMAGE },
            }],
            "networkInterfaces": [{ "network": "global/networks/default" }],
            "serviceAccounts": [{
                "email": self.cloud.service_account_email,
                "scopes": [CLOUD_PLATFORM_SCOPE],
            }],
            "metadata": { "items": metadata },
            "scheduling": {
                "maxRunDuration": { "seconds": max_run.to_string() },
                "instanceTerminationAction": "DELETE",
            },
        })
    }

    fn insert_url(&self) -> String {
        format!(
            "{}/projects/{}/zones/{}/instances",
            self.endpoint, self.cloud.project_id, self.cloud.zone
        )
    }
}

impl JobLauncher for GceLauncher {
    #[tracing::instrument(skip(self, request), fields(job_id = %request.job_id))]
    fn launch(&self, request: &LaunchRequest) -> RenderResult<LaunchReceipt> {
        let instance = instance_name(&mut rand::rng());
        let script = self.render_script(request, &instance)?;
        let body = self.instance_resource(request, &instance, &script);

        tracing::info!(%instance, zone = %self.cloud.zone, "launching render VM");
        let token = self
            .tokens
            .bearer()
            .map_err(|e| RenderError::provisioning(format!("no compute credentials: {e:#}")))?;
        let resp = self
            .client
            .post(self.insert_url())
            .bearer_auth(token)
            .json(&body)
            .send()
            .map_err(|e| RenderError::provisioning(format!("instances.insert failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().unwrap_or_default();
            tracing::error!(%instance, %status, "render VM rejected");
            return Err(RenderError::provisioning(format!(
                "instances.insert for '{instance}' rejected with {status}: {}",
                detail.trim()
            )));
        }

        tracing::info!(%instance, "render VM accepted; it deletes itself when done");
        Ok(LaunchReceipt {
            instance_name: instance,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/cloud/gce.rs"]
mod tests;
