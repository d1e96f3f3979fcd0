use crate::command::contract::{ExecutionContract, shell_quote};

/// Scratch directory on the VM, bind-mounted into every container.
///
/// The boot image's root filesystem is read-only; `/var` is writable.
pub const VM_DATA_DIR: &str = "/var/lib/render";
/// Log file uploaded as the failure marker.
pub const VM_LOG_FILE: &str = "/var/lib/render/render_log.txt";
/// Composition path on the VM.
pub const VM_CONFIG_FILE: &str = "/var/lib/render/config.json";
/// Image providing `gcloud`, which the boot image does not ship.
pub const CLOUD_SDK_IMAGE: &str = "google/cloud-sdk:slim";

/// VM-local paths for one job's inputs and output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VmPaths {
    /// Downloaded asset.
    pub asset: String,
    /// Downloaded composition.
    pub config: String,
    /// Rendered output.
    pub output: String,
}

impl VmPaths {
    /// Paths keeping the asset and output extensions.
    pub fn new(asset_extension: &str, output_extension: &str) -> Self {
        Self {
            asset: format!("{VM_DATA_DIR}/scene.{asset_extension}"),
            config: VM_CONFIG_FILE.to_owned(),
            output: format!("{VM_DATA_DIR}/render_output.{output_extension}"),
        }
    }
}

/// Inputs of [`startup_script`].
#[derive(Clone, Debug)]
pub struct ScriptParams<'a> {
    /// Name of the VM, used for self-deletion.
    pub instance_name: &'a str,
    /// Zone of the VM, used for self-deletion.
    pub zone: &'a str,
    /// Renderer container image.
    pub container_image: &'a str,
    /// Hard wall-clock limit of the container.
    pub max_run_secs: u64,
    /// Renderer invocation, resolved against [`VmPaths`].
    pub contract: &'a ExecutionContract,
    /// VM-local paths.
    pub paths: &'a VmPaths,
    /// Asset object URI.
    pub asset_uri: &'a str,
    /// Composition object URI.
    pub composition_uri: &'a str,
    /// Output object URI.
    pub output_uri: &'a str,
    /// Success marker URI.
    pub success_marker_uri: &'a str,
    /// Failure marker URI.
    pub failure_marker_uri: &'a str,
    /// Opaque webhook exported to the container.
    pub webhook_url: Option<&'a str>,
}

/// Generate the VM boot script.
///
/// Order of effects: download inputs, render under `timeout`, check the output is non-empty,
/// upload the output, then the success marker. An `EXIT` trap uploads the log as the failure
/// marker (or an empty marker if that upload fails) when any step fails, and always deletes
/// the VM last. Every `gcloud` call runs inside [`CLOUD_SDK_IMAGE`] with the data directory
/// mounted and host networking for metadata-server credentials.
pub fn startup_script(p: &ScriptParams<'_>) -> String {
    let q = |s: &str| shell_quote(s);
    let mut lines: Vec<String> = vec![
        "#!/bin/bash".into(),
        "set -euo pipefail".into(),
        String::new(),
        format!("VM_DATA_DIR={}", q(VM_DATA_DIR)),
        format!("VM_LOG_FILE={}", q(VM_LOG_FILE)),
        format!("INSTANCE_NAME={}", q(p.instance_name)),
        format!("ZONE={}", q(p.zone)),
        format!("FAILURE_MARKER={}", q(p.failure_marker_uri)),
        format!("CLOUD_SDK_IMAGE={}", q(CLOUD_SDK_IMAGE)),
    ];
    if let Some(url) = p.webhook_url {
        lines.push(format!("export RENDER_WEBHOOK_URL={}", q(url)));
    }

    lines.extend(
        [
            "",
            "gcloud() {",
            "    docker run --rm --network host -v \"$VM_DATA_DIR\":\"$VM_DATA_DIR\" \\",
            "        \"$CLOUD_SDK_IMAGE\" gcloud \"$@\"",
            "}",
            "",
            "cleanup() {",
            "    EXIT_CODE=$?",
            "    set +e",
            "    if [ \"$EXIT_CODE\" -ne 0 ]; then",
            "        echo \"Render failed with exit code $EXIT_CODE, uploading failure marker.\"",
            "        gcloud storage cp \"$VM_LOG_FILE\" \"$FAILURE_MARKER\" \\",
            "            || gcloud storage cp /dev/null \"$FAILURE_MARKER\" \\",
            "            || echo \"Failed to upload failure marker.\"",
            "    fi",
            "    echo \"VM self-destructing...\"",
            "    gcloud compute instances delete \"$INSTANCE_NAME\" --zone=\"$ZONE\" --quiet",
            "}",
            "trap cleanup EXIT",
            "",
            "mkdir -p \"$VM_DATA_DIR\"",
            "touch \"$VM_LOG_FILE\"",
            "exec > >(tee -a \"$VM_LOG_FILE\") 2>&1",
            "",
            "echo \"Downloading inputs...\"",
        ]
        .map(str::to_owned),
    );

    lines.push(format!(
        "gcloud storage cp {} {}",
        q(p.asset_uri),
        q(&p.paths.asset)
    ));
    lines.push(format!(
        "gcloud storage cp {} {}",
        q(p.composition_uri),
        q(&p.paths.config)
    ));

    lines.push(String::new());
    lines.push("echo \"Running renderer container...\"".into());
    let webhook_env = if p.webhook_url.is_some() {
        " -e RENDER_WEBHOOK_URL"
    } else {
        ""
    };
    lines.push(format!(
        "timeout {}s docker run --rm -v \"$VM_DATA_DIR\":\"$VM_DATA_DIR\"{webhook_env} {} {}",
        p.max_run_secs,
        q(p.container_image),
        p.contract.shell_line()
    ));

    lines.push(String::new());
    lines.push(format!("test -s {}", q(&p.paths.output)));
    lines.push("echo \"Uploading output...\"".into());
    lines.push(format!(
        "gcloud storage cp {} {}",
        q(&p.paths.output),
        q(p.output_uri)
    ));
    lines.push(format!(
        "gcloud storage cp /dev/null {}",
        q(p.success_marker_uri)
    ));
    lines.push("echo \"Render successful.\"".into());

    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
#[path = "../../tests/unit/cloud/script.rs"]
mod tests;
