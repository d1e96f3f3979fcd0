use super::*;

fn contract(paths: &VmPaths) -> ExecutionContract {
    ExecutionContract {
        program: "blender".into(),
        scene: Some("/app/base.blend".into()),
        script: "/app/process.py".into(),
        script_args: vec![
            format!("--json_file_path={}", paths.config),
            format!("--glb_file_path={}", paths.asset),
            format!("--out_file_path={}", paths.output),
            "--function=process".into(),
        ],
    }
}

fn render(webhook: Option<&str>) -> String {
    let paths = VmPaths::new("glb", "mov");
    let contract = contract(&paths);
    startup_script(&ScriptParams {
        instance_name: "render-job-abc12345",
        zone: "europe-west1-b",
        container_image: "gcr.io/proj/blender:4.2",
        max_run_secs: 1800,
        contract: &contract,
        paths: &paths,
        asset_uri: "gs://b/renders/ABCDEF123456/input.glb",
        composition_uri: "gs://b/renders/ABCDEF123456/input.json",
        output_uri: "gs://b/renders/ABCDEF123456/output.mov",
        success_marker_uri: "gs://b/renders/ABCDEF123456/_SUCCESS",
        failure_marker_uri: "gs://b/renders/ABCDEF123456/_FAILED",
        webhook_url: webhook,
    })
}

fn position(script: &str, needle: &str) -> usize {
    script
        .find(needle)
        .unwrap_or_else(|| panic!("missing `{needle}` in:\n{script}"))
}

#[test]
fn steps_run_in_protocol_order() {
    let s = render(None);
    let trap = position(&s, "trap cleanup EXIT");
    let mkdir = position(&s, "mkdir -p \"$VM_DATA_DIR\"");
    let download = position(&s, "gcloud storage cp gs://b/renders/ABCDEF123456/input.glb /var/lib/render/scene.glb");
    let config = position(&s, "gcloud storage cp gs://b/renders/ABCDEF123456/input.json /var/lib/render/config.json");
    let render = position(&s, "timeout 1800s docker run --rm");
    let check = position(&s, "test -s /var/lib/render/render_output.mov");
    let output = position(&s, "gcloud storage cp /var/lib/render/render_output.mov gs://b/renders/ABCDEF123456/output.mov");
    let success = position(&s, "gcloud storage cp /dev/null gs://b/renders/ABCDEF123456/_SUCCESS");

    assert!(trap < mkdir && mkdir < download);
    assert!(download < config && config < render);
    assert!(render < check && check < output);
    assert!(output < success);
}

#[test]
fn cleanup_uploads_failure_marker_then_self_deletes() {
    let s = render(None);
    assert!(s.starts_with("#!/bin/bash\nset -euo pipefail\n"));
    assert!(s.contains("FAILURE_MARKER=gs://b/renders/ABCDEF123456/_FAILED"));
    let marker = position(&s, "gcloud storage cp \"$VM_LOG_FILE\" \"$FAILURE_MARKER\"");
    let fallback = position(&s, "gcloud storage cp /dev/null \"$FAILURE_MARKER\"");
    let delete = position(
        &s,
        "gcloud compute instances delete \"$INSTANCE_NAME\" --zone=\"$ZONE\" --quiet",
    );
    assert!(marker < fallback && fallback < delete);
    assert!(s.contains("INSTANCE_NAME=render-job-abc12345"));
    assert!(s.contains("ZONE=europe-west1-b"));
}

#[test]
fn container_runs_the_same_contract_as_local() {
    let s = render(None);
    assert!(s.contains(
        "gcr.io/proj/blender:4.2 blender /app/base.blend --background --python /app/process.py -- \
         --json_file_path=/var/lib/render/config.json --glb_file_path=/var/lib/render/scene.glb \
         --out_file_path=/var/lib/render/render_output.mov --function=process"
    ));
}

#[test]
fn webhook_is_passed_through_only_when_set() {
    assert!(!render(None).contains("RENDER_WEBHOOK_URL"));
    let s = render(Some("https://hooks.example.com/done?job=1&x=2"));
    assert!(s.contains("export RENDER_WEBHOOK_URL='https://hooks.example.com/done?job=1&x=2'"));
    assert!(s.contains("-e RENDER_WEBHOOK_URL"));
}

#[test]
fn script_is_deterministic() {
    assert_eq!(render(None), render(None));
}

#[test]
fn gcloud_runs_from_the_cloud_sdk_container() {
    let s = render(None);
    assert!(s.contains("CLOUD_SDK_IMAGE=google/cloud-sdk:slim"));
    let wrapper = position(&s, "gcloud() {");
    let trap = position(&s, "trap cleanup EXIT");
    assert!(wrapper < trap);
    assert!(s.contains(
        "docker run --rm --network host -v \"$VM_DATA_DIR\":\"$VM_DATA_DIR\" \\\n        \"$CLOUD_SDK_IMAGE\" gcloud \"$@\""
    ));
    assert!(s.contains("VM_DATA_DIR=/var/lib/render\n"));
    assert!(VmPaths::new("glb", "mov").asset.starts_with(VM_DATA_DIR));
}
