use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::cloud::{JobLauncher, LaunchRequest};
use crate::command::builder::CommandBuilder;
use crate::command::contract::ExecutionContract;
use crate::composition::spec::CompositionSpec;
use crate::dispatch::request::{RenderOutcome, RenderRequest};
use crate::dispatch::temp::TempFile;
use crate::foundation::core::{ExecutionEnvironment, JobId};
use crate::foundation::error::{RenderError, RenderResult};
use crate::local::executor::{ContractRunner, LocalExecutor};
use crate::settings::RenderConfig;
use crate::status::{JobStatusTracker, RenderJob};
use crate::store::ArtifactStore;
use crate::store::layout::JobLayout;

const COMPOSITION_CONTENT_TYPE: &str = "application/json";

/// Store and launcher used by the cloud path.
#[derive(Clone)]
pub struct CloudBackend {
    /// Where inputs are uploaded and markers are observed.
    pub store: Arc<dyn ArtifactStore>,
    /// Starts render VMs.
    pub launcher: Arc<dyn JobLauncher>,
}

impl CloudBackend {
    /// Pair a store with a launcher.
    pub fn new(store: Arc<dyn ArtifactStore>, launcher: Arc<dyn JobLauncher>) -> Self {
        Self { store, launcher }
    }

    /// Google Cloud Storage plus Compute Engine, from validated settings.
    pub fn from_config(config: &RenderConfig) -> RenderResult<Self> {
        let (store, launcher) = crate::cloud::connect(config)?;
        Ok(Self::new(Arc::new(store), Arc::new(launcher)))
    }
}

impl std::fmt::Debug for CloudBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudBackend").finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug)]
enum DispatchPhase {
    Validating,
    LocalRunning,
    LocalDone,
    LocalFailed,
    CloudDispatching,
    CloudAccepted,
}

/// Top-level entry point: validates a request, then renders locally or launches a cloud job.
///
/// Requests are self-contained under their own [`JobId`], so one dispatcher can serve
/// concurrent callers.
pub struct RenderDispatcher {
    config: RenderConfig,
    environment: ExecutionEnvironment,
    commands: CommandBuilder,
    runner: Arc<dyn ContractRunner>,
    cloud: Option<CloudBackend>,
}

impl std::fmt::Debug for RenderDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderDispatcher")
            .field("environment", &self.environment)
            .field("temp_dir", &self.config.temp_dir)
            .field("cloud", &self.cloud.is_some())
            .finish_non_exhaustive()
    }
}

impl RenderDispatcher {
    /// Dispatcher with the local executor and no cloud backend.
    ///
    /// The default environment is resolved from `config` here, once.
    pub fn local(config: RenderConfig) -> Self {
        let environment = config.resolve_environment();
        Self {
            commands: CommandBuilder::new(config.renderer.clone()),
            runner: Arc::new(LocalExecutor::new()),
            cloud: None,
            environment,
            config,
        }
    }

    /// Dispatcher wired for the resolved environment.
    ///
    /// The cloud backend is only built (and its settings only validated) when the
    /// environment resolves to the cloud.
    pub fn from_config(config: RenderConfig) -> RenderResult<Self> {
        let dispatcher = Self::local(config);
        if dispatcher.environment != ExecutionEnvironment::Cloud {
            return Ok(dispatcher);
        }
        let backend = CloudBackend::from_config(&dispatcher.config)?;
        Ok(dispatcher.with_cloud(backend))
    }

    /// Replace the contract runner.
    pub fn with_runner(mut self, runner: Arc<dyn ContractRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Attach a cloud backend.
    pub fn with_cloud(mut self, backend: CloudBackend) -> Self {
        self.cloud = Some(backend);
        self
    }

    /// Environment used by [`RenderDispatcher::request`].
    pub fn environment(&self) -> ExecutionEnvironment {
        self.environment
    }

    /// Settings this dispatcher was built from.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Tracker over the cloud store, when a backend is attached.
    pub fn tracker(&self) -> Option<JobStatusTracker> {
        self.cloud
            .as_ref()
            .map(|c| JobStatusTracker::new(c.store.clone()))
    }

    /// Request in this dispatcher's environment.
    pub fn request(
        &self,
        asset_path: impl Into<PathBuf>,
        composition: CompositionSpec,
    ) -> RenderRequest {
        RenderRequest::new(asset_path, composition, self.environment)
    }

    /// Validate and run `request`.
    ///
    /// Local renders block until the renderer exits and return the output path. Cloud renders
    /// return as soon as the launch is accepted.
    #[tracing::instrument(skip(self, request), fields(env = %request.environment, asset = %request.asset_path.display()))]
    pub fn render(&self, request: &RenderRequest) -> RenderResult<RenderOutcome> {
        tracing::debug!(phase = ?DispatchPhase::Validating);
        validate(request)?;

        match request.environment {
            ExecutionEnvironment::Local => self.render_local(request).map(RenderOutcome::Local),
            ExecutionEnvironment::Cloud => self.render_cloud(request).map(RenderOutcome::Cloud),
        }
    }

    fn render_local(&self, request: &RenderRequest) -> RenderResult<PathBuf> {
        let job_id = JobId::mint();
        let temp_dir = &self.config.temp_dir;
        let config_path = temp_dir.join(format!("in_{job_id}.json"));
        let output_path = temp_dir.join(format!("out_{job_id}.{}", self.config.output_extension));

        let scene = request.base_scene_override.as_deref().map(path_str);
        let contract = self.commands.build(
            &path_str(&request.asset_path),
            &path_str(&config_path),
            &path_str(&output_path),
            scene.as_deref(),
        )?;

        let composition = request.composition.to_json_bytes()?;
        std::fs::create_dir_all(temp_dir)
            .with_context(|| format!("create temp dir '{}'", temp_dir.display()))?;
        let _config = TempFile::write(config_path, &composition)?;
        let output = TempFile::guard(output_path);

        tracing::info!(%job_id, phase = ?DispatchPhase::LocalRunning, "rendering locally");
        match run_to_completion(self.runner.as_ref(), &contract, output.path()) {
            Ok(()) => {
                tracing::info!(
                    %job_id,
                    phase = ?DispatchPhase::LocalDone,
                    output = %output.path().display(),
                    "local render finished"
                );
                Ok(output.keep())
            }
            Err(e) => {
                tracing::error!(%job_id, phase = ?DispatchPhase::LocalFailed, error = %e, "local render failed");
                Err(e)
            }
        }
    }

    fn render_cloud(&self, request: &RenderRequest) -> RenderResult<RenderJob> {
        let cloud = self.cloud.as_ref().ok_or_else(|| {
            RenderError::invalid_configuration(
                "cloud rendering requested but no artifact store or launcher is configured",
            )
        })?;
        if request.base_scene_override.is_some() {
            return Err(RenderError::invalid_request(
                "base scene override is only supported for local renders",
            ));
        }
        self.commands.check()?;

        let job_id = JobId::mint();
        let layout =
            JobLayout::for_asset(&job_id, &request.asset_path, &self.config.output_extension);
        let composition = request.composition.to_json_bytes()?;

        tracing::info!(%job_id, phase = ?DispatchPhase::CloudDispatching, prefix = layout.prefix());
        let store = cloud.store.as_ref();
        let asset_uri = store.upload(&request.asset_path, &layout.input_asset())?;
        let composition_uri =
            store.upload_bytes(&composition, &layout.input_config(), COMPOSITION_CONTENT_TYPE)?;
        let output_uri = store.uri(&layout.output());

        let receipt = cloud.launcher.launch(&LaunchRequest {
            job_id: job_id.clone(),
            asset_uri,
            asset_extension: layout.asset_extension().to_owned(),
            composition_uri,
            output_uri: output_uri.clone(),
            output_extension: layout.output_extension().to_owned(),
            success_marker_uri: store.uri(&layout.success_marker()),
            failure_marker_uri: store.uri(&layout.failure_marker()),
            webhook_url: self.config.cloud.webhook_url.clone(),
        })?;

        tracing::info!(
            %job_id,
            phase = ?DispatchPhase::CloudAccepted,
            instance = %receipt.instance_name,
            "cloud render launched"
        );
        Ok(RenderJob::launched(job_id, &layout, output_uri))
    }
}

fn validate(request: &RenderRequest) -> RenderResult<()> {
    let asset = &request.asset_path;
    let meta = std::fs::metadata(asset).map_err(|e| {
        RenderError::invalid_request(format!("asset '{}' is not readable: {e}", asset.display()))
    })?;
    if !meta.is_file() {
        return Err(RenderError::invalid_request(format!(
            "asset '{}' is not a file",
            asset.display()
        )));
    }
    if meta.len() == 0 {
        return Err(RenderError::invalid_request(format!(
            "asset '{}' is empty",
            asset.display()
        )));
    }
    if request.composition.as_map().is_empty() {
        return Err(RenderError::invalid_request("composition is empty"));
    }
    if let Some(scene) = request.base_scene_override.as_deref()
        && !scene.is_file()
    {
        return Err(RenderError::invalid_request(format!(
            "base scene '{}' does not exist",
            scene.display()
        )));
    }
    Ok(())
}

fn run_to_completion(
    runner: &dyn ContractRunner,
    contract: &ExecutionContract,
    output: &Path,
) -> RenderResult<()> {
    let mut lines = 0usize;
    for line in runner.run(contract)? {
        line?;
        lines += 1;
    }
    tracing::debug!(lines, "renderer exited successfully");

    match std::fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        _ => Err(RenderError::OutputMissing(output.to_path_buf())),
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
