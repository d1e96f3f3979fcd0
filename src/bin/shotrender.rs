use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use shotrender::store::layout::JobLayout;
use shotrender::{
    ArtifactStore as _, CompositionSpec, ExecutionEnvironment, JobId, JobStatus, JobStatusTracker,
    LaunchRequest, RenderDispatcher, RenderJob, RenderOutcome, settings,
};

#[derive(Parser, Debug)]
#[command(name = "shotrender", version)]
struct Cli {
    /// Config file layered under the process environment.
    #[arg(long, global = true, env = "RENDER_CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an asset locally or launch a cloud render.
    Render(RenderArgs),
    /// Print the status of a cloud render.
    Status(StatusArgs),
    /// Print the startup script a cloud render VM would run.
    Script(ScriptArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// 3D asset to render.
    #[arg(long)]
    asset: PathBuf,

    /// Composition as inline JSON or a path to a JSON file.
    #[arg(long)]
    composition: String,

    /// Execution environment (`local`, `cloud` or `gcp`); detected when omitted.
    #[arg(long)]
    env: Option<ExecutionEnvironment>,

    /// Scene file used instead of the configured base scene.
    #[arg(long)]
    base_scene: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct StatusArgs {
    /// Job id printed by `render`.
    #[arg(long)]
    job_id: String,

    /// Keep polling until the job finishes or the timeout elapses.
    #[arg(long)]
    wait: bool,

    /// Seconds between polls with `--wait`.
    #[arg(long, default_value_t = 15)]
    interval_secs: u64,

    /// Give up waiting after this many seconds.
    #[arg(long, default_value_t = 3600)]
    timeout_secs: u64,
}

#[derive(Parser, Debug)]
struct ScriptArgs {
    /// Job id whose objects the script would use.
    #[arg(long)]
    job_id: String,

    /// Extension of the uploaded asset.
    #[arg(long, default_value = "glb")]
    asset_ext: String,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let config = settings::load(cli.config.as_deref()).context("load configuration")?;
    match cli.cmd {
        Command::Render(args) => cmd_render(config, args),
        Command::Status(args) => cmd_status(config, args),
        Command::Script(args) => cmd_script(config, args),
    }
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}

fn read_composition(arg: &str) -> anyhow::Result<CompositionSpec> {
    let composition = if arg.trim_start().starts_with('{') {
        CompositionSpec::from_json_str(arg)?
    } else {
        CompositionSpec::from_path(arg.as_ref())?
    };
    Ok(composition)
}

fn cmd_render(mut config: settings::RenderConfig, args: RenderArgs) -> anyhow::Result<ExitCode> {
    if args.env.is_some() {
        config.environment = args.env;
    }
    let composition = read_composition(&args.composition)?;
    let dispatcher = RenderDispatcher::from_config(config)?;

    let mut request = dispatcher.request(args.asset, composition);
    if let Some(scene) = args.base_scene {
        request = request.with_base_scene(scene);
    }

    match dispatcher.render(&request)? {
        RenderOutcome::Local(path) => println!("{}", path.display()),
        RenderOutcome::Cloud(job) => {
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_status(config: settings::RenderConfig, args: StatusArgs) -> anyhow::Result<ExitCode> {
    let job = RenderJob::for_id(JobId::parse(&args.job_id)?, &config.output_extension);
    let backend = shotrender::CloudBackend::from_config(&config)?;
    let tracker = JobStatusTracker::new(backend.store);

    let status = if args.wait {
        tracker.poll_until(
            &job,
            Duration::from_secs(args.interval_secs.max(1)),
            Duration::from_secs(args.timeout_secs),
        )?
    } else {
        tracker.poll(&job)?
    };

    println!("{status}");
    Ok(match status {
        JobStatus::Failed => ExitCode::FAILURE,
        JobStatus::Pending | JobStatus::Succeeded => ExitCode::SUCCESS,
    })
}

fn cmd_script(config: settings::RenderConfig, args: ScriptArgs) -> anyhow::Result<ExitCode> {
    let job_id = JobId::parse(&args.job_id)?;
    let (store, launcher) = shotrender::cloud::connect(&config)?;
    let layout = JobLayout::new(&job_id, &args.asset_ext, &config.output_extension);

    let request = LaunchRequest {
        job_id,
        asset_uri: store.uri(&layout.input_asset()),
        asset_extension: layout.asset_extension().to_owned(),
        composition_uri: store.uri(&layout.input_config()),
        output_uri: store.uri(&layout.output()),
        output_extension: layout.output_extension().to_owned(),
        success_marker_uri: store.uri(&layout.success_marker()),
        failure_marker_uri: store.uri(&layout.failure_marker()),
        webhook_url: config.cloud.webhook_url.clone(),
    };
    let instance = shotrender::cloud::instance_name(&mut rand::rng());
    print!("{}", launcher.render_script(&request, &instance)?);
    Ok(ExitCode::SUCCESS)
}
