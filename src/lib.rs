//! Render job dispatch for declarative shot compositions.
//!
//! A [`RenderDispatcher`] validates a [`RenderRequest`], then either runs the renderer as a
//! local child process or uploads the inputs and launches a self-deleting cloud VM. Cloud jobs
//! are observed through marker objects with a [`JobStatusTracker`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cloud;
pub mod command;
pub mod composition;
pub mod dispatch;
mod foundation;
pub mod local;
pub mod settings;
pub mod status;
pub mod store;

pub use cloud::gce::GceLauncher;
pub use cloud::{JobLauncher, LaunchReceipt, LaunchRequest};
pub use command::builder::CommandBuilder;
pub use command::contract::ExecutionContract;
pub use composition::color::normalize_hex_color;
pub use composition::shot::ShotParams;
pub use composition::spec::CompositionSpec;
pub use dispatch::{CloudBackend, RenderDispatcher, RenderOutcome, RenderRequest};
pub use foundation::core::{ExecutionEnvironment, JobId, JobStatus};
pub use foundation::error::{FailureClass, ProcessFailure, RenderError, RenderResult};
pub use local::executor::{CancelHandle, ContractRunner, LocalExecutor, OutputLines, RenderLines};
pub use settings::{CloudConfig, RenderConfig, RendererConfig};
pub use status::{JobStatusTracker, RenderJob};
pub use store::ArtifactStore;
pub use store::fs::FsStore;
pub use store::gcs::GcsStore;
pub use store::layout::JobLayout;
pub use store::memory::InMemoryStore;
