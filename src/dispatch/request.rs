use std::path::{Path, PathBuf};

use crate::composition::spec::CompositionSpec;
use crate::foundation::core::ExecutionEnvironment;
use crate::status::RenderJob;

/// One render to perform.
///
/// The environment is fixed when the request is built and never re-evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderRequest {
    /// Local 3D asset. Must exist and be non-empty when the request is dispatched.
    pub asset_path: PathBuf,
    /// Composition handed to the renderer.
    pub composition: CompositionSpec,
    /// Where the render runs.
    pub environment: ExecutionEnvironment,
    /// Scene file used instead of the configured base scene (local renders only).
    pub base_scene_override: Option<PathBuf>,
}

impl RenderRequest {
    /// Request without a scene override.
    pub fn new(
        asset_path: impl Into<PathBuf>,
        composition: CompositionSpec,
        environment: ExecutionEnvironment,
    ) -> Self {
        Self {
            asset_path: asset_path.into(),
            composition,
            environment,
            base_scene_override: None,
        }
    }

    /// Use `scene` instead of the configured base scene.
    pub fn with_base_scene(mut self, scene: impl Into<PathBuf>) -> Self {
        self.base_scene_override = Some(scene.into());
        self
    }
}

/// Result of a successful dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Finished local render: an existing, non-empty output file.
    Local(PathBuf),
    /// Accepted cloud job; poll it with [`crate::JobStatusTracker`].
    Cloud(RenderJob),
}

impl RenderOutcome {
    /// Output file of a local render.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Local(path) => Some(path),
            Self::Cloud(_) => None,
        }
    }

    /// Handle of a cloud render.
    pub fn cloud_job(&self) -> Option<&RenderJob> {
        match self {
            Self::Local(_) => None,
            Self::Cloud(job) => Some(job),
        }
    }
}
