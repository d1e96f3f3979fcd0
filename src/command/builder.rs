use crate::command::contract::ExecutionContract;
use crate::foundation::error::{RenderError, RenderResult};
use crate::settings::RendererConfig;

/// Maps paths to a renderer [`ExecutionContract`]. Pure: no IO, no ambient state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandBuilder {
    renderer: RendererConfig,
}

impl CommandBuilder {
    /// Create a builder over the given renderer wiring.
    pub fn new(renderer: RendererConfig) -> Self {
        Self { renderer }
    }

    /// Fail with [`RenderError::InvalidConfiguration`] unless the renderer binary and script
    /// are configured.
    pub fn check(&self) -> RenderResult<()> {
        required(self.renderer.app.as_deref(), "BLENDER_APP")?;
        required(self.renderer.script_file.as_deref(), "BLENDER_SCRIPT_FILE")?;
        Ok(())
    }

    /// Resolve the invocation for one render.
    ///
    /// `scene_override` replaces the configured base scene. Flags whose value is empty are
    /// omitted, as is the scene word when no scene is known.
    pub fn build(
        &self,
        asset_path: &str,
        config_path: &str,
        output_path: &str,
        scene_override: Option<&str>,
    ) -> RenderResult<ExecutionContract> {
        let program = required(self.renderer.app.as_deref(), "BLENDER_APP")?;
        let script = required(self.renderer.script_file.as_deref(), "BLENDER_SCRIPT_FILE")?;

        let scene = scene_override
            .filter(|s| !s.trim().is_empty())
            .or(self.renderer.base_scene.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_owned);

        let script_args = [
            ("json_file_path", config_path),
            ("glb_file_path", asset_path),
            ("out_file_path", output_path),
            ("function", self.renderer.function_name.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(flag, value)| format!("--{flag}={value}"))
        .collect();

        Ok(ExecutionContract {
            program,
            scene,
            script,
            script_args,
        })
    }
}

fn required(value: Option<&str>, key: &str) -> RenderResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_owned)
        .ok_or_else(|| RenderError::invalid_configuration(format!("{key} is not set")))
}
