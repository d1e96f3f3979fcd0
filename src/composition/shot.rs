use serde::Deserialize;
use serde_json::json;

use crate::composition::color::normalize_hex_color;
use crate::composition::spec::CompositionSpec;
use crate::foundation::error::{RenderError, RenderResult};

const NO_INTERPOLATION: &str = "None";
const NO_VFX: &str = "None";
const ROTATION_CLOCKWISE: &str = "CLOCKWISE";

/// Shot parameters as produced by the composition generator.
///
/// Field names on the wire follow the generator's output (`Movement`, `Movement_Speed`,
/// `VFX`, ...). Only `Movement` is mandatory.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ShotParams {
    /// Camera/product movement id.
    #[serde(rename = "Movement")]
    pub movement: String,
    /// Movement playback speed.
    #[serde(rename = "Movement_Speed", default = "default_movement_speed")]
    pub movement_speed: f64,
    /// Movement interpolation mode.
    #[serde(rename = "Movement_Interpolation", default = "no_interpolation")]
    pub movement_interpolation: String,
    /// Visual-effect overlay id.
    #[serde(rename = "VFX", default = "no_vfx")]
    pub vfx: String,
    /// Visual-effect playback speed.
    #[serde(rename = "VFX_Speed", default = "default_vfx_speed")]
    pub vfx_speed: f64,
    /// Visual-effect interpolation mode.
    #[serde(rename = "VFX_Interpolation", default = "no_interpolation")]
    pub vfx_interpolation: String,
}

fn default_movement_speed() -> f64 {
    1.2
}

fn default_vfx_speed() -> f64 {
    1.0
}

fn no_interpolation() -> String {
    NO_INTERPOLATION.to_owned()
}

fn no_vfx() -> String {
    NO_VFX.to_owned()
}

impl ShotParams {
    /// Parameters for a movement with every other field at its default.
    pub fn new(movement: impl Into<String>) -> Self {
        Self {
            movement: movement.into(),
            movement_speed: default_movement_speed(),
            movement_interpolation: no_interpolation(),
            vfx: no_vfx(),
            vfx_speed: default_vfx_speed(),
            vfx_interpolation: no_interpolation(),
        }
    }

    /// Parse generator output.
    pub fn from_json_str(s: &str) -> RenderResult<Self> {
        let params: Self = serde_json::from_str(s)
            .map_err(|e| RenderError::invalid_request(format!("invalid shot parameters: {e}")))?;
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> RenderResult<()> {
        if self.movement.trim().is_empty() {
            return Err(RenderError::invalid_request("shot movement is empty"));
        }
        for (name, speed) in [
            ("movement speed", self.movement_speed),
            ("vfx speed", self.vfx_speed),
        ] {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(RenderError::invalid_request(format!(
                    "{name} must be a positive finite number, got {speed}"
                )));
            }
        }
        Ok(())
    }

    /// Build the renderer's composition document with the given environment color.
    ///
    /// Key spellings (`ENVIRONEMENT`, `BACKGOUND_COLOR`) are what the renderer add-on reads.
    pub fn into_composition(self, environment_color: &str) -> RenderResult<CompositionSpec> {
        self.validate()?;
        let color = normalize_hex_color(environment_color)?;
        CompositionSpec::from_value(json!({
            "MOVEMENT": {
                "NAME": self.movement,
                "SPEED": self.movement_speed,
                "INTERPOLATION": self.movement_interpolation,
                "ROTATION_DIRECTION": ROTATION_CLOCKWISE,
            },
            "ENVIRONEMENT": { "BACKGOUND_COLOR": color },
            "VFX_SHOT": {
                "NAME": self.vfx,
                "SPEED": self.vfx_speed,
                "INTERPOLATION": self.vfx_interpolation,
            },
        }))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/composition/shot.rs"]
mod tests;
