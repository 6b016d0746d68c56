use serde::{Deserialize, Serialize};

use crate::drawing::{InteractionTolerances, VectorParameters};
use crate::error::{DrawingError, DrawingResult};
use crate::interaction::{HitTolerance, InputDevice};
use crate::render::plot::HANDLE_RADIUS;

/// Host-side configuration of the drawing layer.
///
/// Serializable so embedders can persist the tool-bar state alongside their
/// chart setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingConfig {
    #[serde(default)]
    pub input_device: InputDevice,
    #[serde(default)]
    pub hit_tolerance: HitTolerance,
    /// A second construction click closer than this to `p0` is accidental.
    #[serde(default = "default_click_tolerance_px")]
    pub click_tolerance_px: f64,
    #[serde(default = "default_handle_radius")]
    pub handle_radius: f64,
    /// Style applied to drawings created from now on.
    #[serde(default)]
    pub vector: VectorParameters,
}

fn default_click_tolerance_px() -> f64 {
    5.0
}

fn default_handle_radius() -> f64 {
    HANDLE_RADIUS
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            input_device: InputDevice::default(),
            hit_tolerance: HitTolerance::default(),
            click_tolerance_px: default_click_tolerance_px(),
            handle_radius: default_handle_radius(),
            vector: VectorParameters::default(),
        }
    }
}

impl DrawingConfig {
    #[must_use]
    pub fn with_input_device(mut self, device: InputDevice) -> Self {
        self.input_device = device;
        self
    }

    #[must_use]
    pub fn with_vector_parameters(mut self, vector: VectorParameters) -> Self {
        self.vector = vector;
        self
    }

    /// Hit box half size for the configured input device.
    #[must_use]
    pub fn hit_px(&self) -> f64 {
        self.hit_tolerance.for_device(self.input_device)
    }

    #[must_use]
    pub fn tolerances(&self) -> InteractionTolerances {
        InteractionTolerances {
            click_px: self.click_tolerance_px,
            hit_px: self.hit_px(),
            handle_radius: self.handle_radius,
        }
    }

    pub fn validate(&self) -> DrawingResult<()> {
        for (name, value) in [
            ("click_tolerance_px", self.click_tolerance_px),
            ("handle_radius", self.handle_radius),
            ("hit_tolerance.mouse_px", self.hit_tolerance.mouse_px),
            ("hit_tolerance.touch_px", self.hit_tolerance.touch_px),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(DrawingError::InvalidData(format!(
                    "`{name}` must be finite and non-negative"
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(input: &str) -> DrawingResult<Self> {
        let config: Self = serde_json::from_str(input)
            .map_err(|e| DrawingError::Codec(format!("failed to parse drawing config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> DrawingResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DrawingError::Codec(format!("failed to serialize drawing config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::DrawingConfig;
    use crate::interaction::InputDevice;

    #[test]
    fn empty_json_yields_defaults() {
        let config = DrawingConfig::from_json_str("{}").expect("parse");
        assert_eq!(config, DrawingConfig::default());
        assert_eq!(config.hit_px(), 5.0);
    }

    #[test]
    fn touch_widens_the_hit_box() {
        let config = DrawingConfig::from_json_str(r#"{"input_device":"touch"}"#).expect("parse");
        assert_eq!(config.input_device, InputDevice::Touch);
        assert_eq!(config.tolerances().hit_px, 25.0);
    }

    #[test]
    fn rejects_negative_tolerances() {
        assert!(DrawingConfig::from_json_str(r#"{"click_tolerance_px":-1}"#).is_err());
        assert!(DrawingConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn json_round_trip_keeps_vector_parameters() {
        let mut config = DrawingConfig::default();
        config.vector.line_width = 3.0;
        config.vector.current_color = "#ff0000".to_owned();
        let json = config.to_json_pretty().expect("json");
        assert_eq!(DrawingConfig::from_json_str(&json).expect("parse"), config);
    }
}
