//! Engine Settings
//!
//! Per-scene pipeline configuration ([`SceneSettings`]) and run-loop timing
//! ([`AppSettings`]), bundled as [`EngineSettings`] for loading from JSON.
//!
//! ```rust,ignore
//! use canopy::settings::EngineSettings;
//!
//! let settings = EngineSettings::from_json_str(r#"{ "scene": { "max_lights": 8 } }"#)?;
//! assert_eq!(settings.scene.cascade_count, 3);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::renderer::shadow_utils::MAX_CASCADES;

// ---------------------------------------------------------------------------
// SceneSettings
// ---------------------------------------------------------------------------

/// Configuration consumed by [`Scene`](crate::scene::Scene) during cull and draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneSettings {
    /// Maximum number of lights handed to each camera. Extra lights are dropped.
    pub max_lights: usize,
    /// Cascades per shadowed light. Clamped to [`MAX_CASCADES`].
    pub cascade_count: u32,
    /// Blend between uniform (`0.0`) and logarithmic (`1.0`) cascade splits.
    pub cascade_split_lambda: f64,
    /// Edge length in texels of each cascade's shadow texture.
    pub shadow_map_size: u32,
    /// Material used by the depth pre-pass.
    pub depth_prepass_material: String,
    /// Material used by shadow passes.
    pub shadow_material: String,
    /// Sort transparent buckets far-to-near relative to the camera.
    pub sort_transparent_back_to_front: bool,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            max_lights: 16,
            cascade_count: 3,
            cascade_split_lambda: 0.5,
            shadow_map_size: 2048,
            depth_prepass_material: "zpass".to_string(),
            shadow_material: "shadow".to_string(),
            sort_transparent_back_to_front: false,
        }
    }
}

impl SceneSettings {
    /// Cascade count after clamping to `1..=MAX_CASCADES`.
    #[inline]
    #[must_use]
    pub fn effective_cascade_count(&self) -> usize {
        self.cascade_count.clamp(1, MAX_CASCADES as u32) as usize
    }
}

// ---------------------------------------------------------------------------
// AppSettings
// ---------------------------------------------------------------------------

/// Frame timing policy for [`Application`](crate::app::Application).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Delta used for the first frame and whenever a frame exceeds `max_dt`.
    pub fallback_dt: f64,
    /// Deltas above this (breakpoints, suspends) are replaced by `fallback_dt`.
    pub max_dt: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            fallback_dt: 1.0 / 60.0,
            max_dt: 1.0 / 10.0,
        }
    }
}

impl AppSettings {
    /// Applies the safeguard for extreme deltas.
    #[inline]
    #[must_use]
    pub fn clamp_dt(&self, dt: f64) -> f64 {
        if dt > self.max_dt || dt < 0.0 {
            self.fallback_dt
        } else {
            dt
        }
    }
}

// ---------------------------------------------------------------------------
// EngineSettings
// ---------------------------------------------------------------------------

/// All engine configuration in one document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    pub scene: SceneSettings,
    pub app: AppSettings,
}

impl EngineSettings {
    /// Parses settings from a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded engine settings from {}", path.as_ref().display());
        Ok(settings)
    }
}
