//! # Scheduler Configuration
//!
//! Every tunable of the per-frame pipeline lives in [`SchedulerConfig`]:
//! depth partitioning, seam handling, shadow cascades and translucency.
//!
//! ## Design Goals
//!
//! - **Serializable**: Loaded from TOML or RON through the [`Config`] trait
//! - **Validated**: Out-of-range values are rejected, never clamped
//! - **Defaulted**: Every field has a sensible default, so partial files work

use serde::{Serialize, Deserialize};

pub use crate::config::{Config, ConfigError};

/// Maximum number of cascades a directional shadow map may use
pub const MAX_SHADOW_CASCADES: u32 = 4;

/// Depth buffer encoding, which selects the far/near ratio in effect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthMode {
    /// Conventional hyperbolic depth; precision falls off quickly with distance
    #[default]
    Linear,
    /// Logarithmic depth; tolerates a far larger far/near ratio per frustum
    Logarithmic,
}

/// Projection mode of the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SceneMode {
    /// Full 3D globe view
    #[default]
    #[serde(rename = "scene3d")]
    Scene3D,
    /// Top-down orthographic map; frustums are split at a fixed distance
    #[serde(rename = "scene2d")]
    Scene2D,
}

/// # Scheduler Configuration
///
/// Configuration for the frame scheduler. Defaults match a globe renderer
/// with a linear depth buffer and four shadow cascades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum far/near ratio of one sub-frustum with a linear depth buffer
    pub far_to_near_ratio: f64,
    /// Maximum far/near ratio of one sub-frustum with a logarithmic depth buffer
    pub log_far_to_near_ratio: f64,
    /// Depth buffer encoding
    pub depth_mode: DepthMode,
    /// Scene projection mode
    pub scene_mode: SceneMode,
    /// Depth covered by one sub-frustum in 2D mode
    pub near_to_far_distance_2d: f64,
    /// Factor applied to the opaque near plane of every sub-frustum but the first
    pub opaque_frustum_near_offset: f64,
    /// Number of cascades used by directional shadow maps
    pub shadow_cascade_count: u32,
    /// Shadows are not cast beyond this distance from the camera
    pub shadow_maximum_distance: f64,
    /// Blend between logarithmic (1.0) and uniform (0.0) cascade splits
    pub cascade_split_lambda: f64,
    /// How far cascades extend toward the light to catch off-screen casters
    pub shadow_caster_extension: f64,
    /// Order-independent transparency; skips the back-to-front sort when rendering
    pub oit_enabled: bool,
    /// Shrink near/far to the visible content before partitioning
    pub fit_depth_range_to_content: bool,
}

impl SchedulerConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            far_to_near_ratio: 1000.0,
            log_far_to_near_ratio: 1.0e9,
            depth_mode: DepthMode::Linear,
            scene_mode: SceneMode::Scene3D,
            near_to_far_distance_2d: 1.75e6,
            opaque_frustum_near_offset: 0.9999,
            shadow_cascade_count: MAX_SHADOW_CASCADES,
            shadow_maximum_distance: 5000.0,
            cascade_split_lambda: 0.9,
            shadow_caster_extension: 10_000.0,
            oit_enabled: false,
            fit_depth_range_to_content: true,
        }
    }

    /// Set the depth mode
    pub fn with_depth_mode(mut self, mode: DepthMode) -> Self {
        self.depth_mode = mode;
        self
    }

    /// Set the scene mode
    pub fn with_scene_mode(mut self, mode: SceneMode) -> Self {
        self.scene_mode = mode;
        self
    }

    /// Set the linear-depth far/near ratio
    pub fn with_far_to_near_ratio(mut self, ratio: f64) -> Self {
        self.far_to_near_ratio = ratio;
        self
    }

    /// Set the shadow cascade count
    pub fn with_shadow_cascade_count(mut self, count: u32) -> Self {
        self.shadow_cascade_count = count;
        self
    }

    /// Enable or disable order-independent transparency
    pub fn with_oit(mut self, enabled: bool) -> Self {
        self.oit_enabled = enabled;
        self
    }

    /// Enable or disable depth range fitting
    pub fn with_depth_range_fitting(mut self, enabled: bool) -> Self {
        self.fit_depth_range_to_content = enabled;
        self
    }

    /// Far/near ratio for the active depth mode
    pub fn effective_far_to_near_ratio(&self) -> f64 {
        match self.depth_mode {
            DepthMode::Linear => self.far_to_near_ratio,
            DepthMode::Logarithmic => self.log_far_to_near_ratio,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_ratio("far_to_near_ratio", self.far_to_near_ratio)?;
        require_ratio("log_far_to_near_ratio", self.log_far_to_near_ratio)?;

        if !(self.near_to_far_distance_2d.is_finite() && self.near_to_far_distance_2d > 0.0) {
            return Err(invalid("near_to_far_distance_2d", "must be a positive finite distance", self.near_to_far_distance_2d));
        }

        if !(self.opaque_frustum_near_offset > 0.0 && self.opaque_frustum_near_offset <= 1.0) {
            return Err(invalid("opaque_frustum_near_offset", "must lie in (0, 1]", self.opaque_frustum_near_offset));
        }

        if self.shadow_cascade_count == 0 || self.shadow_cascade_count > MAX_SHADOW_CASCADES {
            return Err(ConfigError::InvalidValue {
                field: "shadow_cascade_count",
                reason: format!("must be between 1 and {MAX_SHADOW_CASCADES}, got {}", self.shadow_cascade_count),
            });
        }

        if !(self.shadow_maximum_distance.is_finite() && self.shadow_maximum_distance > 0.0) {
            return Err(invalid("shadow_maximum_distance", "must be a positive finite distance", self.shadow_maximum_distance));
        }

        if !(0.0..=1.0).contains(&self.cascade_split_lambda) {
            return Err(invalid("cascade_split_lambda", "must lie in [0, 1]", self.cascade_split_lambda));
        }

        if !(self.shadow_caster_extension.is_finite() && self.shadow_caster_extension >= 0.0) {
            return Err(invalid("shadow_caster_extension", "must be a non-negative finite distance", self.shadow_caster_extension));
        }

        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl Config for SchedulerConfig {}

fn require_ratio(field: &'static str, ratio: f64) -> Result<(), ConfigError> {
    // A ratio of 1 would never advance the partition
    if ratio.is_finite() && ratio > 1.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a finite ratio greater than 1", ratio))
    }
}

fn invalid(field: &'static str, requirement: &str, value: f64) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: format!("{requirement}, got {value}"),
    }
}
