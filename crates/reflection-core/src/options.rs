//! Configuration options for the reflection passes.

use std::path::Path;

use glam::UVec2;
use serde::{Deserialize, Serialize};

use crate::camera::{LayerMask, ViewFlags};
use crate::error::{ReflectionError, Result};
use crate::oblique::DepthConvention;
use crate::throttle::MIN_RESOLUTION_SCALE;

/// Pixel format of the offscreen reflection targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TargetFormat {
    /// 8-bit RGBA, linear.
    #[default]
    Rgba8Unorm,
    /// 8-bit RGBA, sRGB encoded.
    Rgba8UnormSrgb,
    /// 8-bit BGRA, linear.
    Bgra8Unorm,
    /// 16-bit float RGBA.
    Rgba16Float,
}

/// How the flection pass is scheduled relative to the reflection pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum FlectionSchedule {
    /// Fires on the same frames as the reflection pass.
    #[default]
    Shared,
    /// Has its own throttle.
    Independent {
        /// Fraction of frames on which the flection pass renders.
        frequency: f32,
    },
}

/// Options for the reflection and flection passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflectionOptions {
    /// Fraction of frames on which the passes render, in `[0, 1]`.
    pub update_frequency: f32,

    /// Output resolution scale, in `(0, 1]`.
    pub resolution_scale: f32,

    /// Unscaled target size. Falls back to the host viewport, then 512x512.
    pub base_resolution: Option<UVec2>,

    /// Pushes the clip plane below the surface along its normal.
    pub clip_plane_offset: f32,

    /// Layers rendered by the mirrored camera.
    pub reflection_layers: LayerMask,

    /// Features rendered by the reflection pass.
    pub reflection_view_flags: ViewFlags,

    /// Features rendered by the flection pass.
    pub flection_view_flags: ViewFlags,

    /// Material parameter receiving the reflection texture.
    pub reflection_param_name: String,

    /// Material parameter receiving the flection texture.
    pub flection_param_name: String,

    /// Depth convention of the reflection pass projection.
    pub depth_convention: DepthConvention,

    /// Depth convention of the flection pass projection.
    pub flection_depth_convention: DepthConvention,

    /// Distance added to the plane for the flection pass.
    pub flection_offset: f32,

    /// Whether the flection pass runs at all.
    pub flection_enabled: bool,

    /// Scheduling of the flection pass.
    pub flection_schedule: FlectionSchedule,

    /// Pixel format of both targets.
    pub target_format: TargetFormat,

    /// Frames between diagnostic log lines (0 = never).
    pub diagnostics_interval: u64,
}

impl Default for ReflectionOptions {
    fn default() -> Self {
        Self {
            update_frequency: 1.0,
            resolution_scale: 1.0,
            base_resolution: None,
            clip_plane_offset: 0.0,
            reflection_layers: LayerMask::ALL,
            reflection_view_flags: ViewFlags::REFLECTION,
            flection_view_flags: ViewFlags::REFLECTION,
            reflection_param_name: "MainTex".to_string(),
            flection_param_name: "FlectionTex".to_string(),
            depth_convention: DepthConvention::ZeroToOne,
            flection_depth_convention: DepthConvention::ZeroToOne,
            flection_offset: 1.0,
            flection_enabled: true,
            flection_schedule: FlectionSchedule::Shared,
            target_format: TargetFormat::Rgba8Unorm,
            diagnostics_interval: 120,
        }
    }
}

impl ReflectionOptions {
    /// Checks that every value is in range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.update_frequency) {
            return Err(invalid(
                "update_frequency",
                format!("{} is outside [0, 1]", self.update_frequency),
            ));
        }
        if !(self.resolution_scale > 0.0 && self.resolution_scale <= 1.0) {
            return Err(invalid(
                "resolution_scale",
                format!("{} is outside (0, 1]", self.resolution_scale),
            ));
        }
        if let Some(size) = self.base_resolution {
            if size.x == 0 || size.y == 0 {
                return Err(invalid(
                    "base_resolution",
                    format!("{size} has a zero side"),
                ));
            }
        }
        if !self.clip_plane_offset.is_finite() {
            return Err(invalid("clip_plane_offset", "must be finite".to_string()));
        }
        if !self.flection_offset.is_finite() {
            return Err(invalid("flection_offset", "must be finite".to_string()));
        }
        if self.reflection_param_name.is_empty() {
            return Err(invalid(
                "reflection_param_name",
                "must not be empty".to_string(),
            ));
        }
        if self.flection_enabled && self.flection_param_name.is_empty() {
            return Err(invalid(
                "flection_param_name",
                "must not be empty".to_string(),
            ));
        }
        if let FlectionSchedule::Independent { frequency } = self.flection_schedule {
            if !(0.0..=1.0).contains(&frequency) {
                return Err(invalid(
                    "flection_schedule",
                    format!("frequency {frequency} is outside [0, 1]"),
                ));
            }
        }
        Ok(())
    }

    /// Returns the resolution scale the throttle will hold.
    pub fn clamped_resolution_scale(&self) -> f32 {
        self.resolution_scale.clamp(MIN_RESOLUTION_SCALE, 1.0)
    }

    /// Parses and validates options from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Serializes options to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads and validates options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let options = Self::from_json_str(&json)?;
        log::info!("loaded reflection options from {}", path.display());
        Ok(options)
    }

    /// Writes options to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json_string()?)?;
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ReflectionError {
    ReflectionError::InvalidOption { name, reason }
}
