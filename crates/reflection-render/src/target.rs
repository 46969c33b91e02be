//! Offscreen color target descriptions.

use glam::UVec2;
use reflection_core::TargetFormat;

use crate::host::TargetHandle;

/// Target size used when neither a base resolution nor a viewport is known.
pub const FALLBACK_RESOLUTION: UVec2 = UVec2::splat(512);

/// Default usage of reflection targets: rendered into, then sampled by the
/// surface material.
pub const TARGET_USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
    .union(wgpu::TextureUsages::TEXTURE_BINDING);

/// Returns `round(base * scale)` per axis, never smaller than one pixel.
pub fn scaled_extent(base: UVec2, scale: f32) -> UVec2 {
    (base.as_vec2() * scale).round().as_uvec2().max(UVec2::ONE)
}

/// Maps a configured format to its wgpu counterpart.
pub fn texture_format(format: TargetFormat) -> wgpu::TextureFormat {
    match format {
        TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TargetFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TargetFormat::Bgra8Unorm => wgpu::TextureFormat::Bgra8Unorm,
        TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
    }
}

/// Description of an offscreen color target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDescriptor {
    /// Debug label.
    pub label: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format.
    pub format: wgpu::TextureFormat,
    /// Texture usages.
    pub usage: wgpu::TextureUsages,
}

impl TargetDescriptor {
    /// Creates a renderable, sampleable target description.
    pub fn new(label: impl Into<String>, size: UVec2, format: wgpu::TextureFormat) -> Self {
        Self {
            label: label.into(),
            width: size.x.max(1),
            height: size.y.max(1),
            format,
            usage: TARGET_USAGE,
        }
    }

    /// Returns the size in pixels.
    pub fn size(&self) -> UVec2 {
        UVec2::new(self.width, self.height)
    }

    /// Returns a copy with a different size and the same format and usage.
    #[must_use]
    pub fn with_size(&self, size: UVec2) -> Self {
        Self {
            width: size.x.max(1),
            height: size.y.max(1),
            ..self.clone()
        }
    }

    /// Returns a copy with a different label.
    #[must_use]
    pub fn with_label(&self, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..self.clone()
        }
    }

    /// Returns the wgpu extent of a single-layer texture.
    pub fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

/// A live target owned by a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTarget {
    /// Host handle.
    pub handle: TargetHandle,
    /// Current description.
    pub descriptor: TargetDescriptor,
}
