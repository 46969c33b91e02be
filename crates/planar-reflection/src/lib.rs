//! planar-reflection: mirror-plane reflections for real-time renderers.
//!
//! A reflecting surface such as water or a mirror is rendered by drawing the
//! scene a second time from a camera mirrored across the surface plane. The
//! mirrored camera's near plane is moved onto the surface with an oblique
//! projection, so geometry on the wrong side never leaks into the
//! reflection.
//!
//! # Quick Start
//!
//! ```no_run
//! use planar_reflection::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!
//!     let mut host = HeadlessHost::new();
//!     host.add_camera(CameraState::default());
//!     let material = host.create_material();
//!
//!     let mut water = ReflectionRenderer::new(ReflectionOptions::default())?
//!         .with_material(material);
//!     water.set_surface(Vec3::new(0.0, -1.0, 0.0), Vec3::Y);
//!     water.enable(&mut host)?;
//!
//!     for _ in 0..3 {
//!         water.update(&mut host);
//!         host.render_frame(&mut water, 1.0 / 60.0);
//!     }
//!
//!     water.disable(&mut host);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `reflection-core` holds the math: [`Plane`], [`mirror`],
//!   [`try_oblique_projection`], [`Throttle`] and [`ReflectionOptions`].
//! - `reflection-render` holds the pass plumbing: the [`RenderHost`] seam,
//!   the [`ReflectionRenderer`] controller, and the [`HeadlessHost`].

use std::path::Path;

use thiserror::Error;

pub use reflection_core::{
    clip_z_row, look_rotation, mirror, mirror_camera, mirror_or_keep, oblique_projection,
    try_oblique_projection, CameraState, CameraTransform, DepthConvention, FlectionSchedule,
    LayerMask, ObliqueProjection, Plane, ReflectionError, ReflectionOptions, TargetFormat,
    Throttle, ViewFlags, DEGENERATE_EPSILON, MIN_RESOLUTION_SCALE, RESOLUTION_SCALE_EPSILON,
};
pub use reflection_core::{Mat4, Quat, UVec2, Vec3, Vec4};
pub use reflection_render::{
    scaled_extent, texture_format, CameraHandle, CpuTargets, FailurePlan, FrameInfo, GpuTarget,
    GpuTargets, HeadlessHost, HookId, MaterialHandle, PassKind, PassStats, PreRenderHandler,
    ReflectionRenderer, ReflectionState, RenderError, RenderHost, RenderTarget,
    RenderTaskDescriptor, RenderViewState, Submission, TargetAllocator, TargetDescriptor,
    TargetHandle, TaskHandle, TaskRecord, ViewUniforms, FALLBACK_RESOLUTION, FLECTION_ORDER,
    REFLECTION_ORDER,
};

/// Errors surfaced by the facade.
#[derive(Error, Debug)]
pub enum Error {
    /// Math or configuration error.
    #[error(transparent)]
    Reflection(#[from] ReflectionError),

    /// Host or resource error.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// A specialized Result type for planar-reflection operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Installs `env_logger` as the `log` backend.
///
/// Honors `RUST_LOG`. Does nothing when a logger is already installed.
pub fn init_logging() {
    if env_logger::try_init().is_ok() {
        log::info!("planar-reflection logging initialized");
    }
}

/// Loads [`ReflectionOptions`] from a JSON file.
pub fn load_options(path: impl AsRef<Path>) -> Result<ReflectionOptions> {
    Ok(ReflectionOptions::load(path)?)
}

/// Creates a disabled renderer from a JSON options file.
pub fn renderer_from_file(path: impl AsRef<Path>) -> Result<ReflectionRenderer> {
    Ok(ReflectionRenderer::new(load_options(path)?)?)
}
