//! Core math for planar-reflection.
//!
//! This crate provides the GPU-free building blocks of a mirror-plane
//! reflection renderer:
//! - [`Plane`] for the reflecting surface
//! - [`mirror`] / [`mirror_camera`] for the reflected camera pose
//! - [`try_oblique_projection`] for moving the near clipping plane onto the surface
//! - [`Throttle`] for rendering a pass on a fraction of frames
//! - [`ReflectionOptions`] for configuration

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Accessors return values that are fine to ignore
#![allow(clippy::must_use_candidate)]
// Options structs legitimately have many boolean flags
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::module_name_repetitions)]

pub mod camera;
pub mod error;
pub mod mirror;
pub mod oblique;
pub mod options;
pub mod plane;
pub mod throttle;

pub use camera::{look_rotation, CameraState, CameraTransform, LayerMask, ViewFlags};
pub use error::{ReflectionError, Result};
pub use mirror::{mirror, mirror_camera, mirror_or_keep};
pub use oblique::{
    clip_z_row, oblique_projection, try_oblique_projection, DepthConvention, ObliqueProjection,
    DEGENERATE_EPSILON,
};
pub use options::{FlectionSchedule, ReflectionOptions, TargetFormat};
pub use plane::Plane;
pub use throttle::{Throttle, MIN_RESOLUTION_SCALE, RESOLUTION_SCALE_EPSILON};

// Re-export glam types for convenience
pub use glam::{Mat4, Quat, UVec2, Vec3, Vec4};
