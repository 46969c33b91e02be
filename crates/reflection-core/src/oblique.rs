//! Oblique near-plane clipping.
//!
//! Rewrites a symmetric perspective projection so that its near clipping
//! plane coincides with an arbitrary view-space plane. Only the row that
//! produces clip-space z is replaced; field of view, aspect ratio and the
//! `w` row are inherited from the input matrix.

use glam::{Mat4, Vec4};
use serde::{Deserialize, Serialize};

use crate::error::{ReflectionError, Result};

/// Below this magnitude the plane is treated as parallel to the corner ray.
///
/// Compared against the plane normalized to unit 4-vector length, so a plane
/// far from the camera (large `|d|`) trips the guard sooner than one close by.
pub const DEGENERATE_EPSILON: f32 = 1e-6;

/// Normalized device depth range of the target graphics backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DepthConvention {
    /// Near plane at `z = -1` (OpenGL).
    MinusOneToOne,
    /// Near plane at `z = 0` (Direct3D, Vulkan, Metal, wgpu).
    #[default]
    ZeroToOne,
}

impl DepthConvention {
    /// Returns the clip-space z of the near plane.
    pub fn near_clip_z(self) -> f32 {
        match self {
            Self::MinusOneToOne => -1.0,
            Self::ZeroToOne => 0.0,
        }
    }
}

/// Result of an oblique projection build.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObliqueProjection {
    /// The projection to install.
    pub matrix: Mat4,
    /// Whether the near plane was moved onto the clip plane. `false` means
    /// the plane was degenerate and `matrix` is the unmodified input.
    pub clipped: bool,
}

impl ObliqueProjection {
    /// Builds the projection, falling back to `projection` on degenerate planes.
    pub fn build(projection: Mat4, view_plane: Vec4, convention: DepthConvention) -> Self {
        match try_oblique_projection(projection, view_plane, convention) {
            Ok(matrix) => Self {
                matrix,
                clipped: true,
            },
            Err(err) => {
                log::trace!("keeping symmetric projection: {err}");
                Self {
                    matrix: projection,
                    clipped: false,
                }
            }
        }
    }
}

/// Returns the clip-z row coefficients `(m20, m21, m22, m23)`.
pub fn clip_z_row(matrix: &Mat4) -> Vec4 {
    matrix.row(2)
}

/// Returns the sign of `value`, with zero for zero.
fn sign(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Moves the near plane of `projection` onto `view_plane`.
///
/// `view_plane` is `(nx, ny, nz, d)` in the camera's view space. Obtain it
/// with [`Plane::transformed`](crate::plane::Plane::transformed) and the view
/// matrix. Geometry between the camera and the plane is clipped whichever way
/// the normal faces; everything on the far side is kept.
///
/// # Errors
///
/// Returns [`ReflectionError::DegenerateClipPlane`] when the plane has no
/// direction or is parallel to the view ray through the selected clip-space
/// corner. The input matrix is then the correct fallback.
pub fn try_oblique_projection(
    projection: Mat4,
    view_plane: Vec4,
    convention: DepthConvention,
) -> Result<Mat4> {
    let normal_length = view_plane.truncate().length();
    if !normal_length.is_finite() || normal_length < DEGENERATE_EPSILON {
        return Err(ReflectionError::DegenerateClipPlane {
            denom: normal_length,
        });
    }
    let plane = view_plane / view_plane.length();

    let clip_corner = Vec4::new(sign(plane.x), sign(plane.y), convention.near_clip_z(), 1.0);
    let view_corner = projection.inverse() * clip_corner;

    let denom = plane.dot(view_corner);
    if !denom.is_finite() || denom.abs() < DEGENERATE_EPSILON {
        return Err(ReflectionError::DegenerateClipPlane { denom });
    }

    let c = plane * (-2.0 / denom);

    let mut oblique = projection;
    oblique.x_axis.z = c.x;
    oblique.y_axis.z = c.y;
    oblique.z_axis.z = c.z;
    oblique.w_axis.z = c.w;
    Ok(oblique)
}

/// Moves the near plane of `projection` onto `view_plane`, returning
/// `projection` unchanged when the plane is degenerate.
pub fn oblique_projection(projection: Mat4, view_plane: Vec4, convention: DepthConvention) -> Mat4 {
    ObliqueProjection::build(projection, view_plane, convention).matrix
}
