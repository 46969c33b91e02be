//! Reflecting plane model.
//!
//! A plane is stored as a unit normal and a signed distance so that
//! `point.dot(normal) + distance` is the signed height of `point` above it.

use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// A plane in Hessian normal form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    /// Unit normal pointing toward the reflected side.
    pub normal: Vec3,
    /// Signed distance term.
    pub distance: f32,
}

impl Plane {
    /// The `y = 0` plane facing `+Y`.
    pub const GROUND: Self = Self {
        normal: Vec3::Y,
        distance: 0.0,
    };

    /// Creates a plane from a normal and distance. The normal is normalized.
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Derives the plane from a reflecting surface.
    ///
    /// `surface_up` must already be normalized and non-zero. `clip_offset`
    /// pushes the plane along the normal, which hides seams where geometry
    /// intersects the surface.
    pub fn from_surface(surface_position: Vec3, surface_up: Vec3, clip_offset: f32) -> Self {
        Self {
            normal: surface_up,
            distance: -surface_up.dot(surface_position) - clip_offset,
        }
    }

    /// Returns the signed height of a point above the plane.
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        point.dot(self.normal) + self.distance
    }

    /// Returns a parallel plane with `distance + delta`.
    #[must_use]
    pub fn offset(&self, delta: f32) -> Self {
        Self {
            normal: self.normal,
            distance: self.distance + delta,
        }
    }

    /// Reflects a point across the plane.
    pub fn reflect_point(&self, point: Vec3) -> Vec3 {
        point - 2.0 * self.signed_distance(point) * self.normal
    }

    /// Reflects a direction across the plane. The distance term is ignored.
    pub fn reflect_direction(&self, direction: Vec3) -> Vec3 {
        direction - 2.0 * direction.dot(self.normal) * self.normal
    }

    /// Returns `(nx, ny, nz, d)`.
    pub fn to_vec4(&self) -> Vec4 {
        self.normal.extend(self.distance)
    }

    /// Transforms the plane coefficients into another frame.
    ///
    /// `points_to_frame` maps points from the plane's frame into the target
    /// frame (e.g. a view matrix). Planes transform with its inverse transpose.
    /// The result is not renormalized.
    pub fn transformed(&self, points_to_frame: Mat4) -> Vec4 {
        points_to_frame.inverse().transpose() * self.to_vec4()
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self::GROUND
    }
}
