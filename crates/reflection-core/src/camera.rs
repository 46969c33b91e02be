//! Camera state shared between the host and the reflection passes.

use bitflags::bitflags;
use glam::{Mat3, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::oblique::DepthConvention;

/// Rigid camera transform.
///
/// Right-handed: the camera looks down its local `-Z` axis with `+Y` up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraTransform {
    /// Camera position in world space.
    pub position: Vec3,
    /// Camera orientation in world space.
    pub orientation: Quat,
}

impl CameraTransform {
    /// Creates a transform from a position and orientation.
    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Creates a transform at `position` looking at `target`.
    ///
    /// Returns `None` when `target - position` is zero or parallel to `up`.
    pub fn looking_at(position: Vec3, target: Vec3, up: Vec3) -> Option<Self> {
        let orientation = look_rotation(target - position, up)?;
        Some(Self::new(position, orientation))
    }

    /// Returns the camera's forward direction.
    pub fn forward(&self) -> Vec3 {
        self.orientation * Vec3::NEG_Z
    }

    /// Returns the camera's up direction.
    pub fn up(&self) -> Vec3 {
        self.orientation * Vec3::Y
    }

    /// Returns the camera's right direction.
    pub fn right(&self) -> Vec3 {
        self.orientation * Vec3::X
    }

    /// Returns the world-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.position, self.forward(), self.up())
    }
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Builds the orientation whose forward is `forward` and whose up is as close
/// to `up` as possible.
///
/// Returns `None` when either vector is zero or they are parallel.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Option<Quat> {
    let back = (-forward).try_normalize()?;
    let right = up.cross(back).try_normalize()?;
    let true_up = back.cross(right);
    Some(Quat::from_mat3(&Mat3::from_cols(right, true_up, back)).normalize())
}

/// 32-bit render layer mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer.
    pub const ALL: Self = Self(u32::MAX);
    /// No layer.
    pub const NONE: Self = Self(0);

    /// Returns the mask with `layer` added.
    #[must_use]
    pub fn with_layer(self, layer: u32) -> Self {
        Self(self.0 | (1 << (layer % 32)))
    }

    /// Returns the mask with `layer` removed.
    #[must_use]
    pub fn without_layer(self, layer: u32) -> Self {
        Self(self.0 & !(1 << (layer % 32)))
    }

    /// Returns whether `layer` is rendered.
    pub fn contains(self, layer: u32) -> bool {
        self.0 & (1 << (layer % 32)) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Scene features a render task draws.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ViewFlags: u32 {
        /// Opaque and transparent geometry.
        const GEOMETRY = 1 << 0;
        /// Sky and background.
        const SKY = 1 << 1;
        /// Direct lighting.
        const DIRECT_LIGHTING = 1 << 2;
        /// Shadow maps.
        const SHADOWS = 1 << 3;
        /// Decals.
        const DECALS = 1 << 4;
        /// Fog.
        const FOG = 1 << 5;
        /// Screen-space reflections.
        const SCREEN_SPACE_REFLECTIONS = 1 << 6;
        /// Post-processing stack.
        const POST_FX = 1 << 7;
        /// Transparent geometry.
        const TRANSPARENCY = 1 << 8;

        /// Features a reflection pass usually needs.
        const REFLECTION = Self::GEOMETRY.bits()
            | Self::SKY.bits()
            | Self::DIRECT_LIGHTING.bits()
            | Self::FOG.bits()
            | Self::TRANSPARENCY.bits();
    }
}

impl Default for ViewFlags {
    fn default() -> Self {
        Self::REFLECTION
    }
}

/// A camera's pose and lens parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    /// Pose of the camera.
    pub transform: CameraTransform,
    /// Vertical field of view in radians.
    pub field_of_view: f32,
    /// Near clipping distance.
    pub near_plane: f32,
    /// Far clipping distance.
    pub far_plane: f32,
    /// Aspect ratio (width / height).
    pub aspect_ratio: f32,
    /// Layers rendered by this camera.
    pub render_mask: LayerMask,
    /// Features rendered by this camera.
    pub view_flags: ViewFlags,
}

impl CameraState {
    /// Creates a camera with default lens parameters.
    pub fn new(transform: CameraTransform, aspect_ratio: f32) -> Self {
        Self {
            transform,
            field_of_view: 60f32.to_radians(),
            near_plane: 0.1,
            far_plane: 1000.0,
            aspect_ratio,
            render_mask: LayerMask::ALL,
            view_flags: ViewFlags::all(),
        }
    }

    /// Returns the world-to-view matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.transform.view_matrix()
    }

    /// Returns the symmetric perspective projection for `convention`.
    pub fn projection_matrix(&self, convention: DepthConvention) -> Mat4 {
        match convention {
            DepthConvention::MinusOneToOne => Mat4::perspective_rh_gl(
                self.field_of_view,
                self.aspect_ratio,
                self.near_plane,
                self.far_plane,
            ),
            DepthConvention::ZeroToOne => Mat4::perspective_rh(
                self.field_of_view,
                self.aspect_ratio,
                self.near_plane,
                self.far_plane,
            ),
        }
    }

    /// Copies the lens parameters of `other`, keeping pose, mask and flags.
    pub fn copy_lens_from(&mut self, other: &CameraState) {
        self.field_of_view = other.field_of_view;
        self.near_plane = other.near_plane;
        self.far_plane = other.far_plane;
        self.aspect_ratio = other.aspect_ratio;
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(CameraTransform::default(), 16.0 / 9.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_transform_axes() {
        let transform = CameraTransform::default();
        assert_eq!(transform.forward(), Vec3::NEG_Z);
        assert_eq!(transform.up(), Vec3::Y);
        assert_eq!(transform.right(), Vec3::X);
    }

    #[test]
    fn test_looking_at_points_forward_at_target() {
        let transform =
            CameraTransform::looking_at(Vec3::new(0.0, 5.0, -10.0), Vec3::ZERO, Vec3::Y).unwrap();
        let expected = (Vec3::ZERO - Vec3::new(0.0, 5.0, -10.0)).normalize();
        assert!((transform.forward() - expected).length() < 1e-5);
        assert!(transform.up().y > 0.0);
        assert!(transform.up().dot(transform.forward()).abs() < 1e-5);
    }

    #[test]
    fn test_looking_at_rejects_parallel_up() {
        assert!(CameraTransform::looking_at(Vec3::ZERO, Vec3::Y, Vec3::Y).is_none());
        assert!(CameraTransform::looking_at(Vec3::ONE, Vec3::ONE, Vec3::Y).is_none());
    }

    #[test]
    fn test_view_matrix_moves_camera_to_origin() {
        let transform =
            CameraTransform::looking_at(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::Y).unwrap();
        let view = transform.view_matrix();
        let origin = view.transform_point3(Vec3::new(1.0, 2.0, 3.0));
        assert!(origin.length() < 1e-5);

        // The target lies straight ahead, down -Z
        let target = view.transform_point3(Vec3::ZERO);
        assert!(target.x.abs() < 1e-4 && target.y.abs() < 1e-4);
        assert!(target.z < 0.0);
    }

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::NONE.with_layer(3).with_layer(5);
        assert!(mask.contains(3));
        assert!(mask.contains(5));
        assert!(!mask.contains(4));
        assert!(!mask.without_layer(3).contains(3));
        assert!(LayerMask::default().contains(31));
    }

    #[test]
    fn test_projection_conventions_differ_in_depth() {
        let camera = CameraState::default();
        let gl = camera.projection_matrix(DepthConvention::MinusOneToOne);
        let dx = camera.projection_matrix(DepthConvention::ZeroToOne);

        // Same lens, different clip-z row
        assert!((gl.x_axis.x - dx.x_axis.x).abs() < 1e-6);
        assert!((gl.y_axis.y - dx.y_axis.y).abs() < 1e-6);
        assert!(gl.z_axis.z != dx.z_axis.z);

        // The near plane maps to -1 and 0 respectively
        let near = Vec3::new(0.0, 0.0, -camera.near_plane);
        assert!((gl.project_point3(near).z + 1.0).abs() < 1e-4);
        assert!(dx.project_point3(near).z.abs() < 1e-4);
    }
}
