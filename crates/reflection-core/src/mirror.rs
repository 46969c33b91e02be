//! Mirrored camera construction.

use glam::Quat;

use crate::camera::{look_rotation, CameraState, CameraTransform};
use crate::plane::Plane;

/// Mirrors a camera transform across `plane`.
///
/// The position is reflected through the plane and the orientation is
/// rebuilt from the reflected forward and up vectors, so the result is a
/// proper rotation rather than a handedness-flipping matrix.
///
/// Returns `None` when the reflected basis cannot form an orientation.
pub fn mirror(transform: &CameraTransform, plane: &Plane) -> Option<CameraTransform> {
    let forward = plane.reflect_direction(transform.forward());
    let up = plane.reflect_direction(transform.up());
    let orientation = look_rotation(forward, up)?;
    Some(CameraTransform::new(
        plane.reflect_point(transform.position),
        orientation,
    ))
}

/// Mirrors `transform`, keeping `previous` as the orientation when the
/// reflected basis is degenerate.
pub fn mirror_or_keep(
    transform: &CameraTransform,
    plane: &Plane,
    previous: Quat,
) -> CameraTransform {
    mirror(transform, plane).unwrap_or_else(|| {
        log::warn!("degenerate mirrored basis, keeping previous orientation");
        CameraTransform::new(plane.reflect_point(transform.position), previous)
    })
}

/// Derives the mirrored camera for `primary`.
///
/// Lens parameters follow the primary camera; the pose is mirrored across
/// `plane`; render mask and view flags are taken from `template`, which is
/// the mirrored camera of the previous frame.
pub fn mirror_camera(primary: &CameraState, plane: &Plane, template: &CameraState) -> CameraState {
    let mut state = *template;
    state.copy_lens_from(primary);
    state.transform = mirror_or_keep(&primary.transform, plane, template.transform.orientation);
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{LayerMask, ViewFlags};
    use glam::Vec3;
    use proptest::prelude::*;

    #[test]
    fn test_mirror_camera_above_ground() {
        let position = Vec3::new(0.0, 5.0, -10.0);
        let transform = CameraTransform::looking_at(position, Vec3::ZERO, Vec3::Y).unwrap();
        let mirrored = mirror(&transform, &Plane::GROUND).unwrap();

        assert!((mirrored.position - Vec3::new(0.0, -5.0, -10.0)).length() < 1e-5);

        let flip = Vec3::new(1.0, -1.0, 1.0);
        assert!((mirrored.forward() - transform.forward() * flip).length() < 1e-5);
        assert!((mirrored.up() - transform.up() * flip).length() < 1e-5);
    }

    #[test]
    fn test_mirror_is_rigid() {
        let transform = CameraTransform::looking_at(
            Vec3::new(3.0, 2.0, 1.0),
            Vec3::new(0.0, 0.5, -2.0),
            Vec3::Y,
        )
        .unwrap();
        let plane = Plane::new(Vec3::new(0.2, 1.0, 0.1), -0.5);
        let mirrored = mirror(&transform, &plane).unwrap();

        assert!((mirrored.orientation.length() - 1.0).abs() < 1e-5);
        assert!(mirrored.forward().dot(mirrored.up()).abs() < 1e-5);
        // Right-handed: right = forward x up
        let right = mirrored.forward().cross(mirrored.up());
        assert!((right - mirrored.right()).length() < 1e-4);
    }

    #[test]
    fn test_mirrored_position_on_other_side() {
        let plane = Plane::from_surface(Vec3::new(0.0, 2.0, 0.0), Vec3::Y, 0.0);
        let transform = CameraTransform::new(Vec3::new(1.0, 7.0, 4.0), Quat::IDENTITY);
        let mirrored = mirror(&transform, &plane).unwrap();

        assert!((plane.signed_distance(mirrored.position) + 5.0).abs() < 1e-5);
        assert!((mirrored.position - Vec3::new(1.0, -3.0, 4.0)).length() < 1e-5);
    }

    #[test]
    fn test_mirror_or_keep_uses_previous() {
        // A zero orientation cannot produce a basis
        let transform = CameraTransform::new(
            Vec3::new(0.0, 3.0, 0.0),
            Quat::from_xyzw(0.0, 0.0, 0.0, 0.0),
        );
        let previous = Quat::from_rotation_x(0.3);
        let mirrored = mirror_or_keep(&transform, &Plane::GROUND, previous);

        assert_eq!(mirrored.orientation, previous);
        assert!((mirrored.position - Vec3::new(0.0, -3.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_mirror_camera_keeps_template_mask() {
        let mut primary = CameraState::default();
        primary.transform =
            CameraTransform::looking_at(Vec3::new(0.0, 4.0, 4.0), Vec3::ZERO, Vec3::Y).unwrap();
        primary.field_of_view = 1.1;
        primary.render_mask = LayerMask::ALL;

        let mut template = CameraState::default();
        template.render_mask = LayerMask::NONE.with_layer(2);
        template.view_flags = ViewFlags::GEOMETRY;

        let mirrored = mirror_camera(&primary, &Plane::GROUND, &template);
        assert_eq!(mirrored.field_of_view, 1.1);
        assert_eq!(mirrored.render_mask, template.render_mask);
        assert_eq!(mirrored.view_flags, ViewFlags::GEOMETRY);
        assert!(mirrored.transform.position.y < 0.0);
    }

    proptest! {
        #[test]
        fn prop_mirror_is_involution(
            px in -20.0f32..20.0, py in -20.0f32..20.0, pz in -20.0f32..20.0,
            yaw in -3.1f32..3.1, pitch in -1.4f32..1.4, roll in -3.1f32..3.1,
            nx in -1.0f32..1.0, ny in -1.0f32..1.0, nz in -1.0f32..1.0,
            d in -5.0f32..5.0,
        ) {
            let normal = Vec3::new(nx, ny, nz);
            prop_assume!(normal.length() > 0.1);
            let plane = Plane::new(normal, d);
            let orientation = Quat::from_euler(glam::EulerRot::YXZ, yaw, pitch, roll);
            let transform = CameraTransform::new(Vec3::new(px, py, pz), orientation);

            let once = mirror(&transform, &plane).unwrap();
            let twice = mirror(&once, &plane).unwrap();

            prop_assert!((twice.position - transform.position).length() < 1e-3);
            prop_assert!((twice.forward() - transform.forward()).length() < 1e-3);
            prop_assert!((twice.up() - transform.up()).length() < 1e-3);
        }
    }
}
