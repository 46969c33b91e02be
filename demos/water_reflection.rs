#![allow(clippy::cast_precision_loss)]
//! Demo of a water surface reflecting an orbiting camera.
//!
//! Runs a few seconds of simulated frames on a headless host and logs the
//! mirrored camera and the installed projections. Pass a JSON options file
//! as the first argument to override the defaults:
//!
//! ```text
//! RUST_LOG=debug cargo run --example water_reflection -- options.json
//! ```

use planar_reflection::{
    init_logging, load_options, CameraState, CameraTransform, HeadlessHost, Quat,
    ReflectionOptions, ReflectionRenderer, Result, UVec2, Vec3,
};

const FRAMES: u64 = 360;
const DT: f32 = 1.0 / 60.0;

fn main() -> Result<()> {
    init_logging();

    let options = match std::env::args().nth(1) {
        Some(path) => load_options(path)?,
        None => ReflectionOptions {
            update_frequency: 0.5,
            resolution_scale: 0.5,
            clip_plane_offset: 0.02,
            ..ReflectionOptions::default()
        },
    };

    let mut host = HeadlessHost::new();
    host.set_viewport(Some(UVec2::new(1920, 1080)));
    let water_level = Vec3::new(0.0, -0.5, 0.0);
    let camera = host.add_camera(orbit(0.0, water_level));
    let material = host.create_material();

    let mut water = ReflectionRenderer::new(options)?.with_material(material);
    water.set_surface(water_level, Vec3::Y);
    water.enable(&mut host)?;

    for frame in 0..FRAMES {
        let time = frame as f32 * DT;
        if let Some(state) = host.camera_mut(camera) {
            *state = orbit(time, water_level);
        }

        water.update(&mut host);
        let submissions = host.render_frame(&mut water, DT);

        if frame % 60 == 0 {
            let mirrored = water.mirror_state().transform.position;
            log::info!(
                "t={time:.1}s: {} passes, mirrored camera at ({:.2}, {:.2}, {:.2})",
                submissions.len(),
                mirrored.x,
                mirrored.y,
                mirrored.z
            );
        }
    }

    let stats = water.reflection_stats();
    log::info!(
        "reflection rendered {} of {FRAMES} frames ({} degenerate)",
        stats.rendered_frames,
        stats.degenerate_frames
    );
    if let Some(target) = water.reflection_target() {
        log::info!(
            "reflection target {}x{}",
            target.descriptor.width,
            target.descriptor.height
        );
    }

    water.disable(&mut host);
    Ok(())
}

/// Camera circling the origin above the water, looking at it.
fn orbit(time: f32, water_level: Vec3) -> CameraState {
    let angle = time * 0.5;
    let position = Vec3::new(angle.cos() * 8.0, 3.0 + (time * 0.7).sin(), angle.sin() * 8.0);
    let transform = CameraTransform::looking_at(position, water_level, Vec3::Y)
        .unwrap_or_else(|| CameraTransform::new(position, Quat::IDENTITY));
    CameraState::new(transform, 16.0 / 9.0)
}
