//! Reflection pass controller.
//!
//! [`ReflectionRenderer`] owns the mirrored camera and both clip-plane
//! passes. It allocates host resources on [`enable`](ReflectionRenderer::enable),
//! throttles the passes in [`update`](ReflectionRenderer::update), installs
//! the oblique projections from the pre-render hook, and frees everything on
//! [`disable`](ReflectionRenderer::disable).

use glam::{UVec2, Vec3};
use reflection_core::{
    mirror_camera, CameraState, FlectionSchedule, Plane, ReflectionOptions, Throttle,
};

use crate::error::{RenderError, RenderResult};
use crate::host::{
    CameraHandle, FrameInfo, MaterialHandle, PreRenderHandler, RenderHost, RenderViewState,
    TaskHandle,
};
use crate::pass::{PassKind, PassStats, PlanePass};
use crate::target::{
    scaled_extent, texture_format, RenderTarget, TargetDescriptor, FALLBACK_RESOLUTION,
};

/// Lifecycle state of a [`ReflectionRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReflectionState {
    /// No host resources are held.
    #[default]
    Disabled,
    /// Resources are being allocated.
    Enabling,
    /// Both passes are allocated and hooked.
    Active,
}

/// Drives a planar reflection and its flection pass for one surface.
#[derive(Debug)]
pub struct ReflectionRenderer {
    options: ReflectionOptions,
    state: ReflectionState,
    explicit_camera: Option<CameraHandle>,
    primary_camera: Option<CameraHandle>,
    primary_lost: bool,
    mirror_camera: Option<CameraHandle>,
    mirror_state: CameraState,
    material: Option<MaterialHandle>,
    surface_position: Vec3,
    surface_up: Vec3,
    throttle: Throttle,
    flection_throttle: Option<Throttle>,
    reflection: PlanePass,
    flection: PlanePass,
}

impl ReflectionRenderer {
    /// Creates a disabled renderer for the `y = 0` surface.
    pub fn new(options: ReflectionOptions) -> RenderResult<Self> {
        options.validate()?;

        let mut throttle = Throttle::new(options.update_frequency);
        throttle.set_resolution_scale(options.clamped_resolution_scale());

        let mut mirror_state = CameraState::default();
        mirror_state.render_mask = options.reflection_layers;
        mirror_state.view_flags = options.reflection_view_flags;

        let reflection = PlanePass::new(
            PassKind::Reflection,
            options.depth_convention,
            options.reflection_view_flags,
            options.reflection_param_name.clone(),
        );
        let flection = PlanePass::new(
            PassKind::Flection,
            options.flection_depth_convention,
            options.flection_view_flags,
            options.flection_param_name.clone(),
        );

        Ok(Self {
            flection_throttle: independent_throttle(options.flection_schedule),
            options,
            state: ReflectionState::Disabled,
            explicit_camera: None,
            primary_camera: None,
            primary_lost: false,
            mirror_camera: None,
            mirror_state,
            material: None,
            surface_position: Vec3::ZERO,
            surface_up: Vec3::Y,
            throttle,
            reflection,
            flection,
        })
    }

    /// Renders from `camera` instead of the host's default camera.
    #[must_use]
    pub fn with_camera(mut self, camera: CameraHandle) -> Self {
        self.explicit_camera = Some(camera);
        self
    }

    /// Publishes the textures on `material` once enabled.
    #[must_use]
    pub fn with_material(mut self, material: MaterialHandle) -> Self {
        self.material = Some(material);
        self
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> ReflectionState {
        self.state
    }

    /// Returns whether both passes are allocated.
    pub fn is_active(&self) -> bool {
        self.state == ReflectionState::Active
    }

    /// Returns the options the renderer was built with.
    pub fn options(&self) -> &ReflectionOptions {
        &self.options
    }

    /// Returns the throttle of the reflection pass.
    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// Returns the camera the passes were enabled with.
    pub fn primary_camera(&self) -> Option<CameraHandle> {
        self.primary_camera
    }

    /// Returns the host handle of the mirrored camera.
    pub fn mirror_camera(&self) -> Option<CameraHandle> {
        self.mirror_camera
    }

    /// Returns the mirrored camera as of the last reflection callback.
    pub fn mirror_state(&self) -> &CameraState {
        &self.mirror_state
    }

    /// Returns the surface plane including the clip offset.
    pub fn reflection_plane(&self) -> Plane {
        Plane::from_surface(
            self.surface_position,
            self.surface_up,
            self.options.clip_plane_offset,
        )
    }

    /// Returns the plane the flection pass clips against.
    pub fn flection_plane(&self) -> Plane {
        self.reflection_plane().offset(self.options.flection_offset)
    }

    /// Returns the reflection target, if allocated.
    pub fn reflection_target(&self) -> Option<&RenderTarget> {
        self.reflection.target()
    }

    /// Returns the flection target, if allocated.
    pub fn flection_target(&self) -> Option<&RenderTarget> {
        self.flection.target()
    }

    /// Returns the reflection task, if allocated.
    pub fn reflection_task(&self) -> Option<TaskHandle> {
        self.reflection.task()
    }

    /// Returns the flection task, if allocated.
    pub fn flection_task(&self) -> Option<TaskHandle> {
        self.flection.task()
    }

    /// Returns the reflection pass counters.
    pub fn reflection_stats(&self) -> PassStats {
        self.reflection.stats()
    }

    /// Returns the flection pass counters.
    pub fn flection_stats(&self) -> PassStats {
        self.flection.stats()
    }

    /// Moves the reflecting surface. A zero `up` keeps the previous normal.
    pub fn set_surface(&mut self, position: Vec3, up: Vec3) {
        self.surface_position = position;
        match up.try_normalize() {
            Some(up) => self.surface_up = up,
            None => log::warn!("ignoring zero surface normal"),
        }
    }

    /// Sets the fraction of frames on which the passes render.
    pub fn set_update_frequency(&mut self, frequency: f32) {
        self.options.update_frequency = frequency.clamp(0.0, 1.0);
        self.throttle.set_frequency(frequency);
    }

    /// Changes how the flection pass is scheduled.
    pub fn set_flection_schedule(&mut self, schedule: FlectionSchedule) {
        self.options.flection_schedule = schedule;
        self.flection_throttle = independent_throttle(schedule);
    }

    /// Sets the output resolution scale and resizes live targets.
    ///
    /// The scale is clamped to `[0.01, 1]`; changes below `1e-4` are ignored.
    pub fn set_resolution_scale<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        scale: f32,
    ) -> RenderResult<()> {
        if !self.throttle.set_resolution_scale(scale) {
            return Ok(());
        }
        self.options.resolution_scale = self.throttle.resolution_scale();
        self.resize_targets(host)
    }

    /// Sets the unscaled target size and resizes live targets.
    ///
    /// `None` falls back to the host viewport.
    pub fn set_base_resolution<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        size: Option<UVec2>,
    ) -> RenderResult<()> {
        let size = size.map(|size| size.max(UVec2::ONE));
        if self.options.base_resolution == size {
            return Ok(());
        }
        self.options.base_resolution = size;
        self.resize_targets(host)
    }

    /// Changes the material the textures are published on.
    pub fn set_material<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        material: MaterialHandle,
    ) -> RenderResult<()> {
        self.material = Some(material);
        if self.is_active() {
            self.bind_textures(host)?;
        }
        Ok(())
    }

    /// Returns the size both targets are allocated at.
    pub fn target_size<H: RenderHost + ?Sized>(&self, host: &H) -> UVec2 {
        let base = self
            .options
            .base_resolution
            .or_else(|| host.viewport_size())
            .unwrap_or(FALLBACK_RESOLUTION);
        scaled_extent(base, self.throttle.resolution_scale())
    }

    /// Allocates the mirrored camera, targets, tasks and hooks.
    ///
    /// Does nothing when already active. On failure every resource created
    /// so far is released and the renderer stays disabled.
    pub fn enable<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> RenderResult<()> {
        if self.is_active() {
            return Ok(());
        }
        self.state = ReflectionState::Enabling;

        let Some(camera) = self.explicit_camera.or_else(|| host.default_camera()) else {
            log::error!("no camera to render reflections from");
            self.state = ReflectionState::Disabled;
            return Err(RenderError::MissingCamera);
        };
        let Some(primary) = host.camera_state(camera) else {
            log::error!("primary camera {} does not exist", camera.id());
            self.state = ReflectionState::Disabled;
            return Err(RenderError::MissingCamera);
        };

        if let Err(err) = self.allocate(host, camera, &primary) {
            log::warn!("enabling reflections failed: {err}");
            self.release(host);
            self.state = ReflectionState::Disabled;
            return Err(err);
        }

        self.throttle.reset();
        if let Some(throttle) = &mut self.flection_throttle {
            throttle.reset();
        }
        self.state = ReflectionState::Active;
        let size = self.target_size(host);
        log::info!(
            "reflections enabled at {}x{} (flection enabled: {})",
            size.x,
            size.y,
            self.options.flection_enabled
        );
        Ok(())
    }

    /// Releases every host resource. Does nothing when already disabled.
    pub fn disable<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        if self.state == ReflectionState::Disabled {
            return;
        }
        self.release(host);
        self.state = ReflectionState::Disabled;
        log::info!("reflections disabled");
    }

    /// Advances the throttles by one host frame.
    ///
    /// Each pass task is enabled for exactly the frames its throttle fires on.
    /// The reflection task stays off while the primary camera is missing.
    /// Returns whether the reflection pass fires.
    pub fn update<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.primary_lost && self.primary_state(&*host).is_some() {
            log::info!("primary camera is back, resuming reflections");
            self.primary_lost = false;
        }
        let fire = self.throttle.tick();
        let flection_fire = match &mut self.flection_throttle {
            Some(throttle) => throttle.tick(),
            None => fire,
        };
        self.reflection.set_enabled(host, fire && !self.primary_lost);
        self.flection.set_enabled(host, flection_fire);
        fire
    }

    /// Returns whether the reflection pass is stopped on a missing primary camera.
    pub fn is_primary_lost(&self) -> bool {
        self.primary_lost
    }

    fn primary_state<H: RenderHost + ?Sized>(&self, host: &H) -> Option<CameraState> {
        self.primary_camera.and_then(|camera| host.camera_state(camera))
    }

    fn allocate<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        camera: CameraHandle,
        primary: &CameraState,
    ) -> RenderResult<()> {
        self.primary_camera = Some(camera);

        self.mirror_state = mirror_camera(primary, &self.reflection_plane(), &self.mirror_state);
        let mirror = match self.mirror_camera {
            Some(mirror) => {
                host.update_camera(mirror, &self.mirror_state)?;
                mirror
            }
            None => {
                let mirror = host.create_camera(&self.mirror_state)?;
                self.mirror_camera = Some(mirror);
                mirror
            }
        };

        let desc = TargetDescriptor::new(
            "reflection target",
            self.target_size(host),
            texture_format(self.options.target_format),
        );
        self.reflection.allocate(host, &desc, mirror)?;
        if self.options.flection_enabled {
            self.flection
                .allocate(host, &desc.with_label("flection target"), camera)?;
        }

        self.reflection.set_enabled(host, true);
        self.flection.set_enabled(host, true);
        self.bind_textures(host)
    }

    fn release<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        self.reflection.release(host);
        self.flection.release(host);
        if let Some(mirror) = self.mirror_camera.take() {
            host.release_camera(mirror);
        }
        self.primary_camera = None;
        self.primary_lost = false;
    }

    fn bind_textures<H: RenderHost + ?Sized>(&self, host: &mut H) -> RenderResult<()> {
        let Some(material) = self.material else {
            return Ok(());
        };
        self.reflection.bind(host, material)?;
        self.flection.bind(host, material)
    }

    fn resize_targets<H: RenderHost + ?Sized>(&mut self, host: &mut H) -> RenderResult<()> {
        if !self.is_active() {
            return Ok(());
        }
        let size = self.target_size(host);
        self.reflection.resize(host, size)?;
        self.flection.resize(host, size)
    }

    fn log_diagnostics(&self, kind: PassKind, frame: &FrameInfo) {
        let interval = self.options.diagnostics_interval;
        if interval == 0 || frame.frame % interval != 0 {
            return;
        }
        let stats = match kind {
            PassKind::Reflection => self.reflection.stats(),
            PassKind::Flection => self.flection.stats(),
        };
        log::debug!(
            "{kind} pass at frame {}: {} ({} of {} frames degenerate)",
            frame.frame,
            if stats.last_clipped == Some(true) {
                "oblique near plane installed"
            } else {
                "degenerate plane, symmetric projection kept"
            },
            stats.degenerate_frames,
            stats.rendered_frames
        );
    }

    fn render_reflection(&mut self, host: &mut dyn RenderHost, view: &mut RenderViewState) {
        let plane = self.reflection_plane();
        match self.primary_state(&*host) {
            Some(primary) => {
                self.mirror_state = mirror_camera(&primary, &plane, &self.mirror_state);
                if let Some(mirror) = self.mirror_camera {
                    if let Err(err) = host.update_camera(mirror, &self.mirror_state) {
                        log::warn!("failed to move mirrored camera: {err}");
                    }
                }
            }
            None => {
                if !self.primary_lost {
                    log::error!("primary camera vanished, stopping the reflection pass");
                    self.primary_lost = true;
                }
                self.reflection.set_enabled(host, false);
            }
        }

        // The host built `view` from the mirrored camera before it moved
        let mirror_view = self.mirror_state.view_matrix();
        let symmetric = self.mirror_state.projection_matrix(self.reflection.convention());
        let projection = self.reflection.install(view, mirror_view, symmetric, &plane);
        log::trace!("reflection clip applied: {}", projection.clipped);
    }

    fn render_flection(&mut self, view: &mut RenderViewState) {
        let plane = self.flection_plane();
        let (primary_view, symmetric) = (view.view(), view.projection());
        let projection = self.flection.install(view, primary_view, symmetric, &plane);
        log::trace!("flection clip applied: {}", projection.clipped);
    }
}

impl PreRenderHandler for ReflectionRenderer {
    fn pre_render(
        &mut self,
        host: &mut dyn RenderHost,
        task: TaskHandle,
        frame: &FrameInfo,
        view: &mut RenderViewState,
    ) {
        if !self.is_active() {
            return;
        }
        if self.reflection.owns(task) {
            self.render_reflection(host, view);
            self.log_diagnostics(PassKind::Reflection, frame);
        } else if self.flection.owns(task) {
            self.render_flection(view);
            self.log_diagnostics(PassKind::Flection, frame);
        }
    }
}

fn independent_throttle(schedule: FlectionSchedule) -> Option<Throttle> {
    match schedule {
        FlectionSchedule::Shared => None,
        FlectionSchedule::Independent { frequency } => Some(Throttle::new(frequency)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{FailurePlan, HeadlessHost};
    use reflection_core::{CameraTransform, DepthConvention};

    const DT: f32 = 1.0 / 60.0;

    fn scene() -> (HeadlessHost, CameraHandle) {
        let mut host = HeadlessHost::new();
        host.set_viewport(Some(UVec2::new(800, 600)));
        let camera = host.add_camera(CameraState::new(
            CameraTransform::looking_at(Vec3::new(0.0, 5.0, -10.0), Vec3::ZERO, Vec3::Y).unwrap(),
            4.0 / 3.0,
        ));
        (host, camera)
    }

    #[test]
    fn test_enable_allocates_both_passes() {
        let (mut host, camera) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();

        assert!(renderer.is_active());
        assert_eq!(renderer.primary_camera(), Some(camera));
        assert_eq!(host.target_count(), 2);
        assert_eq!(host.task_count(), 2);
        assert_eq!(host.hook_count(), 2);
        assert_eq!(host.camera_count(), 2);

        let reflection = host.task(renderer.reflection_task().unwrap()).unwrap();
        assert_eq!(reflection.descriptor.order, -100);
        assert_eq!(Some(reflection.descriptor.camera), renderer.mirror_camera());
        let flection = host.task(renderer.flection_task().unwrap()).unwrap();
        assert_eq!(flection.descriptor.order, -99);
        assert_eq!(flection.descriptor.camera, camera);

        assert_eq!(
            renderer.reflection_target().unwrap().descriptor.size(),
            UVec2::new(800, 600)
        );
    }

    #[test]
    fn test_enable_twice_is_noop() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        renderer.enable(&mut host).unwrap();
        assert_eq!(host.target_count(), 2);
    }

    #[test]
    fn test_fallback_resolution_without_viewport() {
        let (mut host, _) = scene();
        host.set_viewport(None);
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        assert_eq!(
            renderer.reflection_target().unwrap().descriptor.size(),
            FALLBACK_RESOLUTION
        );
    }

    #[test]
    fn test_missing_camera_stays_disabled() {
        let mut host = HeadlessHost::new();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        let err = renderer.enable(&mut host).unwrap_err();

        assert!(matches!(err, RenderError::MissingCamera));
        assert_eq!(renderer.state(), ReflectionState::Disabled);
        assert_eq!(host.target_count(), 0);
        assert_eq!(host.camera_count(), 0);
    }

    #[test]
    fn test_failed_enable_rolls_back() {
        let (mut host, _) = scene();
        host.set_failures(FailurePlan {
            tasks_after: Some(1),
            ..FailurePlan::default()
        });
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        let err = renderer.enable(&mut host).unwrap_err();

        assert!(matches!(err, RenderError::TaskCreationFailed(_)));
        assert_eq!(renderer.state(), ReflectionState::Disabled);
        assert_eq!(host.target_count(), 0);
        assert_eq!(host.task_count(), 0);
        assert_eq!(host.hook_count(), 0);
        // Only the scene camera remains
        assert_eq!(host.camera_count(), 1);
        assert!(renderer.reflection_target().is_none());
    }

    #[test]
    fn test_failed_binding_rolls_back() {
        let (mut host, _) = scene();
        let material = host.create_material();
        host.set_failures(FailurePlan {
            bindings: true,
            ..FailurePlan::default()
        });
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default())
            .unwrap()
            .with_material(material);

        assert!(matches!(
            renderer.enable(&mut host),
            Err(RenderError::MaterialBindingFailed { .. })
        ));
        assert_eq!(host.target_count(), 0);
    }

    #[test]
    fn test_disable_is_idempotent() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        renderer.disable(&mut host);
        renderer.disable(&mut host);

        assert_eq!(renderer.state(), ReflectionState::Disabled);
        assert_eq!(host.target_count(), 0);
        assert_eq!(host.task_count(), 0);
        assert_eq!(host.hook_count(), 0);
        assert_eq!(host.camera_count(), 1);
        assert!(renderer.mirror_camera().is_none());
    }

    #[test]
    fn test_update_follows_throttle() {
        let (mut host, _) = scene();
        let options = ReflectionOptions {
            update_frequency: 0.5,
            ..ReflectionOptions::default()
        };
        let mut renderer = ReflectionRenderer::new(options).unwrap();
        renderer.enable(&mut host).unwrap();
        let task = renderer.reflection_task().unwrap();

        let fired: Vec<bool> = (0..4).map(|_| renderer.update(&mut host)).collect();
        assert_eq!(fired, vec![false, true, false, true]);
        assert!(host.task(task).unwrap().enabled);
        renderer.update(&mut host);
        assert!(!host.task(task).unwrap().enabled);
    }

    #[test]
    fn test_independent_flection_schedule() {
        let (mut host, _) = scene();
        let options = ReflectionOptions {
            flection_schedule: FlectionSchedule::Independent { frequency: 0.0 },
            ..ReflectionOptions::default()
        };
        let mut renderer = ReflectionRenderer::new(options).unwrap();
        renderer.enable(&mut host).unwrap();

        assert!(renderer.update(&mut host));
        let reflection = renderer.reflection_task().unwrap();
        let flection = renderer.flection_task().unwrap();
        assert!(host.task(reflection).unwrap().enabled);
        assert!(!host.task(flection).unwrap().enabled);
    }

    #[test]
    fn test_update_while_disabled() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        assert!(!renderer.update(&mut host));
    }

    #[test]
    fn test_resolution_scale_resizes_in_place() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        let handle = renderer.reflection_target().unwrap().handle;
        let task = renderer.reflection_task();

        renderer.set_resolution_scale(&mut host, 0.5).unwrap();
        let target = renderer.reflection_target().unwrap();
        assert_eq!(target.handle, handle);
        assert_eq!(target.descriptor.size(), UVec2::new(400, 300));
        assert_eq!(host.target(handle).unwrap().size(), UVec2::new(400, 300));
        assert_eq!(
            renderer.flection_target().unwrap().descriptor.size(),
            UVec2::new(400, 300)
        );
        assert_eq!(renderer.reflection_task(), task);
        assert_eq!(host.hook_count(), 2);
    }

    #[test]
    fn test_resolution_scale_is_clamped() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();

        renderer.set_resolution_scale(&mut host, 0.0).unwrap();
        assert_eq!(renderer.throttle().resolution_scale(), 0.01);
        assert_eq!(
            renderer.reflection_target().unwrap().descriptor.size(),
            UVec2::new(8, 6)
        );

        renderer.set_resolution_scale(&mut host, 7.0).unwrap();
        assert_eq!(renderer.throttle().resolution_scale(), 1.0);
    }

    #[test]
    fn test_base_resolution_overrides_viewport() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        renderer
            .set_base_resolution(&mut host, Some(UVec2::new(256, 128)))
            .unwrap();
        assert_eq!(
            renderer.reflection_target().unwrap().descriptor.size(),
            UVec2::new(256, 128)
        );
    }

    #[test]
    fn test_set_material_rebinds_while_active() {
        let (mut host, _) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();

        let material = host.create_material();
        renderer.set_material(&mut host, material).unwrap();
        assert_eq!(
            host.binding(material, "MainTex"),
            renderer.reflection_target().map(|t| t.handle)
        );
        assert_eq!(
            host.binding(material, "FlectionTex"),
            renderer.flection_target().map(|t| t.handle)
        );
    }

    #[test]
    fn test_flection_disabled_allocates_one_pass() {
        let (mut host, _) = scene();
        let options = ReflectionOptions {
            flection_enabled: false,
            ..ReflectionOptions::default()
        };
        let mut renderer = ReflectionRenderer::new(options).unwrap();
        renderer.enable(&mut host).unwrap();
        assert_eq!(host.target_count(), 1);
        assert!(renderer.flection_task().is_none());
    }

    #[test]
    fn test_planes_follow_surface() {
        let options = ReflectionOptions {
            clip_plane_offset: 0.1,
            ..ReflectionOptions::default()
        };
        let mut renderer = ReflectionRenderer::new(options).unwrap();
        renderer.set_surface(Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.0, 3.0, 0.0));

        let plane = renderer.reflection_plane();
        assert_eq!(plane.normal, Vec3::Y);
        assert!((plane.distance + 2.1).abs() < 1e-6);
        assert!((renderer.flection_plane().distance - (plane.distance + 1.0)).abs() < 1e-6);

        renderer.set_surface(Vec3::ZERO, Vec3::ZERO);
        assert_eq!(renderer.reflection_plane().normal, Vec3::Y);
    }

    #[test]
    fn test_lens_change_applies_same_frame() {
        let (mut host, camera) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        renderer.update(&mut host);
        host.render_frame(&mut renderer, DT);

        host.camera_mut(camera).unwrap().field_of_view = 1.2;
        renderer.update(&mut host);
        let submissions = host.render_frame(&mut renderer, DT);
        let task = renderer.reflection_task().unwrap();
        let reflection = submissions.iter().find(|s| s.task == task).unwrap();

        let expected = renderer.mirror_state().projection_matrix(DepthConvention::ZeroToOne);
        assert_eq!(renderer.mirror_state().field_of_view, 1.2);
        assert_eq!(reflection.view.projection().row(0), expected.row(0));
        assert_eq!(reflection.view.projection().row(1), expected.row(1));
        assert_eq!(reflection.view.projection().row(3), expected.row(3));
    }

    #[test]
    fn test_lost_primary_camera_stops_reflection() {
        let (mut host, camera) = scene();
        let mut renderer = ReflectionRenderer::new(ReflectionOptions::default()).unwrap();
        renderer.enable(&mut host).unwrap();
        let task = renderer.reflection_task().unwrap();
        host.release_camera(camera);

        renderer.update(&mut host);
        let submissions = host.render_frame(&mut renderer, DT);
        assert!(renderer.is_primary_lost());
        assert!(!host.task(task).unwrap().enabled);
        // The flection task renders from the missing camera and is skipped
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].task, task);
        assert_eq!(renderer.reflection_stats().last_clipped, Some(true));

        renderer.update(&mut host);
        assert!(!host.task(task).unwrap().enabled);
        assert!(host.render_frame(&mut renderer, DT).is_empty());

        renderer.disable(&mut host);
        assert!(!renderer.is_primary_lost());
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = ReflectionOptions {
            update_frequency: -1.0,
            ..ReflectionOptions::default()
        };
        assert!(matches!(
            ReflectionRenderer::new(options),
            Err(RenderError::Core(_))
        ));
    }
}
