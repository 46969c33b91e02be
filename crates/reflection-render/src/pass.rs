//! A single clip-plane render pass.
//!
//! The reflection and flection passes differ only in which camera they
//! render from, which plane they clip against, and where their texture is
//! published. Everything else lives here: owning the target, task and hook,
//! and installing the oblique projection in the pre-render callback.

use std::fmt;

use glam::{Mat4, UVec2};
use reflection_core::{DepthConvention, ObliqueProjection, Plane, ViewFlags};

use crate::error::RenderResult;
use crate::host::{
    CameraHandle, HookId, MaterialHandle, RenderHost, RenderTaskDescriptor, RenderViewState,
    TaskHandle,
};
use crate::target::{RenderTarget, TargetDescriptor};

/// Render order of the reflection task. Lower renders first.
pub const REFLECTION_ORDER: i32 = -100;

/// Render order of the flection task.
pub const FLECTION_ORDER: i32 = -99;

/// Which pass a [`PlanePass`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Renders from the mirrored camera.
    Reflection,
    /// Renders from the primary camera against the offset plane.
    Flection,
}

impl PassKind {
    /// Returns the default render order of the pass.
    pub fn order(self) -> i32 {
        match self {
            Self::Reflection => REFLECTION_ORDER,
            Self::Flection => FLECTION_ORDER,
        }
    }

    /// Returns display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Reflection => "reflection",
            Self::Flection => "flection",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Counters collected by a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassStats {
    /// Pre-render callbacks served.
    pub rendered_frames: u64,
    /// Callbacks that fell back to the symmetric projection.
    pub degenerate_frames: u64,
    /// Whether the most recent callback installed an oblique projection.
    pub last_clipped: Option<bool>,
}

/// Host resources and per-frame math of one pass.
#[derive(Debug)]
pub struct PlanePass {
    kind: PassKind,
    convention: DepthConvention,
    view_flags: ViewFlags,
    param_name: String,
    target: Option<RenderTarget>,
    task: Option<TaskHandle>,
    hook: Option<HookId>,
    stats: PassStats,
}

impl PlanePass {
    /// Creates an unallocated pass.
    pub fn new(
        kind: PassKind,
        convention: DepthConvention,
        view_flags: ViewFlags,
        param_name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            convention,
            view_flags,
            param_name: param_name.into(),
            target: None,
            task: None,
            hook: None,
            stats: PassStats::default(),
        }
    }

    /// Returns the depth convention the oblique projection targets.
    pub fn convention(&self) -> DepthConvention {
        self.convention
    }

    /// Returns the material parameter the target is published under.
    pub fn param_name(&self) -> &str {
        &self.param_name
    }

    /// Returns the live target, if allocated.
    pub fn target(&self) -> Option<&RenderTarget> {
        self.target.as_ref()
    }

    /// Returns the live task, if allocated.
    pub fn task(&self) -> Option<TaskHandle> {
        self.task
    }

    /// Returns the counters.
    pub fn stats(&self) -> PassStats {
        self.stats
    }

    /// Returns whether `task` belongs to this pass.
    pub fn owns(&self, task: TaskHandle) -> bool {
        self.task == Some(task)
    }

    /// Creates the target, the task rendering into it, and the pre-render hook.
    ///
    /// Resources created before a failure stay owned by the pass so that
    /// [`PlanePass::release`] can free them.
    pub fn allocate<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        desc: &TargetDescriptor,
        camera: CameraHandle,
    ) -> RenderResult<()> {
        let handle = host.create_offscreen_target(desc)?;
        self.target = Some(RenderTarget {
            handle,
            descriptor: desc.clone(),
        });

        let task = host.create_render_task(&RenderTaskDescriptor {
            label: format!("{} task", self.kind),
            output: handle,
            camera,
            order: self.kind.order(),
            view_flags: self.view_flags,
        })?;
        self.task = Some(task);

        self.hook = Some(host.subscribe_pre_render(task)?);
        log::debug!(
            "{} pass allocated {}x{} target",
            self.kind,
            desc.width,
            desc.height
        );
        Ok(())
    }

    /// Frees everything the pass owns. Safe to call on a partial allocation.
    pub fn release<H: RenderHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(hook) = self.hook.take() {
            host.unsubscribe_pre_render(hook);
        }
        if let Some(task) = self.task.take() {
            host.release_render_task(task);
        }
        if let Some(target) = self.target.take() {
            host.release_offscreen_target(target.handle);
        }
    }

    /// Reallocates the target at `size`, keeping its format and handle.
    pub fn resize<H: RenderHost + ?Sized>(
        &mut self,
        host: &mut H,
        size: UVec2,
    ) -> RenderResult<()> {
        let Some(target) = self.target.as_mut() else {
            return Ok(());
        };
        if target.descriptor.size() == size {
            return Ok(());
        }
        let desc = target.descriptor.with_size(size);
        host.resize_offscreen_target(target.handle, &desc)?;
        log::debug!("{} target resized to {}x{}", self.kind, desc.width, desc.height);
        target.descriptor = desc;
        Ok(())
    }

    /// Enables or disables the task for the coming frame.
    pub fn set_enabled<H: RenderHost + ?Sized>(&self, host: &mut H, enabled: bool) {
        if let Some(task) = self.task {
            host.set_task_enabled(task, enabled);
        }
    }

    /// Publishes the target under the pass's material parameter.
    pub fn bind<H: RenderHost + ?Sized>(
        &self,
        host: &mut H,
        material: MaterialHandle,
    ) -> RenderResult<()> {
        if let Some(target) = &self.target {
            host.bind_material_texture(material, &self.param_name, target.handle)?;
        }
        Ok(())
    }

    /// Installs `view` and `symmetric` made oblique against `plane`.
    ///
    /// A degenerate plane installs `symmetric` unchanged.
    pub fn install(
        &mut self,
        state: &mut RenderViewState,
        view: Mat4,
        symmetric: Mat4,
        plane: &Plane,
    ) -> ObliqueProjection {
        let view_plane = plane.transformed(view);
        let projection = ObliqueProjection::build(symmetric, view_plane, self.convention);
        state.set_up(view, projection.matrix);

        self.stats.rendered_frames += 1;
        if !projection.clipped {
            self.stats.degenerate_frames += 1;
        }
        self.stats.last_clipped = Some(projection.clipped);
        projection
    }
}
