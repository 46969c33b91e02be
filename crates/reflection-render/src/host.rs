//! Interface to the host rendering engine.
//!
//! The reflection passes never touch GPU objects directly. They ask the host
//! for offscreen targets, cameras and render tasks through [`RenderHost`],
//! and the host calls back into a [`PreRenderHandler`] right before it
//! submits the draw calls of a task that has a pre-render hook.

use glam::{Mat4, UVec2};
use reflection_core::{CameraState, ViewFlags};

use crate::error::RenderResult;
use crate::target::TargetDescriptor;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            /// Returns the raw id.
            pub fn id(self) -> u64 {
                self.0
            }
        }
    };
}

handle!(
    /// Host-side offscreen color target.
    TargetHandle
);
handle!(
    /// Host-side camera object.
    CameraHandle
);
handle!(
    /// Host-side render task.
    TaskHandle
);
handle!(
    /// Host-side material instance.
    MaterialHandle
);
handle!(
    /// A pre-render hook subscription.
    HookId
);

/// Parameters of a render task.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTaskDescriptor {
    /// Debug label.
    pub label: String,
    /// Target the task renders into.
    pub output: TargetHandle,
    /// Camera the task renders from.
    pub camera: CameraHandle,
    /// Tasks with a lower order render first.
    pub order: i32,
    /// Scene features the task draws.
    pub view_flags: ViewFlags,
}

/// The view and projection a task is about to render with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderViewState {
    view: Mat4,
    projection: Mat4,
}

impl RenderViewState {
    /// Creates the view state the host derived from the task camera.
    pub fn new(view: Mat4, projection: Mat4) -> Self {
        Self { view, projection }
    }

    /// Returns the world-to-view matrix.
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Returns the projection matrix.
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Returns `projection * view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Replaces both matrices for the current task.
    pub fn set_up(&mut self, view: Mat4, projection: Mat4) {
        self.view = view;
        self.projection = projection;
    }
}

/// Per-frame timing supplied by the host.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameInfo {
    /// Monotonically increasing frame counter.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta_time: f32,
}

/// The host engine operations the reflection passes rely on.
pub trait RenderHost {
    /// Returns the size of the main viewport, if known.
    fn viewport_size(&self) -> Option<UVec2>;

    /// Returns the scene's default camera, if any.
    fn default_camera(&self) -> Option<CameraHandle>;

    /// Returns the current state of a camera.
    fn camera_state(&self, camera: CameraHandle) -> Option<CameraState>;

    /// Creates a camera.
    fn create_camera(&mut self, state: &CameraState) -> RenderResult<CameraHandle>;

    /// Overwrites the state of a camera.
    fn update_camera(&mut self, camera: CameraHandle, state: &CameraState) -> RenderResult<()>;

    /// Destroys a camera.
    fn release_camera(&mut self, camera: CameraHandle);

    /// Creates an offscreen color target.
    fn create_offscreen_target(&mut self, desc: &TargetDescriptor) -> RenderResult<TargetHandle>;

    /// Reallocates a target in place; the handle stays valid.
    fn resize_offscreen_target(
        &mut self,
        target: TargetHandle,
        desc: &TargetDescriptor,
    ) -> RenderResult<()>;

    /// Destroys a target.
    fn release_offscreen_target(&mut self, target: TargetHandle);

    /// Creates a render task. New tasks start disabled.
    fn create_render_task(&mut self, desc: &RenderTaskDescriptor) -> RenderResult<TaskHandle>;

    /// Enables or disables a task for the coming frame.
    fn set_task_enabled(&mut self, task: TaskHandle, enabled: bool);

    /// Destroys a task.
    fn release_render_task(&mut self, task: TaskHandle);

    /// Requests a [`PreRenderHandler`] call before `task` renders.
    fn subscribe_pre_render(&mut self, task: TaskHandle) -> RenderResult<HookId>;

    /// Cancels a pre-render subscription.
    fn unsubscribe_pre_render(&mut self, hook: HookId);

    /// Publishes a target under a material texture parameter.
    fn bind_material_texture(
        &mut self,
        material: MaterialHandle,
        param: &str,
        target: TargetHandle,
    ) -> RenderResult<()>;
}

/// Receives pre-render callbacks for subscribed tasks.
pub trait PreRenderHandler {
    /// Called after the host set up `view` from the task camera and before it
    /// submits the task's draw calls.
    fn pre_render(
        &mut self,
        host: &mut dyn RenderHost,
        task: TaskHandle,
        frame: &FrameInfo,
        view: &mut RenderViewState,
    );
}
