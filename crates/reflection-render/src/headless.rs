//! In-memory render host.
//!
//! [`HeadlessHost`] keeps cameras, tasks, hooks and material bindings in
//! plain maps and delegates target storage to a [`TargetAllocator`]. It
//! runs without a window, which makes it suitable for tests and for engines
//! that only need the computed matrices.

use std::collections::{BTreeMap, HashMap};

use glam::UVec2;
use reflection_core::{CameraState, DepthConvention};

use crate::error::{RenderError, RenderResult};
use crate::host::{
    CameraHandle, FrameInfo, HookId, MaterialHandle, PreRenderHandler, RenderHost,
    RenderTaskDescriptor, RenderViewState, TargetHandle, TaskHandle,
};
use crate::target::TargetDescriptor;

/// Storage backend for offscreen targets.
pub trait TargetAllocator {
    /// Allocates storage for a new target.
    fn allocate(&mut self, handle: TargetHandle, desc: &TargetDescriptor) -> RenderResult<()>;

    /// Replaces the storage of an existing target.
    fn reallocate(&mut self, handle: TargetHandle, desc: &TargetDescriptor) -> RenderResult<()> {
        self.release(handle);
        self.allocate(handle, desc)
    }

    /// Frees the storage of a target.
    fn release(&mut self, handle: TargetHandle);

    /// Receives the matrices a task rendered into `handle` with.
    fn write_view(&mut self, _handle: TargetHandle, _view: &RenderViewState) {}
}

/// Target storage that only records descriptors.
#[derive(Debug, Default)]
pub struct CpuTargets {
    targets: HashMap<TargetHandle, TargetDescriptor>,
    views: HashMap<TargetHandle, RenderViewState>,
}

impl CpuTargets {
    /// Creates empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the descriptor a target was last allocated with.
    pub fn get(&self, handle: TargetHandle) -> Option<&TargetDescriptor> {
        self.targets.get(&handle)
    }

    /// Returns the last view written to a target.
    pub fn last_view(&self, handle: TargetHandle) -> Option<&RenderViewState> {
        self.views.get(&handle)
    }

    /// Returns the number of live targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns whether no target is live.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl TargetAllocator for CpuTargets {
    fn allocate(&mut self, handle: TargetHandle, desc: &TargetDescriptor) -> RenderResult<()> {
        self.targets.insert(handle, desc.clone());
        Ok(())
    }

    fn release(&mut self, handle: TargetHandle) {
        self.targets.remove(&handle);
        self.views.remove(&handle);
    }

    fn write_view(&mut self, handle: TargetHandle, view: &RenderViewState) {
        self.views.insert(handle, *view);
    }
}

/// A render task known to a [`HeadlessHost`].
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRecord {
    /// Creation parameters.
    pub descriptor: RenderTaskDescriptor,
    /// Whether the task renders on the next frame.
    pub enabled: bool,
    /// Pre-render subscription, if any.
    pub hook: Option<HookId>,
}

/// One task rendered during [`HeadlessHost::render_frame`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submission {
    /// Frame counter.
    pub frame: u64,
    /// The task that rendered.
    pub task: TaskHandle,
    /// The target it rendered into.
    pub output: TargetHandle,
    /// The view and projection it rendered with.
    pub view: RenderViewState,
}

/// Simulated resource failures, for exercising error paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FailurePlan {
    /// Fail the target creation after this many successes.
    pub targets_after: Option<usize>,
    /// Fail the task creation after this many successes.
    pub tasks_after: Option<usize>,
    /// Fail every camera creation.
    pub cameras: bool,
    /// Fail every material binding.
    pub bindings: bool,
}

/// A render host without a window.
#[derive(Debug)]
pub struct HeadlessHost<A: TargetAllocator = CpuTargets> {
    allocator: A,
    next_id: u64,
    frame: u64,
    viewport: Option<UVec2>,
    convention: DepthConvention,
    default_camera: Option<CameraHandle>,
    cameras: BTreeMap<CameraHandle, CameraState>,
    targets: BTreeMap<TargetHandle, TargetDescriptor>,
    tasks: BTreeMap<TaskHandle, TaskRecord>,
    hooks: HashMap<HookId, TaskHandle>,
    bindings: HashMap<(MaterialHandle, String), TargetHandle>,
    failures: FailurePlan,
}

impl HeadlessHost<CpuTargets> {
    /// Creates a host backed by [`CpuTargets`].
    pub fn new() -> Self {
        Self::with_allocator(CpuTargets::new())
    }
}

impl Default for HeadlessHost<CpuTargets> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: TargetAllocator> HeadlessHost<A> {
    /// Creates a host on top of `allocator`.
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            next_id: 1,
            frame: 0,
            viewport: None,
            convention: DepthConvention::default(),
            default_camera: None,
            cameras: BTreeMap::new(),
            targets: BTreeMap::new(),
            tasks: BTreeMap::new(),
            hooks: HashMap::new(),
            bindings: HashMap::new(),
            failures: FailurePlan::default(),
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Returns the target storage.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Returns the target storage mutably.
    pub fn allocator_mut(&mut self) -> &mut A {
        &mut self.allocator
    }

    /// Sets the viewport size reported to passes.
    pub fn set_viewport(&mut self, size: Option<UVec2>) {
        self.viewport = size;
    }

    /// Sets the depth convention of the symmetric projections the host builds.
    pub fn set_depth_convention(&mut self, convention: DepthConvention) {
        self.convention = convention;
    }

    /// Plans simulated failures.
    pub fn set_failures(&mut self, failures: FailurePlan) {
        self.failures = failures;
    }

    /// Adds a scene camera. The first camera added becomes the default.
    pub fn add_camera(&mut self, state: CameraState) -> CameraHandle {
        let handle = CameraHandle(self.next_id());
        self.cameras.insert(handle, state);
        self.default_camera.get_or_insert(handle);
        handle
    }

    /// Overrides the default camera.
    pub fn set_default_camera(&mut self, camera: Option<CameraHandle>) {
        self.default_camera = camera;
    }

    /// Returns a camera mutably, e.g. to move it between frames.
    pub fn camera_mut(&mut self, camera: CameraHandle) -> Option<&mut CameraState> {
        self.cameras.get_mut(&camera)
    }

    /// Creates a material that textures can be bound to.
    pub fn create_material(&mut self) -> MaterialHandle {
        MaterialHandle(self.next_id())
    }

    /// Returns the target bound to `param` on `material`.
    pub fn binding(&self, material: MaterialHandle, param: &str) -> Option<TargetHandle> {
        self.bindings.get(&(material, param.to_string())).copied()
    }

    /// Returns a live target.
    pub fn target(&self, target: TargetHandle) -> Option<&TargetDescriptor> {
        self.targets.get(&target)
    }

    /// Returns a live task.
    pub fn task(&self, task: TaskHandle) -> Option<&TaskRecord> {
        self.tasks.get(&task)
    }

    /// Returns the number of live cameras.
    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    /// Returns the number of live targets.
    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Returns the number of live tasks.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns the number of live pre-render subscriptions.
    pub fn hook_count(&self) -> usize {
        self.hooks.len()
    }

    /// Returns the number of frames rendered so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Renders one frame.
    ///
    /// Enabled tasks run in ascending order. Each task's view state is built
    /// from its camera, handed to `handler` when the task has a pre-render
    /// subscription, and then recorded.
    pub fn render_frame(
        &mut self,
        handler: &mut dyn PreRenderHandler,
        delta_time: f32,
    ) -> Vec<Submission> {
        self.frame += 1;
        let info = FrameInfo {
            frame: self.frame,
            delta_time,
        };

        let mut queue: Vec<(i32, TaskHandle)> = self
            .tasks
            .iter()
            .filter(|(_, record)| record.enabled)
            .map(|(handle, record)| (record.descriptor.order, *handle))
            .collect();
        queue.sort_unstable();

        let mut submissions = Vec::with_capacity(queue.len());
        for (_, task) in queue {
            let Some(record) = self.tasks.get(&task) else {
                continue;
            };
            let (camera, output, hooked) = (
                record.descriptor.camera,
                record.descriptor.output,
                record.hook.is_some(),
            );
            let Some(state) = self.cameras.get(&camera) else {
                log::warn!("task {} renders from a missing camera", task.id());
                continue;
            };
            let mut view = RenderViewState::new(
                state.view_matrix(),
                state.projection_matrix(self.convention),
            );

            if hooked {
                handler.pre_render(self, task, &info, &mut view);
            }
            if !self.targets.contains_key(&output) {
                continue;
            }
            self.allocator.write_view(output, &view);
            submissions.push(Submission {
                frame: info.frame,
                task,
                output,
                view,
            });
        }
        log::trace!("frame {} rendered {} tasks", info.frame, submissions.len());
        submissions
    }
}

fn unknown(kind: &'static str, id: u64) -> RenderError {
    RenderError::UnknownHandle { kind, id }
}

fn exhausted(budget: &mut Option<usize>) -> bool {
    match budget {
        Some(0) => true,
        Some(remaining) => {
            *remaining -= 1;
            false
        }
        None => false,
    }
}

impl<A: TargetAllocator> RenderHost for HeadlessHost<A> {
    fn viewport_size(&self) -> Option<UVec2> {
        self.viewport
    }

    fn default_camera(&self) -> Option<CameraHandle> {
        self.default_camera
            .filter(|camera| self.cameras.contains_key(camera))
    }

    fn camera_state(&self, camera: CameraHandle) -> Option<CameraState> {
        self.cameras.get(&camera).copied()
    }

    fn create_camera(&mut self, state: &CameraState) -> RenderResult<CameraHandle> {
        if self.failures.cameras {
            return Err(RenderError::CameraCreationFailed(
                "camera pool exhausted".to_string(),
            ));
        }
        let handle = CameraHandle(self.next_id());
        self.cameras.insert(handle, *state);
        Ok(handle)
    }

    fn update_camera(&mut self, camera: CameraHandle, state: &CameraState) -> RenderResult<()> {
        let slot = self
            .cameras
            .get_mut(&camera)
            .ok_or_else(|| unknown("camera", camera.id()))?;
        *slot = *state;
        Ok(())
    }

    fn release_camera(&mut self, camera: CameraHandle) {
        self.cameras.remove(&camera);
    }

    fn create_offscreen_target(&mut self, desc: &TargetDescriptor) -> RenderResult<TargetHandle> {
        if exhausted(&mut self.failures.targets_after) {
            return Err(RenderError::TargetCreationFailed(format!(
                "out of memory for {}x{} target",
                desc.width, desc.height
            )));
        }
        let handle = TargetHandle(self.next_id());
        self.allocator.allocate(handle, desc)?;
        self.targets.insert(handle, desc.clone());
        Ok(handle)
    }

    fn resize_offscreen_target(
        &mut self,
        target: TargetHandle,
        desc: &TargetDescriptor,
    ) -> RenderResult<()> {
        if !self.targets.contains_key(&target) {
            return Err(unknown("target", target.id()));
        }
        self.allocator.reallocate(target, desc)?;
        self.targets.insert(target, desc.clone());
        Ok(())
    }

    fn release_offscreen_target(&mut self, target: TargetHandle) {
        if self.targets.remove(&target).is_some() {
            self.allocator.release(target);
        }
        self.bindings.retain(|_, bound| *bound != target);
    }

    fn create_render_task(&mut self, desc: &RenderTaskDescriptor) -> RenderResult<TaskHandle> {
        if exhausted(&mut self.failures.tasks_after) {
            return Err(RenderError::TaskCreationFailed(format!(
                "cannot schedule '{}'",
                desc.label
            )));
        }
        if !self.targets.contains_key(&desc.output) {
            return Err(unknown("target", desc.output.id()));
        }
        if !self.cameras.contains_key(&desc.camera) {
            return Err(unknown("camera", desc.camera.id()));
        }
        let handle = TaskHandle(self.next_id());
        self.tasks.insert(
            handle,
            TaskRecord {
                descriptor: desc.clone(),
                enabled: false,
                hook: None,
            },
        );
        Ok(handle)
    }

    fn set_task_enabled(&mut self, task: TaskHandle, enabled: bool) {
        if let Some(record) = self.tasks.get_mut(&task) {
            record.enabled = enabled;
        }
    }

    fn release_render_task(&mut self, task: TaskHandle) {
        if let Some(record) = self.tasks.remove(&task) {
            if let Some(hook) = record.hook {
                self.hooks.remove(&hook);
            }
        }
    }

    fn subscribe_pre_render(&mut self, task: TaskHandle) -> RenderResult<HookId> {
        if !self.tasks.contains_key(&task) {
            return Err(unknown("task", task.id()));
        }
        let hook = HookId(self.next_id());
        if let Some(record) = self.tasks.get_mut(&task) {
            record.hook = Some(hook);
        }
        self.hooks.insert(hook, task);
        Ok(hook)
    }

    fn unsubscribe_pre_render(&mut self, hook: HookId) {
        if let Some(task) = self.hooks.remove(&hook) {
            if let Some(record) = self.tasks.get_mut(&task) {
                record.hook = None;
            }
        }
    }

    fn bind_material_texture(
        &mut self,
        material: MaterialHandle,
        param: &str,
        target: TargetHandle,
    ) -> RenderResult<()> {
        if self.failures.bindings {
            return Err(RenderError::MaterialBindingFailed {
                param: param.to_string(),
                reason: "material is read-only".to_string(),
            });
        }
        if !self.targets.contains_key(&target) {
            return Err(unknown("target", target.id()));
        }
        self.bindings.insert((material, param.to_string()), target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};
    use reflection_core::{CameraTransform, ViewFlags};

    struct Recorder {
        calls: Vec<TaskHandle>,
    }

    impl PreRenderHandler for Recorder {
        fn pre_render(
            &mut self,
            _host: &mut dyn RenderHost,
            task: TaskHandle,
            _frame: &FrameInfo,
            view: &mut RenderViewState,
        ) {
            self.calls.push(task);
            view.set_up(Mat4::IDENTITY, Mat4::IDENTITY);
        }
    }

    fn camera() -> CameraState {
        CameraState::new(
            CameraTransform::looking_at(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y).unwrap(),
            1.0,
        )
    }

    fn task(host: &mut HeadlessHost, camera: CameraHandle, order: i32) -> TaskHandle {
        let output = host
            .create_offscreen_target(&TargetDescriptor::new(
                "target",
                UVec2::new(8, 8),
                wgpu::TextureFormat::Rgba8Unorm,
            ))
            .unwrap();
        host.create_render_task(&RenderTaskDescriptor {
            label: format!("order {order}"),
            output,
            camera,
            order,
            view_flags: ViewFlags::all(),
        })
        .unwrap()
    }

    #[test]
    fn test_first_camera_is_default() {
        let mut host = HeadlessHost::new();
        assert!(host.default_camera().is_none());
        let first = host.add_camera(camera());
        let _second = host.add_camera(camera());
        assert_eq!(host.default_camera(), Some(first));
    }

    #[test]
    fn test_tasks_start_disabled() {
        let mut host = HeadlessHost::new();
        let cam = host.add_camera(camera());
        let t = task(&mut host, cam, 0);
        assert!(!host.task(t).unwrap().enabled);

        let mut recorder = Recorder { calls: Vec::new() };
        assert!(host.render_frame(&mut recorder, 0.016).is_empty());
    }

    #[test]
    fn test_render_frame_runs_in_order_and_calls_hooks() {
        let mut host = HeadlessHost::new();
        let cam = host.add_camera(camera());
        let late = task(&mut host, cam, -99);
        let early = task(&mut host, cam, -100);
        let unhooked = task(&mut host, cam, 0);
        for t in [late, early, unhooked] {
            host.set_task_enabled(t, true);
        }
        host.subscribe_pre_render(late).unwrap();
        host.subscribe_pre_render(early).unwrap();

        let mut recorder = Recorder { calls: Vec::new() };
        let submissions = host.render_frame(&mut recorder, 0.016);

        let order: Vec<TaskHandle> = submissions.iter().map(|s| s.task).collect();
        assert_eq!(order, vec![early, late, unhooked]);
        assert_eq!(recorder.calls, vec![early, late]);

        // Hooked tasks render with what the handler installed
        assert_eq!(submissions[0].view.projection(), Mat4::IDENTITY);
        assert_ne!(submissions[2].view.projection(), Mat4::IDENTITY);
        assert_eq!(submissions[0].frame, 1);
        assert_eq!(
            host.allocator().last_view(submissions[0].output),
            Some(&submissions[0].view)
        );
    }

    #[test]
    fn test_release_task_drops_hook() {
        let mut host = HeadlessHost::new();
        let cam = host.add_camera(camera());
        let t = task(&mut host, cam, 0);
        host.subscribe_pre_render(t).unwrap();
        assert_eq!(host.hook_count(), 1);

        host.release_render_task(t);
        assert_eq!(host.hook_count(), 0);
        assert_eq!(host.task_count(), 0);
    }

    #[test]
    fn test_release_target_unbinds_materials() {
        let mut host = HeadlessHost::new();
        let material = host.create_material();
        let desc = TargetDescriptor::new("t", UVec2::new(4, 4), wgpu::TextureFormat::Rgba8Unorm);
        let target = host.create_offscreen_target(&desc).unwrap();
        host.bind_material_texture(material, "MainTex", target).unwrap();
        assert_eq!(host.binding(material, "MainTex"), Some(target));

        host.release_offscreen_target(target);
        assert_eq!(host.binding(material, "MainTex"), None);
        assert!(host.allocator().is_empty());
    }

    #[test]
    fn test_failure_plan() {
        let mut host = HeadlessHost::new();
        host.set_failures(FailurePlan {
            targets_after: Some(1),
            ..FailurePlan::default()
        });
        let desc = TargetDescriptor::new("t", UVec2::ONE, wgpu::TextureFormat::Rgba8Unorm);
        assert!(host.create_offscreen_target(&desc).is_ok());
        assert!(matches!(
            host.create_offscreen_target(&desc),
            Err(RenderError::TargetCreationFailed(_))
        ));
    }

    #[test]
    fn test_unknown_handles() {
        let mut host = HeadlessHost::new();
        assert!(matches!(
            host.update_camera(CameraHandle(42), &camera()),
            Err(RenderError::UnknownHandle { kind: "camera", id: 42 })
        ));
        assert!(host.subscribe_pre_render(TaskHandle(7)).is_err());
    }
}
