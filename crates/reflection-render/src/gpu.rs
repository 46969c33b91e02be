//! GPU-backed target storage.

use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};

use crate::error::{RenderError, RenderResult};
use crate::headless::TargetAllocator;
use crate::host::{RenderViewState, TargetHandle};
use crate::target::TargetDescriptor;

/// GPU representation of the matrices a pass renders with.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable, PartialEq)]
pub struct ViewUniforms {
    /// World-to-view matrix.
    pub view: [[f32; 4]; 4],
    /// Projection matrix, oblique when clipping applies.
    pub projection: [[f32; 4]; 4],
    /// `projection * view`.
    pub view_projection: [[f32; 4]; 4],
}

impl Default for ViewUniforms {
    fn default() -> Self {
        Self::from(&RenderViewState::new(
            glam::Mat4::IDENTITY,
            glam::Mat4::IDENTITY,
        ))
    }
}

impl From<&RenderViewState> for ViewUniforms {
    fn from(state: &RenderViewState) -> Self {
        Self {
            view: state.view().to_cols_array_2d(),
            projection: state.projection().to_cols_array_2d(),
            view_projection: state.view_projection().to_cols_array_2d(),
        }
    }
}

/// A target's texture, its default view and its uniform buffer.
pub struct GpuTarget {
    /// Color texture the pass renders into.
    pub texture: wgpu::Texture,
    /// Default view of `texture`, for binding to materials.
    pub view: wgpu::TextureView,
    /// [`ViewUniforms`] for the pass.
    pub uniforms: wgpu::Buffer,
}

/// Target storage on a wgpu device.
pub struct GpuTargets {
    device: wgpu::Device,
    queue: wgpu::Queue,
    targets: HashMap<TargetHandle, GpuTarget>,
}

impl GpuTargets {
    /// Creates storage on an existing device.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            targets: HashMap::new(),
        }
    }

    /// Creates storage on a new device without a surface.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..wgpu::InstanceDescriptor::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::LowPower,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderError::AdapterCreationFailed)?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("reflection device (headless)"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
            })
            .await?;

        log::info!("reflection targets on {}", adapter.get_info().name);
        Ok(Self::new(device, queue))
    }

    /// Returns the device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns the queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns a live target.
    pub fn get(&self, handle: TargetHandle) -> Option<&GpuTarget> {
        self.targets.get(&handle)
    }

    /// Returns the number of live targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns whether no target is live.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn create_target(&self, desc: &TargetDescriptor) -> GpuTarget {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: desc.extent(),
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: desc.usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let uniforms = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("reflection view uniforms"),
            size: std::mem::size_of::<ViewUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        self.queue.write_buffer(
            &uniforms,
            0,
            bytemuck::cast_slice(&[ViewUniforms::default()]),
        );

        GpuTarget {
            texture,
            view,
            uniforms,
        }
    }
}

impl TargetAllocator for GpuTargets {
    fn allocate(&mut self, handle: TargetHandle, desc: &TargetDescriptor) -> RenderResult<()> {
        if desc.width > self.device.limits().max_texture_dimension_2d
            || desc.height > self.device.limits().max_texture_dimension_2d
        {
            return Err(RenderError::TargetCreationFailed(format!(
                "{}x{} exceeds the device texture limit",
                desc.width, desc.height
            )));
        }
        let target = self.create_target(desc);
        if let Some(old) = self.targets.insert(handle, target) {
            old.texture.destroy();
        }
        Ok(())
    }

    fn release(&mut self, handle: TargetHandle) {
        if let Some(target) = self.targets.remove(&handle) {
            target.texture.destroy();
        }
    }

    fn write_view(&mut self, handle: TargetHandle, view: &RenderViewState) {
        if let Some(target) = self.targets.get(&handle) {
            self.queue.write_buffer(
                &target.uniforms,
                0,
                bytemuck::cast_slice(&[ViewUniforms::from(view)]),
            );
        }
    }
}
