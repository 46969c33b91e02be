//! Render-pass plumbing for planar reflections.
//!
//! This crate connects the math in `reflection-core` to a host renderer:
//! - [`RenderHost`] and [`PreRenderHandler`], the engine adapter seam
//! - [`ReflectionRenderer`], the pass controller state machine
//! - [`HeadlessHost`] with [`CpuTargets`] or wgpu-backed [`GpuTargets`]

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]

pub mod controller;
pub mod error;
pub mod gpu;
pub mod headless;
pub mod host;
pub mod pass;
pub mod target;

pub use controller::{ReflectionRenderer, ReflectionState};
pub use error::{RenderError, RenderResult};
pub use gpu::{GpuTarget, GpuTargets, ViewUniforms};
pub use headless::{CpuTargets, FailurePlan, HeadlessHost, Submission, TargetAllocator, TaskRecord};
pub use host::{
    CameraHandle, FrameInfo, HookId, MaterialHandle, PreRenderHandler, RenderHost,
    RenderTaskDescriptor, RenderViewState, TargetHandle, TaskHandle,
};
pub use pass::{PassKind, PassStats, PlanePass, FLECTION_ORDER, REFLECTION_ORDER};
pub use target::{
    scaled_extent, texture_format, RenderTarget, TargetDescriptor, FALLBACK_RESOLUTION,
    TARGET_USAGE,
};
