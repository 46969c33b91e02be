//! Rendering error types.

use reflection_core::ReflectionError;
use thiserror::Error;

/// Errors that can occur while driving the reflection passes.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Neither an explicit primary camera nor a host default camera exists.
    #[error("no primary camera available for the reflection passes")]
    MissingCamera,

    /// The host failed to create an offscreen target.
    #[error("offscreen target creation failed: {0}")]
    TargetCreationFailed(String),

    /// The host failed to create a camera.
    #[error("camera creation failed: {0}")]
    CameraCreationFailed(String),

    /// The host failed to create a render task or its hook.
    #[error("render task creation failed: {0}")]
    TaskCreationFailed(String),

    /// The host failed to bind a texture to a material parameter.
    #[error("binding '{param}' failed: {reason}")]
    MaterialBindingFailed { param: String, reason: String },

    /// A handle does not refer to a live host object.
    #[error("unknown {kind} handle {id}")]
    UnknownHandle { kind: &'static str, id: u64 },

    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Configuration or math error from the core crate.
    #[error(transparent)]
    Core(#[from] ReflectionError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;
