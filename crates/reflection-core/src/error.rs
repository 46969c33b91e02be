//! Error types for reflection-core.

use thiserror::Error;

/// The main error type for reflection-core operations.
#[derive(Error, Debug)]
pub enum ReflectionError {
    /// The view-space clip plane is (numerically) parallel to the view ray
    /// through the selected clip-space corner.
    ///
    /// Callers recover by keeping the unmodified projection for the frame.
    #[error("degenerate clip plane (denominator {denom:e})")]
    DegenerateClipPlane { denom: f32 },

    /// A configuration value is out of range.
    #[error("invalid option '{name}': {reason}")]
    InvalidOption { name: &'static str, reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ReflectionError {
    /// Returns whether this error only degrades a single frame.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::DegenerateClipPlane { .. })
    }
}

/// A specialized Result type for reflection-core operations.
pub type Result<T> = std::result::Result<T, ReflectionError>;
