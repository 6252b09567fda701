//! Error types for the Lumina path tracer.

use std::path::PathBuf;
use thiserror::Error;

use crate::scene::{MaterialId, SphereId};

/// Main error type for Lumina operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Acceleration backend could not be created; fatal at startup
    #[error("Failed to initialize acceleration backend: {0}")]
    BackendInit(String),

    /// Backend name not recognized
    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    /// Sphere id does not refer to a live sphere
    #[error("Sphere not found: {0}")]
    SphereNotFound(SphereId),

    /// Material id does not refer to a material in the library
    #[error("Material not found: {0}")]
    MaterialNotFound(MaterialId),

    /// Sphere parameters are not usable (non-finite center, non-positive radius)
    #[error("Invalid sphere: center {center:?}, radius {radius}")]
    InvalidSphere { center: [f32; 3], radius: f32 },

    /// Parenting would create a cycle
    #[error("Setting parent of {child} to {parent} would create a cycle")]
    HierarchyCycle { child: SphereId, parent: SphereId },

    /// Image dimensions are zero
    #[error("Invalid resolution: {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    /// Camera would produce degenerate rays
    #[error("Invalid camera: {0}")]
    InvalidCamera(String),

    /// Environment map data does not match its declared size
    #[error("Invalid environment map: {0}")]
    InvalidEnvironment(String),

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Image decoding/encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Settings (de)serialization error
    #[error("Settings JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a backend initialization error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::BackendInit(msg.into())
    }

    /// Whether the error is an invalid-parameter report that left all state untouched.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Self::SphereNotFound(_)
                | Self::MaterialNotFound(_)
                | Self::InvalidSphere { .. }
                | Self::HierarchyCycle { .. }
                | Self::InvalidResolution { .. }
                | Self::InvalidCamera(_)
                | Self::UnknownBackend(_)
        )
    }
}

/// Result type alias for Lumina operations.
pub type Result<T> = std::result::Result<T, Error>;
