//! Error handling module for Holmes VM setup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Step-level failures never surface as these errors: the runner contains them.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the setup engine
#[derive(Error, Debug)]
pub enum HolmesError {
    /// IO errors (file operations, process spawning, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tool manifest does not exist
    #[error("Tool manifest not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    /// Tool manifest is not valid JSON or has the wrong shape
    #[error("Failed to parse tool manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// Configuration errors (paths, options)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Manifest validation reported errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Wrong platform or missing privileges
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, HolmesError>;

// Convenient error constructors
impl HolmesError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a platform error
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    /// True when the manifest file was simply absent
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ConfigNotFound { .. })
    }
}
