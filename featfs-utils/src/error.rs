//! Error types for featfs
//!
//! Provides a unified error type used across all featfs crates.

use std::path::PathBuf;

/// Main error type for featfs operations
#[derive(Debug, thiserror::Error)]
pub enum FeatfsError {
    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Namespace Errors ===

    #[error("No such entry: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Is a directory: {0}")]
    IsADirectory(String),

    #[error("Operation not permitted: {0}")]
    PermissionDenied(String),

    #[error("Insufficient resources: {0}")]
    OutOfResources(String),

    // === Input Errors ===

    #[error("Invalid argument: {0}")]
    InvalidInput(String),

    #[error("Invalid value {token:?} for parameter {param}: {reason}")]
    Parse {
        param: String,
        token: String,
        reason: String,
    },

    // === Activation Errors ===

    #[error("Config {0} is activated, deactivate it before any update")]
    Busy(String),

    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature {feature} failed: {reason}")]
    FeatureFailed { feature: String, reason: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl FeatfsError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a feature failure error
    pub fn feature_failed(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FeatureFailed {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Conventional errno value for this error
    ///
    /// Shells and scripts driving the namespace report failures the way a
    /// filesystem would, so every variant maps onto one errno.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound(_) | Self::UnknownFeature(_) => 2, // ENOENT
            Self::PermissionDenied(_) => 1,                   // EPERM
            Self::OutOfResources(_) => 12,                    // ENOMEM
            Self::Busy(_) => 16,                              // EBUSY
            Self::AlreadyExists(_) => 17,                     // EEXIST
            Self::NotADirectory(_) => 20,                     // ENOTDIR
            Self::IsADirectory(_) => 21,                      // EISDIR
            Self::InvalidInput(_)
            | Self::Parse { .. }
            | Self::Config(_)
            | Self::ConfigInvalid { .. } => 22, // EINVAL
            Self::Io(_)
            | Self::FileRead { .. }
            | Self::FileWrite { .. }
            | Self::FeatureFailed { .. }
            | Self::Internal(_) => 5, // EIO
        }
    }

    /// Check if this error was caused by the caller's input rather than by
    /// the service or a feature
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::Parse { .. }
                | Self::Busy(_)
                | Self::NotFound(_)
                | Self::AlreadyExists(_)
                | Self::NotADirectory(_)
                | Self::IsADirectory(_)
                | Self::PermissionDenied(_)
                | Self::UnknownFeature(_)
        )
    }
}

/// Result type alias using FeatfsError
pub type Result<T> = std::result::Result<T, FeatfsError>;
