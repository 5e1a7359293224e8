//! Error types for strata-core

use thiserror::Error;

/// Core error type for Strata
#[derive(Error, Debug)]
pub enum CoreError {
    /// C001: Version string is not `<uint>.<uint>.<uint>`
    #[error("[C001] Invalid version format: '{input}'")]
    InvalidVersionFormat { input: String },

    /// C002: Caller cancelled the operation
    #[error("[C002] Operation cancelled")]
    Cancelled,

    /// C003: Caller-supplied deadline passed
    #[error("[C003] Deadline exceeded")]
    DeadlineExceeded,

    /// C004: Profile file not found
    #[error("[C004] Profile not found: {path}")]
    ProfileNotFound { path: String },

    /// C005: Invalid profile value
    #[error("[C005] Invalid profile: {message}")]
    ProfileInvalid { message: String },

    /// C006: IO error with file path context
    #[error("[C006] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// C007: Profile YAML parse error
    #[error("[C007] Profile parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

impl CoreError {
    /// True for the two cooperative-cancellation outcomes.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, CoreError::Cancelled | CoreError::DeadlineExceeded)
    }
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
