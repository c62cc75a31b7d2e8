//! ICC error types.

use colorflow_core::EngineError;
use thiserror::Error;

/// Result type for ICC operations.
pub type IccResult<T> = Result<T, IccError>;

/// Errors raised while opening profiles or building transforms.
#[derive(Debug, Error)]
pub enum IccError {
    /// Failed to load profile from file.
    #[error("failed to load profile: {0}")]
    LoadFailed(String),

    /// Failed to create profile.
    #[error("failed to create profile: {0}")]
    CreateFailed(String),

    /// Failed to create transform.
    #[error("failed to create transform: {0}")]
    TransformFailed(String),

    /// Invalid profile data.
    #[error("invalid profile data: {0}")]
    InvalidProfile(String),

    /// The profile's data colorspace cannot be transformed.
    #[error("unsupported colorspace: {0}")]
    UnsupportedColorSpace(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IccError> for EngineError {
    fn from(err: IccError) -> Self {
        EngineError::incompatible_context(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorflow_core::ErrorKind;

    #[test]
    fn test_maps_to_incompatible_context() {
        let err: EngineError = IccError::InvalidProfile("truncated header".into()).into();
        assert_eq!(err.kind(), ErrorKind::IncompatibleContext);
        assert!(err.to_string().contains("truncated header"));
    }
}
