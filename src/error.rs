//! Error types for the VideoDB skills.

use crate::videodb::ApiError;
use serde::Serialize;
use thiserror::Error;

/// User-facing error codes.
///
/// This is the closed set printed in the `error` field of a failed invocation.
/// An empty search result is not an error and has no code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidArgs,
    MissingApiKey,
    MissingDependency,
    VideoNotFound,
    NotIndexed,
    UploadFailed,
    NoTranscript,
    NoAudio,
    Processing,
    UnknownError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidArgs => "INVALID_ARGS",
            ErrorCode::MissingApiKey => "MISSING_API_KEY",
            ErrorCode::MissingDependency => "MISSING_DEPENDENCY",
            ErrorCode::VideoNotFound => "VIDEO_NOT_FOUND",
            ErrorCode::NotIndexed => "NOT_INDEXED",
            ErrorCode::UploadFailed => "UPLOAD_FAILED",
            ErrorCode::NoTranscript => "NO_TRANSCRIPT",
            ErrorCode::NoAudio => "NO_AUDIO",
            ErrorCode::Processing => "PROCESSING",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Library-level error type for skill invocations.
///
/// Every variant maps to exactly one [`ErrorCode`].
#[derive(Error, Debug)]
pub enum SkillError {
    #[error("{0}")]
    InvalidArgs(String),

    #[error("{0}")]
    MissingApiKey(String),

    #[error("{0}")]
    MissingDependency(String),

    #[error("Video '{0}' not found")]
    VideoNotFound(String),

    #[error("{0}")]
    NotIndexed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("{0}")]
    NoTranscript(String),

    #[error("{0}")]
    NoAudio(String),

    #[error("{0}")]
    Processing(String),

    #[error("{0}")]
    Unknown(String),
}

impl SkillError {
    /// The user-facing code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SkillError::InvalidArgs(_) => ErrorCode::InvalidArgs,
            SkillError::MissingApiKey(_) => ErrorCode::MissingApiKey,
            SkillError::MissingDependency(_) => ErrorCode::MissingDependency,
            SkillError::VideoNotFound(_) => ErrorCode::VideoNotFound,
            SkillError::NotIndexed(_) => ErrorCode::NotIndexed,
            SkillError::UploadFailed(_) => ErrorCode::UploadFailed,
            SkillError::NoTranscript(_) => ErrorCode::NoTranscript,
            SkillError::NoAudio(_) => ErrorCode::NoAudio,
            SkillError::Processing(_) => ErrorCode::Processing,
            SkillError::Unknown(_) => ErrorCode::UnknownError,
        }
    }
}

/// Generic mapping of remote failures. Call sites with more context
/// (video lookup, upload, transcript fetch) map some variants differently.
impl From<ApiError> for SkillError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Auth(msg) => {
                SkillError::MissingApiKey(format!("VideoDB rejected the API key: {}", msg))
            }
            ApiError::NotFound(msg) => SkillError::VideoNotFound(msg),
            ApiError::NotIndexed(msg) => SkillError::NotIndexed(msg),
            ApiError::Processing(msg) => SkillError::Processing(msg),
            ApiError::Timeout(msg) => SkillError::Processing(msg),
            ApiError::NoTranscript(msg) => SkillError::NoTranscript(msg),
            ApiError::NoAudio(msg) => SkillError::NoAudio(msg),
            ApiError::ClientInit(msg) => {
                SkillError::MissingDependency(format!("HTTP client unavailable: {}", msg))
            }
            err @ (ApiError::Network(_) | ApiError::Api { .. }) => {
                SkillError::Unknown(err.to_string())
            }
        }
    }
}

/// Errors from loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid API base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

impl From<ConfigError> for SkillError {
    fn from(err: ConfigError) -> Self {
        SkillError::InvalidArgs(format!("Configuration error: {}", err))
    }
}

/// Result type alias for skill operations.
pub type Result<T> = std::result::Result<T, SkillError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::NotIndexed).unwrap();
        assert_eq!(json, "\"NOT_INDEXED\"");
        assert_eq!(ErrorCode::UnknownError.to_string(), "UNKNOWN_ERROR");
    }

    #[test]
    fn test_api_error_mapping() {
        let err: SkillError = ApiError::NotIndexed("no index".to_string()).into();
        assert_eq!(err.code(), ErrorCode::NotIndexed);

        let err: SkillError = ApiError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert_eq!(err.code(), ErrorCode::UnknownError);
        assert!(err.to_string().contains("boom"));

        let err: SkillError = ApiError::ClientInit("tls".to_string()).into();
        assert_eq!(err.code(), ErrorCode::MissingDependency);
    }
}
