//! VideoDB API access.
//!
//! The skills talk to the hosted service only through the [`VideoApi`] trait.
//! [`VideoDbClient`] is the HTTP implementation; [`MemoryVideoApi`] is an
//! in-memory stand-in that records every call, used by the test suite.
//!
//! The service does the actual work (indexing, search, transcription). This
//! module only moves requests and responses and classifies failures into
//! [`ApiError`] variants the skills can act on.

mod client;
mod memory;
mod models;

pub use client::VideoDbClient;
pub use memory::{ApiCall, ApiOp, MemoryVideoApi};
pub use models::{
    Collection, ExtractionType, IndexStatus, IndexType, SceneIndex, SceneIndexConfig,
    SearchQuery, SearchTarget, SearchType, Shot, TranscriptSegment, Video, DEFAULT_SCENE_PROMPT,
};

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Errors from VideoDB operations.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The API key was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The video (or collection) has no index of the requested kind.
    #[error("not indexed: {0}")]
    NotIndexed(String),

    /// The resource exists but the service is still working on it.
    #[error("still processing: {0}")]
    Processing(String),

    /// No transcript exists for the video.
    #[error("no transcript: {0}")]
    NoTranscript(String),

    /// The video has no usable audio track.
    #[error("no audio: {0}")]
    NoAudio(String),

    /// An asynchronous job did not finish within the polling budget.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The HTTP client could not be built.
    #[error("client initialisation failed: {0}")]
    ClientInit(String),

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// Any other API failure.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

static NO_AUDIO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)no\s+audio|audio\s+(stream\s+)?not\s+found|does\s+not\s+(have|contain)\s+(an?\s+)?audio")
        .expect("valid regex")
});

static NO_TRANSCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)transcript(ion)?\s+(does\s+not|doesn't)\s+exist|no\s+transcript|generate\s+transcript|transcript(ion)?\s+not\s+found",
    )
    .expect("valid regex")
});

// "index ... not found" must not reach across sentences, so "Video not found"
// alone never counts.
static NOT_INDEXED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)not\s+(yet\s+)?indexed|no\s+(spoken[\s_]word\s+|scene\s+)?index|\bindex\b[^.]*\bnot\s+found|no\s+scene",
    )
    .expect("valid regex")
});

static PROCESSING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)still\s+(being\s+)?process|is\s+(being\s+)?processing|being\s+processed|in\s+progress|not\s+(yet\s+)?ready")
        .expect("valid regex")
});

impl ApiError {
    /// Classify a failed response by HTTP status and message.
    ///
    /// Authentication statuses win, then the message patterns, then 404.
    pub fn classify(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();

        if status == 401 || status == 403 {
            return ApiError::Auth(message);
        }
        if NO_AUDIO.is_match(&message) {
            return ApiError::NoAudio(message);
        }
        if NO_TRANSCRIPT.is_match(&message) {
            return ApiError::NoTranscript(message);
        }
        if NOT_INDEXED.is_match(&message) {
            return ApiError::NotIndexed(message);
        }
        if PROCESSING.is_match(&message) {
            return ApiError::Processing(message);
        }
        if status == 404 {
            return ApiError::NotFound(message);
        }
        ApiError::Api { status, message }
    }

    /// The message carried by this error.
    pub fn message(&self) -> &str {
        match self {
            ApiError::Auth(m)
            | ApiError::NotFound(m)
            | ApiError::NotIndexed(m)
            | ApiError::Processing(m)
            | ApiError::NoTranscript(m)
            | ApiError::NoAudio(m)
            | ApiError::Timeout(m)
            | ApiError::ClientInit(m)
            | ApiError::Network(m) => m,
            ApiError::Api { message, .. } => message,
        }
    }

    /// Whether an index request failed only because the index exists.
    pub fn is_already_indexed(&self) -> bool {
        self.message().to_lowercase().contains("already")
    }
}

/// Result alias for VideoDB operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Operations the skills need from the hosted service.
#[async_trait]
pub trait VideoApi: Send + Sync {
    /// The collection this connection works in.
    fn collection(&self) -> &Collection;

    /// Look up a video by ID.
    async fn get_video(&self, video_id: &str) -> ApiResult<Video>;

    /// List the videos of the collection.
    async fn list_videos(&self) -> ApiResult<Vec<Video>>;

    /// Upload a video from a URL and wait until it is registered.
    async fn upload(&self, url: &str, name: Option<&str>) -> ApiResult<Video>;

    /// Build the spoken-word index of a video.
    async fn index_spoken_words(&self, video_id: &str) -> ApiResult<()>;

    /// Start building a scene index. Returns the new index ID when the
    /// service reports one; does not wait for completion.
    async fn index_scenes(
        &self,
        video_id: &str,
        config: &SceneIndexConfig,
    ) -> ApiResult<Option<String>>;

    /// List the scene indexes of a video.
    async fn list_scene_index(&self, video_id: &str) -> ApiResult<Vec<SceneIndex>>;

    /// Run a search.
    async fn search(&self, target: SearchTarget<'_>, query: &SearchQuery) -> ApiResult<Vec<Shot>>;

    /// Fetch the transcript. `force` asks the service to regenerate it.
    async fn get_transcript(&self, video_id: &str, force: bool)
        -> ApiResult<Vec<TranscriptSegment>>;

    /// Generate the transcript and wait for it.
    async fn generate_transcript(&self, video_id: &str, force: bool) -> ApiResult<()>;

    /// Compile shots into one playable stream. `None` when there is nothing
    /// to compile.
    async fn compile(&self, shots: &[Shot]) -> ApiResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_status() {
        assert!(matches!(ApiError::classify(401, "bad key"), ApiError::Auth(_)));
        assert!(matches!(ApiError::classify(403, "not indexed"), ApiError::Auth(_)));
        assert!(matches!(
            ApiError::classify(404, "Video not found"),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::classify(500, "internal"),
            ApiError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_classify_by_message() {
        assert!(matches!(
            ApiError::classify(400, "Video is not indexed. Please index first"),
            ApiError::NotIndexed(_)
        ));
        assert!(matches!(
            ApiError::classify(400, "No scene index found for video"),
            ApiError::NotIndexed(_)
        ));
        assert!(matches!(
            ApiError::classify(404, "Transcript does not exist for the video"),
            ApiError::NoTranscript(_)
        ));
        assert!(matches!(
            ApiError::classify(400, "Video does not have an audio stream"),
            ApiError::NoAudio(_)
        ));
        assert!(matches!(
            ApiError::classify(409, "Index is still processing"),
            ApiError::Processing(_)
        ));
        assert!(matches!(
            ApiError::classify(400, "Spoken word index for video not found"),
            ApiError::NotIndexed(_)
        ));
        assert!(matches!(
            ApiError::classify(409, "Video is being processed"),
            ApiError::Processing(_)
        ));
    }

    #[test]
    fn test_classify_leaves_unrelated_messages_alone() {
        assert!(matches!(
            ApiError::classify(500, "Error processing search request"),
            ApiError::Api { status: 500, .. }
        ));
        assert!(matches!(
            ApiError::classify(404, "Video not found. Check the index page"),
            ApiError::NotFound(_)
        ));
    }

    #[test]
    fn test_already_indexed() {
        let err = ApiError::classify(400, "Video is already indexed");
        assert!(err.is_already_indexed());
        assert!(!ApiError::Network("reset".to_string()).is_already_indexed());
    }
}
