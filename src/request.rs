//! Parsing of the JSON argument each skill takes.
//!
//! Every skill accepts one JSON object. Unknown keys are ignored, empty
//! strings count as absent, and anything malformed is an `INVALID_ARGS`
//! failure raised before any network call.

use crate::error::{Result, SkillError};
use crate::skills::Skill;
use crate::videodb::{ExtractionType, IndexType, SceneIndexConfig, SearchQuery, SearchType};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;
use url::Url;

/// Where the video of a request comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoSource {
    /// An existing video in the collection.
    Id(String),
    /// A remote URL to upload first.
    Url(Url),
}

/// What a search runs over.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchScope {
    Video(VideoSource),
    Collection,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub scope: SearchScope,
    pub query: SearchQuery,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneAction {
    /// Start building a scene index.
    Create(SceneIndexConfig),
    /// Search a scene index, the first ready one unless `index_id` is given.
    Search {
        query: SearchQuery,
        index_id: Option<String>,
    },
    /// List the scene indexes of the video.
    List,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneIndexRequest {
    pub source: VideoSource,
    pub action: SceneAction,
}

/// Output shape of a transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptFormat {
    /// Timed segments.
    #[default]
    Timestamped,
    /// One plain-text string.
    Text,
    /// Segments and text together.
    Both,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRequest {
    pub source: VideoSource,
    pub format: TranscriptFormat,
    /// Regenerate even when a transcript exists.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadRequest {
    Upload { url: Url, name: Option<String> },
    List,
    Info { video_id: String },
}

/// A parsed skill invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SkillRequest {
    Search(SearchRequest),
    SceneIndex(SceneIndexRequest),
    Transcript(TranscriptRequest),
    Upload(UploadRequest),
}

impl SkillRequest {
    /// Parse the JSON argument of `skill`.
    pub fn parse(skill: Skill, raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw.trim())
            .map_err(|e| SkillError::InvalidArgs(format!("Invalid JSON arguments: {}", e)))?;
        if !value.is_object() {
            return Err(SkillError::InvalidArgs(
                "Arguments must be a JSON object".to_string(),
            ));
        }

        match skill {
            Skill::Search => parse_search(decode(value)?).map(SkillRequest::Search),
            Skill::SceneIndex => parse_scene_index(decode(value)?).map(SkillRequest::SceneIndex),
            Skill::Transcript => parse_transcript(decode(value)?).map(SkillRequest::Transcript),
            Skill::Upload => parse_upload(decode(value)?).map(SkillRequest::Upload),
        }
    }

    /// The video source, for requests that have one.
    pub fn source(&self) -> Option<&VideoSource> {
        match self {
            SkillRequest::Search(SearchRequest {
                scope: SearchScope::Video(source),
                ..
            }) => Some(source),
            SkillRequest::SceneIndex(req) => Some(&req.source),
            SkillRequest::Transcript(req) => Some(&req.source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Scope {
    #[default]
    Video,
    Collection,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawSceneAction {
    Create,
    #[default]
    Search,
    List,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawUploadAction {
    #[default]
    Upload,
    List,
    Info,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSource {
    url: Option<String>,
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawThresholds {
    search_type: Option<SearchType>,
    result_threshold: Option<i64>,
    score_threshold: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSearch {
    #[serde(flatten)]
    source: RawSource,
    query: Option<String>,
    index_type: Option<IndexType>,
    scope: Option<Scope>,
    #[serde(flatten)]
    thresholds: RawThresholds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSceneIndex {
    #[serde(flatten)]
    source: RawSource,
    action: Option<RawSceneAction>,
    query: Option<String>,
    prompt: Option<String>,
    index_id: Option<String>,
    extraction_type: Option<ExtractionType>,
    time_interval: Option<i64>,
    frame_count: Option<i64>,
    #[serde(flatten)]
    thresholds: RawThresholds,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTranscript {
    #[serde(flatten)]
    source: RawSource,
    format: Option<TranscriptFormat>,
    force: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawUpload {
    action: Option<RawUploadAction>,
    url: Option<String>,
    video_id: Option<String>,
    name: Option<String>,
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| SkillError::InvalidArgs(format!("Invalid arguments: {}", e)))
}

/// Drop surrounding whitespace; empty strings become absent.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn required(value: Option<String>, key: &str) -> Result<String> {
    non_empty(value).ok_or_else(|| SkillError::InvalidArgs(format!("'{}' is required", key)))
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| SkillError::InvalidArgs(format!("Invalid url '{}': {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SkillError::InvalidArgs(format!(
            "Invalid url '{}': expected an http(s) URL",
            raw
        )));
    }
    Ok(url)
}

fn positive(value: Option<i64>, key: &str, default: u32) -> Result<u32> {
    match value {
        None => Ok(default),
        Some(n) if n > 0 => u32::try_from(n)
            .map_err(|_| SkillError::InvalidArgs(format!("'{}' is too large: {}", key, n))),
        Some(n) => Err(SkillError::InvalidArgs(format!(
            "'{}' must be positive, got {}",
            key, n
        ))),
    }
}

impl RawSource {
    fn resolve(self) -> Result<VideoSource> {
        let url = non_empty(self.url);
        match (non_empty(self.video_id), url) {
            (Some(id), url) => {
                if let Some(url) = url {
                    warn!(video_id = %id, url = %url, "Both video_id and url given; using video_id");
                }
                Ok(VideoSource::Id(id))
            }
            (None, Some(url)) => parse_url(&url).map(VideoSource::Url),
            (None, None) => Err(SkillError::InvalidArgs(
                "Either 'url' or 'video_id' is required".to_string(),
            )),
        }
    }
}

impl RawThresholds {
    fn into_query(self, query: String, index_type: IndexType) -> Result<SearchQuery> {
        let score_threshold = match self.score_threshold {
            None => SearchQuery::DEFAULT_SCORE_THRESHOLD,
            Some(s) if (0.0..=1.0).contains(&s) => s,
            Some(s) => {
                return Err(SkillError::InvalidArgs(format!(
                    "'score_threshold' must be between 0 and 1, got {}",
                    s
                )))
            }
        };

        Ok(SearchQuery {
            query,
            search_type: self.search_type.unwrap_or_default(),
            index_type,
            result_threshold: positive(
                self.result_threshold,
                "result_threshold",
                SearchQuery::DEFAULT_RESULT_THRESHOLD,
            )?,
            score_threshold,
        })
    }
}

fn parse_search(raw: RawSearch) -> Result<SearchRequest> {
    let query = required(raw.query, "query")?;
    let query = raw
        .thresholds
        .into_query(query, raw.index_type.unwrap_or_default())?;

    let scope = match raw.scope.unwrap_or_default() {
        Scope::Video => SearchScope::Video(raw.source.resolve()?),
        Scope::Collection => SearchScope::Collection,
    };

    Ok(SearchRequest { scope, query })
}

fn parse_scene_index(raw: RawSceneIndex) -> Result<SceneIndexRequest> {
    let source = raw.source.resolve()?;

    let action = match raw.action.unwrap_or_default() {
        RawSceneAction::Create => SceneAction::Create(SceneIndexConfig {
            extraction_type: raw.extraction_type.unwrap_or_default(),
            time_interval: positive(
                raw.time_interval,
                "time_interval",
                SceneIndexConfig::DEFAULT_TIME_INTERVAL,
            )?,
            frame_count: positive(
                raw.frame_count,
                "frame_count",
                SceneIndexConfig::DEFAULT_FRAME_COUNT,
            )?,
            prompt: required(raw.prompt, "prompt")?,
        }),
        RawSceneAction::Search => {
            let query = required(raw.query, "query")?;
            SceneAction::Search {
                query: raw.thresholds.into_query(query, IndexType::Scene)?,
                index_id: non_empty(raw.index_id),
            }
        }
        RawSceneAction::List => SceneAction::List,
    };

    Ok(SceneIndexRequest { source, action })
}

fn parse_transcript(raw: RawTranscript) -> Result<TranscriptRequest> {
    Ok(TranscriptRequest {
        source: raw.source.resolve()?,
        format: raw.format.unwrap_or_default(),
        force: raw.force.unwrap_or(false),
    })
}

fn parse_upload(raw: RawUpload) -> Result<UploadRequest> {
    match raw.action.unwrap_or_default() {
        RawUploadAction::Upload => Ok(UploadRequest::Upload {
            url: parse_url(&required(raw.url, "url")?)?,
            name: non_empty(raw.name),
        }),
        RawUploadAction::List => Ok(UploadRequest::List),
        RawUploadAction::Info => Ok(UploadRequest::Info {
            video_id: required(raw.video_id, "video_id")?,
        }),
    }
}
