//! Data models shared by the VideoDB client and the skills.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Prompt used when a scene index is created without an explicit prompt.
pub const DEFAULT_SCENE_PROMPT: &str =
    "Describe the visual content including people, objects, and actions.";

/// A VideoDB collection (the default one, for these skills).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Handle to a remote video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// Remote video ID.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Duration in seconds.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub length: Option<f64>,
    /// HLS stream of the full video.
    #[serde(default)]
    pub stream_url: Option<String>,
    /// Collection the video belongs to.
    #[serde(default)]
    pub collection_id: Option<String>,
}

impl Video {
    /// Create a handle with just an ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            length: None,
            stream_url: None,
            collection_id: None,
        }
    }

    /// Name, falling back to the ID.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Search mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    Semantic,
    Keyword,
}

/// Which index a search runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexType {
    #[default]
    SpokenWord,
    Scene,
}

impl std::fmt::Display for IndexType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexType::SpokenWord => write!(f, "spoken_word"),
            IndexType::Scene => write!(f, "scene"),
        }
    }
}

/// Parameters of a search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub search_type: SearchType,
    pub index_type: IndexType,
    /// Maximum number of results.
    pub result_threshold: u32,
    /// Minimum relevance score (0-1).
    pub score_threshold: f64,
}

impl SearchQuery {
    pub const DEFAULT_RESULT_THRESHOLD: u32 = 5;
    pub const DEFAULT_SCORE_THRESHOLD: f64 = 0.2;

    /// A query with default thresholds.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            search_type: SearchType::default(),
            index_type: IndexType::default(),
            result_threshold: Self::DEFAULT_RESULT_THRESHOLD,
            score_threshold: Self::DEFAULT_SCORE_THRESHOLD,
        }
    }
}

/// What a search runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTarget<'a> {
    /// One video's spoken-word or scene index.
    Video(&'a str),
    /// A specific scene index of a video.
    SceneIndex { video_id: &'a str, index_id: &'a str },
    /// The whole default collection.
    Collection,
}

/// A timed segment matching a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub video_id: String,
    /// Start offset in seconds.
    pub start: f64,
    /// End offset in seconds.
    pub end: f64,
    pub text: String,
    pub score: Option<f64>,
    pub stream_url: Option<String>,
}

/// How scenes are cut before being described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionType {
    #[default]
    TimeBased,
    ShotBased,
}

/// Configuration for creating a scene index.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneIndexConfig {
    pub extraction_type: ExtractionType,
    /// Seconds per scene (time-based only).
    pub time_interval: u32,
    /// Frames sampled per scene.
    pub frame_count: u32,
    /// Vision model prompt.
    pub prompt: String,
}

impl SceneIndexConfig {
    pub const DEFAULT_TIME_INTERVAL: u32 = 5;
    pub const DEFAULT_FRAME_COUNT: u32 = 3;
    /// Scene-change threshold used for shot-based extraction.
    pub const SHOT_THRESHOLD: u32 = 20;

    /// Extraction config as sent to the API.
    pub fn extraction_config(&self) -> serde_json::Value {
        match self.extraction_type {
            ExtractionType::TimeBased => serde_json::json!({
                "time": self.time_interval,
                "frame_count": self.frame_count,
            }),
            ExtractionType::ShotBased => serde_json::json!({
                "threshold": Self::SHOT_THRESHOLD,
                "frame_count": self.frame_count,
            }),
        }
    }
}

impl Default for SceneIndexConfig {
    fn default() -> Self {
        Self {
            extraction_type: ExtractionType::TimeBased,
            time_interval: Self::DEFAULT_TIME_INTERVAL,
            frame_count: Self::DEFAULT_FRAME_COUNT,
            prompt: DEFAULT_SCENE_PROMPT.to_string(),
        }
    }
}

/// Lifecycle state of a remote index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Processing,
    Ready,
    Failed,
}

impl IndexStatus {
    /// Normalize a remote status string.
    pub fn from_remote(status: &str) -> Self {
        let status = status.trim().to_lowercase();
        match status.as_str() {
            "done" | "ready" | "completed" | "complete" | "success" => IndexStatus::Ready,
            "processing" | "in_progress" | "in progress" | "pending" | "queued" | "in_queue" => {
                IndexStatus::Processing
            }
            s if s.contains("fail") || s.contains("error") => IndexStatus::Failed,
            _ => IndexStatus::Processing,
        }
    }
}

impl std::fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexStatus::Processing => write!(f, "processing"),
            IndexStatus::Ready => write!(f, "ready"),
            IndexStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A scene index attached to a video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneIndex {
    pub id: String,
    pub name: Option<String>,
    pub status: IndexStatus,
    pub created_at: Option<DateTime<Utc>>,
}

/// One timed transcript segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    #[serde(deserialize_with = "f64_or_string")]
    pub start: f64,
    /// End time in seconds.
    #[serde(deserialize_with = "f64_or_string")]
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Silence markers and blank segments carry no speech.
    pub fn is_speech(&self) -> bool {
        let text = self.text.trim();
        !text.is_empty() && text != "-"
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

/// VideoDB reports some durations as strings ("123.45").
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<NumberOrString>::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrString::Number(n)) => Some(n),
        Some(NumberOrString::String(s)) => s.trim().parse().ok(),
        None => None,
    })
}

fn f64_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_length_accepts_string_or_number() {
        let video: Video =
            serde_json::from_str(r#"{"id": "m-1", "name": "Demo", "length": "61.5"}"#).unwrap();
        assert_eq!(video.length, Some(61.5));

        let video: Video = serde_json::from_str(r#"{"id": "m-2", "length": 12}"#).unwrap();
        assert_eq!(video.length, Some(12.0));
        assert_eq!(video.display_name(), "m-2");

        let video: Video = serde_json::from_str(r#"{"id": "m-3", "length": null}"#).unwrap();
        assert_eq!(video.length, None);
    }

    #[test]
    fn test_index_status_normalization() {
        assert_eq!(IndexStatus::from_remote("done"), IndexStatus::Ready);
        assert_eq!(IndexStatus::from_remote("Completed"), IndexStatus::Ready);
        assert_eq!(IndexStatus::from_remote("in_progress"), IndexStatus::Processing);
        assert_eq!(IndexStatus::from_remote("FAILED"), IndexStatus::Failed);
        assert_eq!(IndexStatus::from_remote("something new"), IndexStatus::Processing);
    }

    #[test]
    fn test_extraction_config() {
        let config = SceneIndexConfig::default();
        assert_eq!(
            config.extraction_config(),
            serde_json::json!({"time": 5, "frame_count": 3})
        );

        let config = SceneIndexConfig {
            extraction_type: ExtractionType::ShotBased,
            frame_count: 1,
            ..SceneIndexConfig::default()
        };
        assert_eq!(
            config.extraction_config(),
            serde_json::json!({"threshold": 20, "frame_count": 1})
        );
    }

    #[test]
    fn test_silence_segments_are_not_speech() {
        assert!(!TranscriptSegment::new(0.0, 1.0, "-").is_speech());
        assert!(!TranscriptSegment::new(0.0, 1.0, "  ").is_speech());
        assert!(TranscriptSegment::new(0.0, 1.0, "hello").is_speech());
    }
}
