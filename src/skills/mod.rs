//! The skills: search, scene indexing, transcripts and the upload utility.
//!
//! Each skill takes a parsed [`SkillRequest`], makes a few sequential calls
//! through [`VideoApi`] and returns a [`SkillOutput`]. Remote failures are
//! mapped to user-facing codes here.

mod scene_index;
mod search;
mod transcript;
mod upload;

use crate::error::{Result, SkillError};
use crate::output::{round_to, SkillOutput};
use crate::request::SkillRequest;
use crate::videodb::{Shot, VideoApi};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Names accepted on the command line.
pub const SKILL_NAMES: &[&str] = &["search", "scene-index", "transcript", "upload"];

/// A skill entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skill {
    Search,
    SceneIndex,
    Transcript,
    Upload,
}

impl Skill {
    pub fn name(&self) -> &'static str {
        match self {
            Skill::Search => "search",
            Skill::SceneIndex => "scene-index",
            Skill::Transcript => "transcript",
            Skill::Upload => "upload",
        }
    }

    /// Example argument, shown in usage hints.
    pub fn example(&self) -> &'static str {
        match self {
            Skill::Search => r#"{"video_id": "m-123", "query": "pricing discussion"}"#,
            Skill::SceneIndex => {
                r#"{"url": "https://youtu.be/xxx", "action": "search", "query": "red car"}"#
            }
            Skill::Transcript => r#"{"url": "https://youtu.be/xxx", "format": "text"}"#,
            Skill::Upload => r#"{"url": "https://youtu.be/xxx", "name": "Keynote"}"#,
        }
    }

    pub fn all() -> [Skill; 4] {
        [
            Skill::Search,
            Skill::SceneIndex,
            Skill::Transcript,
            Skill::Upload,
        ]
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Skill {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "search" => Ok(Skill::Search),
            "scene-index" | "scene_index" | "scene" => Ok(Skill::SceneIndex),
            "transcript" => Ok(Skill::Transcript),
            "upload" => Ok(Skill::Upload),
            other => Err(SkillError::InvalidArgs(format!(
                "Unknown skill '{}'. Valid skills: {}",
                other,
                SKILL_NAMES.join(", ")
            ))),
        }
    }
}

/// Run a parsed request.
pub async fn execute(api: &dyn VideoApi, request: &SkillRequest) -> Result<SkillOutput> {
    match request {
        SkillRequest::Search(req) => search::run(api, req).await,
        SkillRequest::SceneIndex(req) => scene_index::run(api, req).await,
        SkillRequest::Transcript(req) => transcript::run(api, req).await,
        SkillRequest::Upload(req) => upload::run(api, req).await,
    }
}

/// Compile the shots into one stream. No call is made for an empty list.
async fn compile_shots(api: &dyn VideoApi, shots: &[Shot]) -> Result<Option<String>> {
    if shots.is_empty() {
        return Ok(None);
    }
    Ok(api.compile(shots).await?)
}

/// JSON record of a shot; `text_key` is `text` or `description`.
fn shot_record(shot: &Shot, text_key: &str) -> Value {
    let mut record = json!({
        "video_id": shot.video_id,
        "start": round_to(shot.start, 1),
        "end": round_to(shot.end, 1),
        "score": shot.score.map(|s| round_to(s, 3)),
        "stream_url": shot.stream_url,
    });
    record[text_key] = Value::String(shot.text.clone());
    record
}
