//! Create, list and search visual scene indexes.

use super::{compile_shots, shot_record};
use crate::error::{Result, SkillError};
use crate::output::SkillOutput;
use crate::request::{SceneAction, SceneIndexRequest};
use crate::resolver::resolve_video;
use crate::videodb::{
    ExtractionType, IndexStatus, SceneIndex, SceneIndexConfig, SearchQuery, SearchTarget, Video,
    VideoApi,
};
use serde_json::json;
use tracing::info;

pub(super) async fn run(api: &dyn VideoApi, req: &SceneIndexRequest) -> Result<SkillOutput> {
    let video = resolve_video(api, &req.source).await?;

    match &req.action {
        SceneAction::Create(config) => create(api, &video, config).await,
        SceneAction::List => list(api, &video).await,
        SceneAction::Search { query, index_id } => {
            search(api, &video, query, index_id.as_deref()).await
        }
    }
}

async fn create(api: &dyn VideoApi, video: &Video, config: &SceneIndexConfig) -> Result<SkillOutput> {
    let index_id = api.index_scenes(&video.id, config).await?;
    info!(video_id = %video.id, ?index_id, "Scene indexing started");

    let extraction_type = match config.extraction_type {
        ExtractionType::TimeBased => "time_based",
        ExtractionType::ShotBased => "shot_based",
    };
    let time_interval = match config.extraction_type {
        ExtractionType::TimeBased => Some(config.time_interval),
        ExtractionType::ShotBased => None,
    };

    Ok(SkillOutput::Json(json!({
        "success": true,
        "action": "create",
        "video_id": video.id,
        "scene_index_id": index_id,
        "status": IndexStatus::Processing,
        "message": "Scene indexing started. Search becomes available once the index is ready.",
        "config": {
            "extraction_type": extraction_type,
            "time_interval": time_interval,
            "frame_count": config.frame_count,
            "prompt": config.prompt,
        },
    })))
}

async fn list(api: &dyn VideoApi, video: &Video) -> Result<SkillOutput> {
    let indexes = api.list_scene_index(&video.id).await?;

    Ok(SkillOutput::Json(json!({
        "success": true,
        "action": "list",
        "video_id": video.id,
        "total": indexes.len(),
        "indexes": indexes,
    })))
}

async fn search(
    api: &dyn VideoApi,
    video: &Video,
    query: &SearchQuery,
    index_id: Option<&str>,
) -> Result<SkillOutput> {
    let indexes = api.list_scene_index(&video.id).await?;
    let index = select_index(&indexes, index_id)?;

    let shots = api
        .search(
            SearchTarget::SceneIndex {
                video_id: &video.id,
                index_id: &index.id,
            },
            query,
        )
        .await?;
    let compiled_stream_url = compile_shots(api, &shots).await?;
    let results: Vec<_> = shots
        .iter()
        .map(|s| shot_record(s, "description"))
        .collect();

    Ok(SkillOutput::Json(json!({
        "success": true,
        "action": "search",
        "video_id": video.id,
        "scene_index_id": index.id,
        "query": query.query,
        "total_results": results.len(),
        "results": results,
        "compiled_stream_url": compiled_stream_url,
    })))
}

/// Pick the index to search: the requested one, else the first ready one.
/// Indexes are never created here.
fn select_index<'a>(indexes: &'a [SceneIndex], index_id: Option<&str>) -> Result<&'a SceneIndex> {
    let index = match index_id {
        Some(id) => indexes.iter().find(|i| i.id == id).ok_or_else(|| {
            SkillError::NotIndexed(format!("Scene index '{}' not found for this video", id))
        })?,
        None => indexes
            .iter()
            .find(|i| i.status == IndexStatus::Ready)
            .or_else(|| indexes.iter().find(|i| i.status == IndexStatus::Processing))
            .or_else(|| indexes.first())
            .ok_or_else(|| {
                SkillError::NotIndexed(
                    "No scene index found. Create one first with action 'create'.".to_string(),
                )
            })?,
    };

    match index.status {
        IndexStatus::Ready => Ok(index),
        IndexStatus::Processing => Err(SkillError::Processing(format!(
            "Scene index '{}' is being created. Try again in a few minutes.",
            index.id
        ))),
        IndexStatus::Failed => Err(SkillError::NotIndexed(format!(
            "Scene index '{}' failed. Create a new one with action 'create'.",
            index.id
        ))),
    }
}
