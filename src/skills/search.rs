//! Search by spoken content or visual scene, over a video or the collection.

use super::{compile_shots, shot_record};
use crate::error::Result;
use crate::output::SkillOutput;
use crate::request::{SearchRequest, SearchScope};
use crate::resolver::resolve_video;
use crate::videodb::{
    ApiError, IndexType, SceneIndexConfig, SearchQuery, SearchTarget, Shot, VideoApi,
};
use serde_json::json;
use tracing::{debug, info, instrument};

pub(super) async fn run(api: &dyn VideoApi, req: &SearchRequest) -> Result<SkillOutput> {
    let (video_id, shots) = match &req.scope {
        SearchScope::Collection => {
            let shots = api.search(SearchTarget::Collection, &req.query).await?;
            (None, shots)
        }
        SearchScope::Video(source) => {
            let video = resolve_video(api, source).await?;
            let shots = search_video(api, &video.id, &req.query).await?;
            (Some(video.id), shots)
        }
    };

    let compiled_stream_url = compile_shots(api, &shots).await?;
    let results: Vec<_> = shots.iter().map(|s| shot_record(s, "text")).collect();
    info!(total = results.len(), "Search complete");

    Ok(SkillOutput::Json(json!({
        "success": true,
        "query": req.query.query,
        "scope": match req.scope {
            SearchScope::Video(_) => "video",
            SearchScope::Collection => "collection",
        },
        "video_id": video_id,
        "index_type": req.query.index_type.to_string(),
        "total_results": results.len(),
        "results": results,
        "compiled_stream_url": compiled_stream_url,
    })))
}

/// Search a video, indexing it once and retrying if it has no index yet.
#[instrument(skip(api, query), fields(index_type = %query.index_type))]
async fn search_video(api: &dyn VideoApi, video_id: &str, query: &SearchQuery) -> Result<Vec<Shot>> {
    match api.search(SearchTarget::Video(video_id), query).await {
        Ok(shots) => Ok(shots),
        Err(ApiError::NotIndexed(msg)) => {
            info!(reason = %msg, "Video not indexed; indexing and retrying once");
            ensure_indexed(api, video_id, query.index_type).await?;
            Ok(api.search(SearchTarget::Video(video_id), query).await?)
        }
        Err(err) => Err(err.into()),
    }
}

/// Build the index a search needs. An existing index counts as success.
async fn ensure_indexed(api: &dyn VideoApi, video_id: &str, index_type: IndexType) -> Result<()> {
    let result = match index_type {
        IndexType::SpokenWord => api.index_spoken_words(video_id).await,
        IndexType::Scene => api
            .index_scenes(video_id, &SceneIndexConfig::default())
            .await
            .map(|_| ()),
    };

    match result {
        Ok(()) => Ok(()),
        Err(err) if err.is_already_indexed() => {
            debug!(video_id, "Index already exists");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}
