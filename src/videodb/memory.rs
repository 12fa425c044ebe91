//! In-memory VideoDB implementation.
//!
//! Behaves like the hosted service for the operations the skills use, records
//! every call, and can be told to fail a given operation. Used by the tests of
//! the resolver and the skills.

use super::models::{
    Collection, IndexStatus, IndexType, SceneIndex, SceneIndexConfig, SearchQuery, SearchTarget,
    Shot, TranscriptSegment, Video,
};
use super::{ApiError, ApiResult, VideoApi};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOp {
    GetVideo,
    ListVideos,
    Upload,
    IndexSpokenWords,
    IndexScenes,
    ListSceneIndex,
    Search,
    GetTranscript,
    GenerateTranscript,
    Compile,
}

/// Recorded call for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    GetVideo(String),
    ListVideos,
    Upload(String),
    IndexSpokenWords(String),
    IndexScenes(String),
    ListSceneIndex(String),
    Search {
        video_id: Option<String>,
        index_id: Option<String>,
        index_type: IndexType,
    },
    GetTranscript { video_id: String, force: bool },
    GenerateTranscript { video_id: String, force: bool },
    Compile(usize),
}

impl ApiCall {
    /// The operation this call belongs to.
    pub fn op(&self) -> ApiOp {
        match self {
            ApiCall::GetVideo(_) => ApiOp::GetVideo,
            ApiCall::ListVideos => ApiOp::ListVideos,
            ApiCall::Upload(_) => ApiOp::Upload,
            ApiCall::IndexSpokenWords(_) => ApiOp::IndexSpokenWords,
            ApiCall::IndexScenes(_) => ApiOp::IndexScenes,
            ApiCall::ListSceneIndex(_) => ApiOp::ListSceneIndex,
            ApiCall::Search { .. } => ApiOp::Search,
            ApiCall::GetTranscript { .. } => ApiOp::GetTranscript,
            ApiCall::GenerateTranscript { .. } => ApiOp::GenerateTranscript,
            ApiCall::Compile(_) => ApiOp::Compile,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    videos: Vec<Video>,
    /// Spoken content per video, searchable once indexed.
    spoken: HashMap<String, Vec<Shot>>,
    /// Scene descriptions per video, searchable through a ready scene index.
    scenes: HashMap<String, Vec<Shot>>,
    spoken_indexed: HashSet<String>,
    scene_indexes: HashMap<String, Vec<SceneIndex>>,
    /// Speech of each video, turned into a transcript on generation.
    speech: HashMap<String, Vec<TranscriptSegment>>,
    transcripts: HashSet<String>,
    next_id: u32,
    failures: HashMap<ApiOp, VecDeque<ApiError>>,
    calls: Vec<ApiCall>,
}

/// In-memory VideoDB.
#[derive(Debug)]
pub struct MemoryVideoApi {
    collection: Collection,
    state: Mutex<MemoryState>,
}

impl MemoryVideoApi {
    /// Create an empty in-memory collection.
    pub fn new() -> Self {
        Self {
            collection: Collection {
                id: "c-memory".to_string(),
                name: Some("Memory Collection".to_string()),
            },
            state: Mutex::new(MemoryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a video with the given spoken segments (not yet indexed).
    pub fn with_video(self, video: Video, speech: Vec<TranscriptSegment>) -> Self {
        {
            let mut state = self.state();
            let shots = speech
                .iter()
                .map(|seg| Shot {
                    video_id: video.id.clone(),
                    start: seg.start,
                    end: seg.end,
                    text: seg.text.clone(),
                    score: Some(0.9),
                    stream_url: None,
                })
                .collect();
            state.spoken.insert(video.id.clone(), shots);
            state.speech.insert(video.id.clone(), speech);
            state.videos.push(video);
        }
        self
    }

    /// Mark a video's spoken words as already indexed.
    pub fn with_spoken_index(self, video_id: &str) -> Self {
        self.state().spoken_indexed.insert(video_id.to_string());
        self
    }

    /// Mark a video's transcript as already generated.
    pub fn with_transcript(self, video_id: &str) -> Self {
        self.state().transcripts.insert(video_id.to_string());
        self
    }

    /// Attach a scene index in the given state, with the shots it finds.
    pub fn with_scene_index(
        self,
        video_id: &str,
        index_id: &str,
        status: IndexStatus,
        shots: Vec<Shot>,
    ) -> Self {
        {
            let mut state = self.state();
            state
                .scene_indexes
                .entry(video_id.to_string())
                .or_default()
                .push(SceneIndex {
                    id: index_id.to_string(),
                    name: None,
                    status,
                    created_at: Some(Utc::now()),
                });
            state.scenes.insert(video_id.to_string(), shots);
        }
        self
    }

    /// Make the next call of `op` fail with `err`. Queued failures are used
    /// in order, one per call.
    pub fn fail_next(&self, op: ApiOp, err: ApiError) {
        self.state().failures.entry(op).or_default().push_back(err);
    }

    /// Mark a scene index as finished.
    pub fn complete_scene_index(&self, video_id: &str, index_id: &str) {
        let mut state = self.state();
        if let Some(index) = state
            .scene_indexes
            .get_mut(video_id)
            .and_then(|indexes| indexes.iter_mut().find(|i| i.id == index_id))
        {
            index.status = IndexStatus::Ready;
        }
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Number of calls made to `op`.
    pub fn count(&self, op: ApiOp) -> usize {
        self.state().calls.iter().filter(|c| c.op() == op).count()
    }

    /// Record a call and return the queued failure for it, if any.
    fn enter(&self, call: ApiCall) -> ApiResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.state();
        let op = call.op();
        state.calls.push(call);
        if let Some(err) = state.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            return Err(err);
        }
        Ok(state)
    }
}

impl Default for MemoryVideoApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryState {
    fn video(&self, video_id: &str) -> ApiResult<&Video> {
        self.videos
            .iter()
            .find(|v| v.id == video_id)
            .ok_or_else(|| ApiError::NotFound(format!("Video {} not found", video_id)))
    }
}

fn rank(mut shots: Vec<Shot>, query: &SearchQuery) -> Vec<Shot> {
    let needle = query.query.to_lowercase();
    shots.retain(|s| {
        s.text.to_lowercase().contains(&needle)
            && s.score.unwrap_or(0.0) >= query.score_threshold
    });
    shots.truncate(query.result_threshold as usize);
    shots
}

#[async_trait]
impl VideoApi for MemoryVideoApi {
    fn collection(&self) -> &Collection {
        &self.collection
    }

    async fn get_video(&self, video_id: &str) -> ApiResult<Video> {
        let state = self.enter(ApiCall::GetVideo(video_id.to_string()))?;
        state.video(video_id).cloned()
    }

    async fn list_videos(&self) -> ApiResult<Vec<Video>> {
        let state = self.enter(ApiCall::ListVideos)?;
        Ok(state.videos.clone())
    }

    async fn upload(&self, url: &str, name: Option<&str>) -> ApiResult<Video> {
        let mut state = self.enter(ApiCall::Upload(url.to_string()))?;
        state.next_id += 1;
        let video = Video {
            id: format!("m-upload-{}", state.next_id),
            name: Some(name.unwrap_or(url).to_string()),
            length: Some(60.0),
            stream_url: Some(format!("https://stream.memory/{}.m3u8", state.next_id)),
            collection_id: Some(self.collection.id.clone()),
        };
        state.videos.push(video.clone());
        Ok(video)
    }

    async fn index_spoken_words(&self, video_id: &str) -> ApiResult<()> {
        let mut state = self.enter(ApiCall::IndexSpokenWords(video_id.to_string()))?;
        state.video(video_id)?;
        if !state.spoken_indexed.insert(video_id.to_string()) {
            return Err(ApiError::Api {
                status: 400,
                message: "Video is already indexed".to_string(),
            });
        }
        Ok(())
    }

    async fn index_scenes(
        &self,
        video_id: &str,
        _config: &SceneIndexConfig,
    ) -> ApiResult<Option<String>> {
        let mut state = self.enter(ApiCall::IndexScenes(video_id.to_string()))?;
        state.video(video_id)?;
        state.next_id += 1;
        let id = format!("s-{}", state.next_id);
        state
            .scene_indexes
            .entry(video_id.to_string())
            .or_default()
            .push(SceneIndex {
                id: id.clone(),
                name: None,
                status: IndexStatus::Processing,
                created_at: Some(Utc::now()),
            });
        Ok(Some(id))
    }

    async fn list_scene_index(&self, video_id: &str) -> ApiResult<Vec<SceneIndex>> {
        let state = self.enter(ApiCall::ListSceneIndex(video_id.to_string()))?;
        state.video(video_id)?;
        Ok(state.scene_indexes.get(video_id).cloned().unwrap_or_default())
    }

    async fn search(&self, target: SearchTarget<'_>, query: &SearchQuery) -> ApiResult<Vec<Shot>> {
        let call = match target {
            SearchTarget::Video(video_id) => ApiCall::Search {
                video_id: Some(video_id.to_string()),
                index_id: None,
                index_type: query.index_type,
            },
            SearchTarget::SceneIndex { video_id, index_id } => ApiCall::Search {
                video_id: Some(video_id.to_string()),
                index_id: Some(index_id.to_string()),
                index_type: IndexType::Scene,
            },
            SearchTarget::Collection => ApiCall::Search {
                video_id: None,
                index_id: None,
                index_type: query.index_type,
            },
        };
        let state = self.enter(call)?;

        match target {
            SearchTarget::Video(video_id) => {
                state.video(video_id)?;
                let (indexed, shots) = match query.index_type {
                    IndexType::SpokenWord => (
                        state.spoken_indexed.contains(video_id),
                        state.spoken.get(video_id),
                    ),
                    IndexType::Scene => {
                        let all = state.scene_indexes.get(video_id).map(Vec::as_slice);
                        let all = all.unwrap_or_default();
                        if !all.iter().any(|i| i.status == IndexStatus::Ready)
                            && all.iter().any(|i| i.status == IndexStatus::Processing)
                        {
                            return Err(ApiError::Processing(format!(
                                "Scene index for {} is processing",
                                video_id
                            )));
                        }
                        (
                            all.iter().any(|i| i.status == IndexStatus::Ready),
                            state.scenes.get(video_id),
                        )
                    }
                };
                if !indexed {
                    return Err(ApiError::NotIndexed(format!(
                        "Video {} is not indexed for {}",
                        video_id, query.index_type
                    )));
                }
                Ok(rank(shots.cloned().unwrap_or_default(), query))
            }
            SearchTarget::SceneIndex { video_id, index_id } => {
                let index = state
                    .scene_indexes
                    .get(video_id)
                    .and_then(|all| all.iter().find(|i| i.id == index_id))
                    .ok_or_else(|| ApiError::NotIndexed(format!("No scene index {}", index_id)))?;
                if index.status != IndexStatus::Ready {
                    return Err(ApiError::Processing(format!(
                        "Scene index {} is processing",
                        index_id
                    )));
                }
                Ok(rank(state.scenes.get(video_id).cloned().unwrap_or_default(), query))
            }
            SearchTarget::Collection => {
                let shots = state
                    .videos
                    .iter()
                    .filter(|v| state.spoken_indexed.contains(&v.id))
                    .flat_map(|v| state.spoken.get(&v.id).cloned().unwrap_or_default())
                    .collect();
                Ok(rank(shots, query))
            }
        }
    }

    async fn get_transcript(
        &self,
        video_id: &str,
        force: bool,
    ) -> ApiResult<Vec<TranscriptSegment>> {
        let mut state = self.enter(ApiCall::GetTranscript {
            video_id: video_id.to_string(),
            force,
        })?;
        state.video(video_id)?;
        if force {
            state.transcripts.insert(video_id.to_string());
        }
        if !state.transcripts.contains(video_id) {
            return Err(ApiError::NoTranscript(
                "Transcript does not exist for the video".to_string(),
            ));
        }
        Ok(state.speech.get(video_id).cloned().unwrap_or_default())
    }

    async fn generate_transcript(&self, video_id: &str, force: bool) -> ApiResult<()> {
        let mut state = self.enter(ApiCall::GenerateTranscript {
            video_id: video_id.to_string(),
            force,
        })?;
        state.video(video_id)?;
        state.transcripts.insert(video_id.to_string());
        Ok(())
    }

    async fn compile(&self, shots: &[Shot]) -> ApiResult<Option<String>> {
        let state = self.enter(ApiCall::Compile(shots.len()))?;
        if shots.is_empty() {
            return Ok(None);
        }
        Ok(Some(format!(
            "https://stream.memory/{}/compiled-{}.m3u8",
            self.collection.id,
            state.calls.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api() -> MemoryVideoApi {
        MemoryVideoApi::new().with_video(
            Video::new("m-1"),
            vec![
                TranscriptSegment::new(0.0, 2.0, "welcome to the pricing talk"),
                TranscriptSegment::new(2.0, 4.0, "thanks for watching"),
            ],
        )
    }

    #[tokio::test]
    async fn test_search_requires_index() {
        let api = api();
        let err = api
            .search(SearchTarget::Video("m-1"), &SearchQuery::new("pricing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotIndexed(_)));

        api.index_spoken_words("m-1").await.unwrap();
        let shots = api
            .search(SearchTarget::Video("m-1"), &SearchQuery::new("pricing"))
            .await
            .unwrap();
        assert_eq!(shots.len(), 1);
        assert_eq!(api.count(ApiOp::Search), 2);
    }

    #[tokio::test]
    async fn test_failures_are_one_shot() {
        let api = api();
        api.fail_next(ApiOp::GetVideo, ApiError::Network("reset".to_string()));

        assert!(api.get_video("m-1").await.is_err());
        assert!(api.get_video("m-1").await.is_ok());
        assert_eq!(
            api.calls(),
            vec![
                ApiCall::GetVideo("m-1".to_string()),
                ApiCall::GetVideo("m-1".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_scene_index_lifecycle() {
        let api = api();
        let id = api
            .index_scenes("m-1", &SceneIndexConfig::default())
            .await
            .unwrap()
            .unwrap();

        let indexes = api.list_scene_index("m-1").await.unwrap();
        assert_eq!(indexes[0].status, IndexStatus::Processing);

        api.complete_scene_index("m-1", &id);
        let indexes = api.list_scene_index("m-1").await.unwrap();
        assert_eq!(indexes[0].status, IndexStatus::Ready);
    }
}
