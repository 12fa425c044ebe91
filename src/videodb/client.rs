//! HTTP client for the VideoDB REST API.
//!
//! Every response is wrapped in an envelope:
//!
//! ```json
//! {"success": true, "data": {...}, "message": "..."}
//! ```
//!
//! Long-running operations (upload, spoken-word indexing, transcript
//! generation) answer with `{"status": "processing", "data": {"output_url": ...}}`.
//! The client polls that URL until the job reports `done` or `failed`, or the
//! polling budget from [`ApiSettings`] runs out. Scene index creation is the
//! one long-running call that is not awaited.

use super::models::{Collection, SceneIndex, SceneIndexConfig, SearchQuery, SearchTarget, Shot, TranscriptSegment, Video};
use super::{ApiError, ApiResult, IndexStatus, VideoApi};
use crate::config::ApiSettings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

/// Header carrying the API key.
const ACCESS_TOKEN_HEADER: &str = "x-access-token";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = concat!("videodb-skills/", env!("CARGO_PKG_VERSION"));

/// Whether a long-running call is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wait {
    Poll,
    Detached,
}

/// Response envelope.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    message: Option<String>,
    /// Result of a finished asynchronous job.
    #[serde(default)]
    response: Option<Box<Envelope>>,
}

impl Envelope {
    fn output_url(&self) -> Option<&str> {
        self.data
            .as_ref()
            .and_then(|d| d.get("output_url"))
            .and_then(Value::as_str)
    }

    fn message_or(&self, fallback: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// State of an asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobState {
    Running,
    Done,
    Failed,
}

impl JobState {
    fn from_status(status: Option<&str>) -> Self {
        match status.map(|s| s.to_lowercase()).as_deref() {
            Some("processing") | Some("in_queue") | Some("in progress") | Some("in_progress")
            | Some("pending") => JobState::Running,
            Some("done") | Some("success") | None => JobState::Done,
            Some(_) => JobState::Failed,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoList {
    #[serde(default)]
    videos: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

/// Matches within one video.
#[derive(Debug, Deserialize)]
struct SearchHit {
    video_id: String,
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
    #[serde(default, alias = "search_score", alias = "relevance_score")]
    score: Option<f64>,
    #[serde(default)]
    stream_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SceneIndexList {
    #[serde(default)]
    scene_indexes: Vec<SceneIndexRecord>,
}

#[derive(Debug, Deserialize)]
struct SceneIndexRecord {
    #[serde(alias = "id")]
    scene_index_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<SceneIndexRecord> for SceneIndex {
    fn from(record: SceneIndexRecord) -> Self {
        let created_at = record
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));

        SceneIndex {
            id: record.scene_index_id,
            name: record.name,
            status: record
                .status
                .as_deref()
                .map(IndexStatus::from_remote)
                .unwrap_or(IndexStatus::Processing),
            created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    #[serde(default)]
    word_timestamps: Vec<TranscriptSegment>,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    stream_url: Option<String>,
}

/// Shots of one video in a compile request.
#[derive(Debug, Serialize)]
struct CompileEntry<'a> {
    video_id: &'a str,
    collection_id: &'a str,
    shots: Vec<[f64; 2]>,
}

/// VideoDB client bound to the default collection.
pub struct VideoDbClient {
    http: Client,
    base_url: Url,
    api_key: String,
    collection: Collection,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

// Custom Debug to avoid exposing the API key
impl std::fmt::Debug for VideoDbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoDbClient")
            .field("base_url", &self.base_url.as_str())
            .field("collection", &self.collection.id)
            .field("poll_interval", &self.poll_interval)
            .field("max_poll_attempts", &self.max_poll_attempts)
            .finish()
    }
}

impl VideoDbClient {
    /// Connect with an API key and fetch the default collection.
    #[instrument(skip(api_key, settings))]
    pub async fn connect(api_key: &str, base_url: Url, settings: &ApiSettings) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT_VALUE)
            .build()
            .map_err(|e| ApiError::ClientInit(e.to_string()))?;

        let mut client = Self {
            http,
            base_url,
            api_key: api_key.to_string(),
            collection: Collection::default(),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            max_poll_attempts: settings.max_poll_attempts.max(1),
        };

        client.collection = client.get(&["collection", "default"], &[]).await?;
        debug!("Connected to collection {}", client.collection.id);
        Ok(client)
    }

    /// Build the URL of an endpoint from path segments.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::ClientInit(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, String)]) -> ApiResult<T> {
        let url = self.endpoint(segments)?;
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(network_error)?;
        self.handle_response(response, Wait::Poll).await
    }

    async fn post<B, T>(&self, segments: &[&str], body: &B, wait: Wait) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .header(ACCESS_TOKEN_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        self.handle_response(response, wait).await
    }

    /// Unwrap the envelope, mapping failures and following async jobs.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response, wait: Wait) -> ApiResult<T> {
        let status = response.status();
        let envelope = read_envelope(response).await?;

        if !status.is_success() {
            let fallback = status.canonical_reason().unwrap_or("request failed");
            return Err(ApiError::classify(status.as_u16(), envelope.message_or(fallback)));
        }

        if JobState::from_status(envelope.status.as_deref()) == JobState::Running {
            if wait == Wait::Detached {
                return decode(envelope.data);
            }
            return match envelope.output_url() {
                Some(output_url) => {
                    let output_url = output_url.to_string();
                    self.wait_for_job(&output_url).await
                }
                None => Err(ApiError::Processing(
                    envelope.message_or("request is still processing"),
                )),
            };
        }

        if !envelope.success {
            return Err(ApiError::classify(status.as_u16(), envelope.message_or("request failed")));
        }

        decode(envelope.data)
    }

    /// Poll an asynchronous job until it finishes.
    #[instrument(skip(self))]
    async fn wait_for_job<T: DeserializeOwned>(&self, output_url: &str) -> ApiResult<T> {
        for attempt in 1..=self.max_poll_attempts {
            let response = self
                .http
                .get(output_url)
                .header(ACCESS_TOKEN_HEADER, &self.api_key)
                .send()
                .await
                .map_err(network_error)?;

            let status = response.status();
            let envelope = read_envelope(response).await?;
            if !status.is_success() {
                return Err(ApiError::classify(status.as_u16(), envelope.message_or("job lookup failed")));
            }

            match JobState::from_status(envelope.status.as_deref()) {
                JobState::Running => {
                    debug!(attempt, "Job still running");
                    tokio::time::sleep(self.poll_interval).await;
                }
                JobState::Done => {
                    let data = match envelope.response {
                        Some(inner) if !inner.success && inner.message.is_some() => {
                            return Err(ApiError::classify(
                                status.as_u16(),
                                inner.message_or("job failed"),
                            ));
                        }
                        Some(inner) => inner.data,
                        None => envelope.data,
                    };
                    return decode(data);
                }
                JobState::Failed => {
                    let message = envelope
                        .response
                        .as_ref()
                        .and_then(|inner| inner.message.clone())
                        .unwrap_or_else(|| envelope.message_or("job failed"));
                    return Err(ApiError::classify(status.as_u16(), message));
                }
            }
        }

        Err(ApiError::Timeout(format!(
            "job did not finish after {} polls",
            self.max_poll_attempts
        )))
    }

    fn collection_query(&self) -> [(&'static str, String); 1] {
        [("collection_id", self.collection.id.clone())]
    }

    fn search_body(query: &SearchQuery) -> Value {
        json!({
            "query": query.query,
            "search_type": query.search_type,
            "index_type": query.index_type,
            "result_threshold": query.result_threshold,
            "score_threshold": query.score_threshold,
        })
    }
}

async fn read_envelope(response: Response) -> ApiResult<Envelope> {
    let status = response.status();
    let body = response.text().await.map_err(network_error)?;
    if body.trim().is_empty() {
        return Ok(Envelope::default());
    }

    match serde_json::from_str::<Envelope>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Ok(Envelope {
            message: Some(body),
            ..Envelope::default()
        }),
        Err(e) => Err(ApiError::Api {
            status: status.as_u16(),
            message: format!("Failed to parse response: {}", e),
        }),
    }
}

fn decode<T: DeserializeOwned>(data: Option<Value>) -> ApiResult<T> {
    serde_json::from_value(data.unwrap_or(Value::Null)).map_err(|e| ApiError::Api {
        status: 200,
        message: format!("Unexpected response shape: {}", e),
    })
}

fn network_error(err: reqwest::Error) -> ApiError {
    ApiError::Network(err.to_string())
}

#[async_trait]
impl VideoApi for VideoDbClient {
    fn collection(&self) -> &Collection {
        &self.collection
    }

    #[instrument(skip(self))]
    async fn get_video(&self, video_id: &str) -> ApiResult<Video> {
        self.get(&["video", video_id], &self.collection_query()).await
    }

    #[instrument(skip(self))]
    async fn list_videos(&self) -> ApiResult<Vec<Video>> {
        let list: VideoList = self.get(&["video"], &self.collection_query()).await?;
        Ok(list.videos)
    }

    #[instrument(skip(self))]
    async fn upload(&self, url: &str, name: Option<&str>) -> ApiResult<Video> {
        info!("Uploading {}", url);
        let body = json!({
            "url": url,
            "name": name,
            "media_type": "video",
        });
        let collection_id = self.collection.id.clone();
        self.post(&["collection", collection_id.as_str(), "upload"], &body, Wait::Poll)
            .await
    }

    #[instrument(skip(self))]
    async fn index_spoken_words(&self, video_id: &str) -> ApiResult<()> {
        info!("Indexing spoken words of {}", video_id);
        let body = json!({ "index_type": "spoken_word" });
        let _: Value = self.post(&["video", video_id, "index"], &body, Wait::Poll).await?;
        Ok(())
    }

    #[instrument(skip(self, config))]
    async fn index_scenes(
        &self,
        video_id: &str,
        config: &SceneIndexConfig,
    ) -> ApiResult<Option<String>> {
        info!("Creating scene index for {}", video_id);
        let body = json!({
            "extraction_type": config.extraction_type,
            "extraction_config": config.extraction_config(),
            "prompt": config.prompt,
        });
        let data: Value = self
            .post(&["video", video_id, "index", "scene"], &body, Wait::Detached)
            .await?;
        Ok(data
            .get("scene_index_id")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    #[instrument(skip(self))]
    async fn list_scene_index(&self, video_id: &str) -> ApiResult<Vec<SceneIndex>> {
        let list: SceneIndexList = self.get(&["video", video_id, "index", "scene"], &[]).await?;
        Ok(list.scene_indexes.into_iter().map(SceneIndex::from).collect())
    }

    #[instrument(skip(self, query), fields(query = %query.query))]
    async fn search(&self, target: SearchTarget<'_>, query: &SearchQuery) -> ApiResult<Vec<Shot>> {
        let mut body = Self::search_body(query);
        let collection_id = self.collection.id.clone();
        let segments: Vec<&str> = match target {
            SearchTarget::Video(video_id) => vec!["video", video_id, "search"],
            SearchTarget::SceneIndex { video_id, index_id } => {
                body["index_type"] = json!("scene");
                body["scene_index_id"] = json!(index_id);
                vec!["video", video_id, "search"]
            }
            SearchTarget::Collection => vec!["collection", collection_id.as_str(), "search"],
        };

        let response: SearchResponse = self.post(&segments, &body, Wait::Poll).await?;

        let shots: Vec<Shot> = response
            .results
            .into_iter()
            .flat_map(|hit| {
                let video_id = hit.video_id;
                hit.docs.into_iter().map(move |doc| Shot {
                    video_id: video_id.clone(),
                    start: doc.start,
                    end: doc.end,
                    text: doc.text,
                    score: doc.score,
                    stream_url: doc.stream_url,
                })
            })
            .collect();

        debug!("Search returned {} shots", shots.len());
        Ok(shots)
    }

    #[instrument(skip(self))]
    async fn get_transcript(
        &self,
        video_id: &str,
        force: bool,
    ) -> ApiResult<Vec<TranscriptSegment>> {
        let response: TranscriptResponse = self
            .get(&["video", video_id, "transcription"], &[("force", force.to_string())])
            .await?;
        Ok(response.word_timestamps)
    }

    #[instrument(skip(self))]
    async fn generate_transcript(&self, video_id: &str, force: bool) -> ApiResult<()> {
        info!("Generating transcript for {}", video_id);
        let body = json!({ "force": force });
        let _: Value = self
            .post(&["video", video_id, "transcription"], &body, Wait::Poll)
            .await?;
        Ok(())
    }

    #[instrument(skip(self, shots), fields(count = shots.len()))]
    async fn compile(&self, shots: &[Shot]) -> ApiResult<Option<String>> {
        if shots.is_empty() {
            return Ok(None);
        }

        // One entry per video, in order of first appearance
        let mut entries: Vec<CompileEntry<'_>> = Vec::new();
        for shot in shots {
            let range = [shot.start, shot.end];
            match entries.iter_mut().find(|e| e.video_id == shot.video_id) {
                Some(entry) => entry.shots.push(range),
                None => entries.push(CompileEntry {
                    video_id: &shot.video_id,
                    collection_id: &self.collection.id,
                    shots: vec![range],
                }),
            }
        }

        let response: StreamResponse = self.post(&["compile"], &entries, Wait::Poll).await?;
        Ok(response.stream_url)
    }
}
