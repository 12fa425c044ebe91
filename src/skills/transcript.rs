//! Fetch a video's transcript, generating it first if needed.

use crate::error::{Result, SkillError};
use crate::output::SkillOutput;
use crate::request::{TranscriptFormat, TranscriptRequest};
use crate::resolver::resolve_video;
use crate::videodb::{ApiError, TranscriptSegment, VideoApi};
use serde_json::json;
use tracing::{info, instrument};

pub(super) async fn run(api: &dyn VideoApi, req: &TranscriptRequest) -> Result<SkillOutput> {
    let video = resolve_video(api, &req.source).await?;

    let mut segments = fetch_transcript(api, &video.id, req.force).await?;
    if !segments.iter().any(TranscriptSegment::is_speech) {
        return Err(SkillError::NoTranscript(format!(
            "Transcript of video '{}' is empty",
            video.id
        )));
    }
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    let text = plain_text(&segments);

    if req.format == TranscriptFormat::Text {
        return Ok(SkillOutput::Text(text));
    }

    let mut out = json!({
        "success": true,
        "video_id": video.id,
        "video_name": video.display_name(),
        "duration": video.length,
        "segment_count": segments.len(),
        "word_count": text.split_whitespace().count(),
        "transcript": segments,
    });
    if req.format == TranscriptFormat::Both {
        out["text"] = json!(text);
    }
    Ok(SkillOutput::Json(out))
}

/// Fetch the transcript. If none exists yet, generate it and fetch once more.
#[instrument(skip(api))]
async fn fetch_transcript(
    api: &dyn VideoApi,
    video_id: &str,
    force: bool,
) -> Result<Vec<TranscriptSegment>> {
    match api.get_transcript(video_id, force).await {
        Ok(segments) => Ok(segments),
        Err(ApiError::NoTranscript(_) | ApiError::NotFound(_)) => {
            info!("No transcript yet; generating");
            api.generate_transcript(video_id, force)
                .await
                .map_err(transcript_error)?;
            api.get_transcript(video_id, false)
                .await
                .map_err(transcript_error)
        }
        Err(err) => Err(transcript_error(err)),
    }
}

/// A missing resource here means a missing transcript, not a missing video.
fn transcript_error(err: ApiError) -> SkillError {
    match err {
        ApiError::NotFound(msg) => SkillError::NoTranscript(msg),
        other => other.into(),
    }
}

/// Space-joined text of the spoken segments, in order.
fn plain_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .filter(|s| s.is_speech())
        .map(|s| s.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::request::VideoSource;
    use crate::videodb::{ApiCall, ApiOp, MemoryVideoApi, Video};

    fn lecture() -> MemoryVideoApi {
        let mut video = Video::new("m-1");
        video.name = Some("Lecture".to_string());
        video.length = Some(42.5);
        MemoryVideoApi::new().with_video(
            video,
            vec![
                TranscriptSegment::new(4.0, 6.0, "world"),
                TranscriptSegment::new(2.0, 4.0, "-"),
                TranscriptSegment::new(0.0, 2.0, "hello"),
                TranscriptSegment::new(6.0, 7.0, "  "),
                TranscriptSegment::new(7.0, 9.0, "again"),
            ],
        )
    }

    fn req(format: TranscriptFormat, force: bool) -> TranscriptRequest {
        TranscriptRequest {
            source: VideoSource::Id("m-1".to_string()),
            format,
            force,
        }
    }

    #[tokio::test]
    async fn test_text_format_is_ordered_plain_text() {
        let api = lecture().with_transcript("m-1");
        let out = run(&api, &req(TranscriptFormat::Text, false)).await.unwrap();
        assert_eq!(out, SkillOutput::Text("hello world again".to_string()));
    }

    #[tokio::test]
    async fn test_missing_transcript_is_generated_once() {
        let api = lecture();
        let out = run(&api, &req(TranscriptFormat::Timestamped, false))
            .await
            .unwrap();
        let SkillOutput::Json(out) = out else {
            panic!("expected JSON");
        };
        assert_eq!(out["segment_count"], 5);
        assert_eq!(out["word_count"], 3);
        assert_eq!(out["video_name"], "Lecture");
        assert_eq!(out["duration"], 42.5);
        assert_eq!(out["transcript"][0]["text"], "hello");
        assert!(out.get("text").is_none());

        let transcript_calls: Vec<_> = api
            .calls()
            .into_iter()
            .filter(|c| matches!(c.op(), ApiOp::GetTranscript | ApiOp::GenerateTranscript))
            .collect();
        assert_eq!(
            transcript_calls,
            vec![
                ApiCall::GetTranscript {
                    video_id: "m-1".to_string(),
                    force: false
                },
                ApiCall::GenerateTranscript {
                    video_id: "m-1".to_string(),
                    force: false
                },
                ApiCall::GetTranscript {
                    video_id: "m-1".to_string(),
                    force: false
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_both_format() {
        let api = lecture().with_transcript("m-1");
        let SkillOutput::Json(out) = run(&api, &req(TranscriptFormat::Both, false)).await.unwrap()
        else {
            panic!("expected JSON");
        };
        assert_eq!(out["text"], "hello world again");
        assert!(out["transcript"].is_array());
    }

    #[tokio::test]
    async fn test_force_passes_through() {
        let api = lecture().with_transcript("m-1");
        run(&api, &req(TranscriptFormat::Text, true)).await.unwrap();
        assert_eq!(
            api.calls().last(),
            Some(&ApiCall::GetTranscript {
                video_id: "m-1".to_string(),
                force: true
            })
        );
        assert_eq!(api.count(ApiOp::GenerateTranscript), 0);
    }

    #[tokio::test]
    async fn test_no_audio() {
        let api = lecture();
        api.fail_next(
            ApiOp::GenerateTranscript,
            ApiError::NoAudio("Video does not have an audio stream".to_string()),
        );
        let err = run(&api, &req(TranscriptFormat::Text, false))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoAudio);
    }

    #[tokio::test]
    async fn test_empty_transcript() {
        let api = MemoryVideoApi::new()
            .with_video(Video::new("m-1"), vec![TranscriptSegment::new(0.0, 5.0, "-")])
            .with_transcript("m-1");
        let err = run(&api, &req(TranscriptFormat::Text, false))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoTranscript);
    }
}
