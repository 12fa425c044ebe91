//! Turns a [`VideoSource`] into a remote video handle.

use crate::error::{Result, SkillError};
use crate::request::VideoSource;
use crate::videodb::{ApiError, Video, VideoApi};
use tracing::{debug, info};

/// Resolve a video source: look an ID up, or upload a URL.
pub async fn resolve_video(api: &dyn VideoApi, source: &VideoSource) -> Result<Video> {
    match source {
        VideoSource::Id(video_id) => get_video(api, video_id).await,
        VideoSource::Url(url) => upload_video(api, url.as_str(), None).await,
    }
}

/// Look up an existing video.
pub async fn get_video(api: &dyn VideoApi, video_id: &str) -> Result<Video> {
    debug!(video_id, "Looking up video");
    api.get_video(video_id).await.map_err(|err| match err {
        ApiError::NotFound(_) => SkillError::VideoNotFound(video_id.to_string()),
        other => other.into(),
    })
}

/// Upload a video from a URL. Every failure, including a polling timeout,
/// is an upload failure.
pub async fn upload_video(api: &dyn VideoApi, url: &str, name: Option<&str>) -> Result<Video> {
    info!(url, "Uploading video");
    let video = api
        .upload(url, name)
        .await
        .map_err(|err| SkillError::UploadFailed(err.to_string()))?;
    info!(video_id = %video.id, name = video.display_name(), "Upload complete");
    Ok(video)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::videodb::{ApiCall, ApiOp, MemoryVideoApi};
    use url::Url;

    #[tokio::test]
    async fn test_resolve_by_id() {
        let api = MemoryVideoApi::new().with_video(Video::new("m-1"), vec![]);
        let video = resolve_video(&api, &VideoSource::Id("m-1".to_string()))
            .await
            .unwrap();
        assert_eq!(video.id, "m-1");
        assert_eq!(api.count(ApiOp::Upload), 0);
    }

    #[tokio::test]
    async fn test_unknown_id_is_video_not_found() {
        let api = MemoryVideoApi::new();
        let err = resolve_video(&api, &VideoSource::Id("m-missing".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::VideoNotFound);
        assert!(err.to_string().contains("m-missing"));
    }

    #[tokio::test]
    async fn test_resolve_by_url_uploads() {
        let api = MemoryVideoApi::new();
        let url = Url::parse("https://example.com/talk.mp4").unwrap();
        let video = resolve_video(&api, &VideoSource::Url(url)).await.unwrap();

        assert_eq!(
            api.calls(),
            vec![ApiCall::Upload("https://example.com/talk.mp4".to_string())]
        );
        assert!(api.get_video(&video.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_upload_failure_is_upload_failed() {
        let api = MemoryVideoApi::new();
        api.fail_next(ApiOp::Upload, ApiError::Timeout("job did not finish".to_string()));

        let err = upload_video(&api, "https://example.com/talk.mp4", None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UploadFailed);
    }
}
