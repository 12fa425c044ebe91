//! Upload utility: add a video by URL, list the collection, inspect a video.

use crate::error::Result;
use crate::output::SkillOutput;
use crate::request::UploadRequest;
use crate::resolver::{get_video, upload_video};
use crate::videodb::VideoApi;
use serde_json::json;

pub(super) async fn run(api: &dyn VideoApi, req: &UploadRequest) -> Result<SkillOutput> {
    let out = match req {
        UploadRequest::Upload { url, name } => {
            let video = upload_video(api, url.as_str(), name.as_deref()).await?;
            json!({
                "success": true,
                "action": "upload",
                "video": {
                    "id": video.id,
                    "name": video.display_name(),
                    "duration": video.length,
                },
                "message": "Video uploaded. Use this video_id with the other skills.",
            })
        }
        UploadRequest::List => {
            let videos = api.list_videos().await?;
            let records: Vec<_> = videos
                .iter()
                .map(|v| {
                    json!({
                        "id": v.id,
                        "name": v.display_name(),
                        "duration": v.length,
                    })
                })
                .collect();
            json!({
                "success": true,
                "action": "list",
                "collection_id": api.collection().id,
                "total": records.len(),
                "videos": records,
            })
        }
        UploadRequest::Info { video_id } => {
            let video = get_video(api, video_id).await?;
            json!({
                "success": true,
                "action": "info",
                "video": {
                    "id": video.id,
                    "name": video.display_name(),
                    "duration": video.length,
                    "stream_url": video.stream_url,
                },
            })
        }
    };

    Ok(SkillOutput::Json(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::videodb::{ApiOp, MemoryVideoApi, Video};
    use url::Url;

    fn json(output: SkillOutput) -> serde_json::Value {
        match output {
            SkillOutput::Json(value) => value,
            SkillOutput::Text(text) => panic!("expected JSON, got text: {}", text),
        }
    }

    #[tokio::test]
    async fn test_upload_then_list() {
        let api = MemoryVideoApi::new().with_video(Video::new("m-1"), vec![]);
        let req = UploadRequest::Upload {
            url: Url::parse("https://example.com/keynote.mp4").unwrap(),
            name: Some("Keynote".to_string()),
        };

        let uploaded = json(run(&api, &req).await.unwrap());
        assert_eq!(uploaded["video"]["name"], "Keynote");
        assert_eq!(uploaded["video"]["duration"], 60.0);

        let listed = json(run(&api, &UploadRequest::List).await.unwrap());
        assert_eq!(listed["total"], 2);
        assert_eq!(listed["videos"][0]["name"], "m-1");
        assert_eq!(listed["videos"][1]["id"], uploaded["video"]["id"]);
    }

    #[tokio::test]
    async fn test_info() {
        let mut video = Video::new("m-7");
        video.stream_url = Some("https://stream.example/m-7.m3u8".to_string());
        let api = MemoryVideoApi::new().with_video(video, vec![]);

        let out = json(
            run(&api, &UploadRequest::Info { video_id: "m-7".to_string() })
                .await
                .unwrap(),
        );
        assert_eq!(out["video"]["stream_url"], "https://stream.example/m-7.m3u8");
        assert!(out["video"]["duration"].is_null());

        let err = run(&api, &UploadRequest::Info { video_id: "m-8".to_string() })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::VideoNotFound);
        assert_eq!(api.count(ApiOp::Upload), 0);
    }
}
