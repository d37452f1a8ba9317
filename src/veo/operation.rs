//! Long-running operation types and the video service seam.

use async_trait::async_trait;
use serde::Deserialize;

use super::client::VeoError;
use super::payload::GenerationPayload;
use crate::keys::ApiKey;

/// Default media type assumed for downloaded clips.
pub const DEFAULT_VIDEO_MIME_TYPE: &str = "video/mp4";

/// Provider-side view of a generation job, as returned by submit and poll.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationSnapshot {
    /// Operation resource name used for polling.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<OperationError>,
    #[serde(default)]
    pub response: Option<OperationResponse>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    #[serde(default)]
    pub generate_video_response: Option<GenerateVideoResponse>,
}

/// `PredictLongRunningResponse` payload of a finished video operation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedVideo>,
    /// Safety filter explanations when samples were withheld.
    #[serde(default)]
    pub rai_media_filtered_reasons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GeneratedVideo {
    #[serde(default)]
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRef {
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

impl OperationSnapshot {
    fn video_response(&self) -> Option<&GenerateVideoResponse> {
        self.response.as_ref()?.generate_video_response.as_ref()
    }

    /// Download link of the first generated video, if present and non-empty.
    pub fn video_uri(&self) -> Option<&str> {
        self.video_response()?
            .generated_samples
            .first()?
            .video
            .as_ref()?
            .uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
    }

    /// Safety filter reasons reported instead of a video, joined for display.
    pub fn filtered_reason(&self) -> Option<String> {
        let reasons = &self.video_response()?.rai_media_filtered_reasons;
        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }
}

/// Downloaded clip bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoAsset {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// A hosted video generation service.
///
/// Implemented by [`super::VeoClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait VideoService: Send + Sync {
    /// Submit a payload and return the initial operation state.
    async fn submit(
        &self,
        key: &ApiKey,
        payload: &GenerationPayload,
    ) -> Result<OperationSnapshot, VeoError>;

    /// Re-fetch an operation by name.
    async fn poll(&self, key: &ApiKey, operation: &str) -> Result<OperationSnapshot, VeoError>;

    /// Download a finished clip. The key is appended to the link.
    async fn fetch_video(&self, key: &ApiKey, uri: &str) -> Result<VideoAsset, VeoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_snapshot_deserialization() {
        let json = r#"{"name": "operations/abc"}"#;
        let op: OperationSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(op.name, "operations/abc");
        assert!(!op.done);
        assert!(op.video_uri().is_none());
    }

    #[test]
    fn test_done_snapshot_with_video() {
        let json = r#"{
            "name": "models/veo-3.1-fast-generate-preview/operations/abc",
            "done": true,
            "response": {
                "@type": "type.googleapis.com/google.ai.generativelanguage.v1beta.PredictLongRunningResponse",
                "generateVideoResponse": {
                    "generatedSamples": [
                        {"video": {"uri": "https://files.example/v1beta/files/x:download?alt=media"}}
                    ]
                }
            }
        }"#;
        let op: OperationSnapshot = serde_json::from_str(json).unwrap();
        assert!(op.done);
        assert_eq!(
            op.video_uri(),
            Some("https://files.example/v1beta/files/x:download?alt=media")
        );
        assert!(op.filtered_reason().is_none());
    }

    #[test]
    fn test_filtered_snapshot_reports_reasons() {
        let json = r#"{
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "raiMediaFilteredCount": 1,
                    "raiMediaFilteredReasons": ["Video blocked by safety filters."]
                }
            }
        }"#;
        let op: OperationSnapshot = serde_json::from_str(json).unwrap();
        assert!(op.video_uri().is_none());
        assert_eq!(
            op.filtered_reason().as_deref(),
            Some("Video blocked by safety filters.")
        );
    }

    #[test]
    fn test_done_snapshot_with_error() {
        let json = r#"{"done": true, "error": {"code": 3, "message": "blocked"}}"#;
        let op: OperationSnapshot = serde_json::from_str(json).unwrap();
        let error = op.error.unwrap();
        assert_eq!(error.code, Some(3));
        assert_eq!(error.message.as_deref(), Some("blocked"));
    }

    #[test]
    fn test_empty_uri_counts_as_missing() {
        let json = r#"{"done": true, "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": ""}}]}}}"#;
        let op: OperationSnapshot = serde_json::from_str(json).unwrap();
        assert!(op.video_uri().is_none());
    }

    #[test]
    fn test_empty_video_list_counts_as_missing() {
        let json = r#"{"done": true, "response": {"generateVideoResponse": {"generatedSamples": []}}}"#;
        let op: OperationSnapshot = serde_json::from_str(json).unwrap();
        assert!(op.video_uri().is_none());
    }
}
