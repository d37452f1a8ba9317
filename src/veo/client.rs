//! VeoClient - handles communication with the Gemini video generation API.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;

use super::operation::{OperationSnapshot, VideoAsset, VideoService, DEFAULT_VIDEO_MIME_TYPE};
use super::payload::GenerationPayload;
use crate::keys::ApiKey;

/// Default base URL for the Generative Language API.
pub const DEFAULT_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Header carrying the API key on submit and poll requests.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Default timeout for HTTP requests (120 seconds, downloads included).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Keywords that indicate a missing, invalid or unauthorized key.
const AUTH_ERROR_SIGNATURES: &[&str] = &[
    "requested entity was not found",
    "entity not found",
    "api key not valid",
    "api_key_invalid",
    "invalid api key",
    "permission_denied",
    "permission denied",
    "unauthenticated",
];

/// Check if an error message indicates the key must be (re)selected.
pub fn is_auth_error(error_text: &str) -> bool {
    let lower = error_text.to_lowercase();
    AUTH_ERROR_SIGNATURES
        .iter()
        .any(|signature| lower.contains(signature))
}

/// Append the API key as a query parameter to a download link.
pub fn append_key(uri: &str, key: &ApiKey) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!("{}{}key={}", uri, separator, key.expose())
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Pull a human-readable message out of an error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) if !envelope.error.message.contains(&status) => {
                format!("{} ({})", envelope.error.message, status)
            }
            _ => envelope.error.message,
        },
        Err(_) if body.trim().is_empty() => "Unknown error".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

/// Errors that can occur while talking to the video service.
#[derive(Debug, thiserror::Error)]
pub enum VeoError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Unauthorized (status {status}): {message}")]
    Unauthorized { status: u16, message: String },

    #[error("{message}")]
    ApiError { status: u16, message: String },

    #[error("Video download failed with status {status}: {reason}")]
    DownloadFailed { status: u16, reason: String },
}

impl VeoError {
    /// Whether this failure means the key has to be (re)selected.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            VeoError::Unauthorized { .. } => true,
            VeoError::ApiError { message, .. } => is_auth_error(message),
            VeoError::HttpError(_) | VeoError::DownloadFailed { .. } => false,
        }
    }
}

/// Client for the Gemini video generation endpoints.
pub struct VeoClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl VeoClient {
    /// Create a client against the public API.
    pub fn new() -> Result<Self, VeoError> {
        Self::with_base_url(DEFAULT_API_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL. Useful for testing against a mock server.
    pub fn with_base_url(base_url: String) -> Result<Self, VeoError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn submit_url(&self, model: &str) -> String {
        format!("{}/models/{}:predictLongRunning", self.base_url, model)
    }

    fn operation_url(&self, operation: &str) -> String {
        format!("{}/{}", self.base_url, operation.trim_start_matches('/'))
    }

    /// Turn a non-success response into the matching error.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, VeoError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = error_message(&body);

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            log::warn!("Video service rejected the API key ({})", status);
            return Err(VeoError::Unauthorized {
                status: status.as_u16(),
                message,
            });
        }

        log::warn!("Video service returned {}: {}", status, message);
        Err(VeoError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl VideoService for VeoClient {
    /// Submit a generation request.
    ///
    /// Sends a POST to `{base}/models/{model}:predictLongRunning` and returns the
    /// long-running operation the service created.
    ///
    /// # Errors
    ///
    /// Returns `VeoError::Unauthorized` on 401/403, `VeoError::ApiError` for
    /// other error responses, or `VeoError::HttpError` if the request fails.
    async fn submit(
        &self,
        key: &ApiKey,
        payload: &GenerationPayload,
    ) -> Result<OperationSnapshot, VeoError> {
        let url = self.submit_url(&payload.model);
        log::info!(
            "Submitting generation to {} ({} image(s), {})",
            payload.model,
            payload.image_count(),
            payload.config.aspect_ratio
        );

        let response = self
            .http_client
            .post(&url)
            .header(API_KEY_HEADER, key.expose())
            .json(&payload.to_request())
            .send()
            .await?;

        let operation: OperationSnapshot = Self::check_status(response).await?.json().await?;
        log::info!("Generation submitted, operation: {}", operation.name);
        Ok(operation)
    }

    /// Check generation status by fetching the operation resource.
    async fn poll(&self, key: &ApiKey, operation: &str) -> Result<OperationSnapshot, VeoError> {
        let response = self
            .http_client
            .get(self.operation_url(operation))
            .header(API_KEY_HEADER, key.expose())
            .send()
            .await?;

        let snapshot: OperationSnapshot = Self::check_status(response).await?.json().await?;
        log::debug!("Operation {} done={}", operation, snapshot.done);
        Ok(snapshot)
    }

    /// Download a finished video into memory.
    ///
    /// The link returned by the service is time-limited and must carry the
    /// same key used for submission.
    async fn fetch_video(&self, key: &ApiKey, uri: &str) -> Result<VideoAsset, VeoError> {
        let response = self.http_client.get(append_key(uri, key)).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(VeoError::DownloadFailed {
                status: status.as_u16(),
                reason: status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string(),
            });
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .filter(|v| v.starts_with("video/"))
            .unwrap_or(DEFAULT_VIDEO_MIME_TYPE)
            .to_string();

        let mut bytes = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk?);
        }

        log::info!("Downloaded {} bytes ({})", bytes.len(), mime_type);
        Ok(VideoAsset { bytes, mime_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> ApiKey {
        ApiKey::new("test-key").unwrap()
    }

    #[test]
    fn test_new_uses_default_base_url() {
        let client = VeoClient::new().unwrap();
        assert_eq!(client.base_url(), DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client = VeoClient::with_base_url("http://localhost:1234/".to_string()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
    }

    #[test]
    fn test_submit_url_format() {
        let client = VeoClient::new().unwrap();
        assert_eq!(
            client.submit_url("veo-3.1-fast-generate-preview"),
            "https://generativelanguage.googleapis.com/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"
        );
    }

    #[test]
    fn test_operation_url_format() {
        let client = VeoClient::with_base_url("http://mock".to_string()).unwrap();
        assert_eq!(
            client.operation_url("models/veo/operations/abc"),
            "http://mock/models/veo/operations/abc"
        );
        assert_eq!(client.operation_url("/operations/x"), "http://mock/operations/x");
    }

    #[test]
    fn test_append_key_to_query_link() {
        assert_eq!(
            append_key("https://files/v:download?alt=media", &key()),
            "https://files/v:download?alt=media&key=test-key"
        );
    }

    #[test]
    fn test_append_key_to_bare_link() {
        assert_eq!(
            append_key("https://files/v.mp4", &key()),
            "https://files/v.mp4?key=test-key"
        );
    }

    #[test]
    fn test_is_auth_error_matches_signatures() {
        assert!(is_auth_error("Requested entity was not found."));
        assert!(is_auth_error("API key not valid. Please pass a valid API key."));
        assert!(is_auth_error("PERMISSION_DENIED"));
        assert!(!is_auth_error("Quota exceeded"));
    }

    #[test]
    fn test_error_message_from_google_envelope() {
        let body = r#"{"error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}}"#;
        assert_eq!(
            error_message(body),
            "Requested entity was not found. (NOT_FOUND)"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_raw_body() {
        assert_eq!(error_message("gateway exploded"), "gateway exploded");
        assert_eq!(error_message("  "), "Unknown error");
    }

    #[test]
    fn test_veo_error_auth_classification() {
        let not_found = VeoError::ApiError {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        };
        assert!(not_found.is_auth_failure());

        let quota = VeoError::ApiError {
            status: 429,
            message: "Resource exhausted".to_string(),
        };
        assert!(!quota.is_auth_failure());

        let unauthorized = VeoError::Unauthorized {
            status: 401,
            message: "nope".to_string(),
        };
        assert!(unauthorized.is_auth_failure());
    }

    #[test]
    fn test_veo_error_display() {
        let error = VeoError::ApiError {
            status: 400,
            message: "Prompt blocked".to_string(),
        };
        assert_eq!(error.to_string(), "Prompt blocked");

        let error = VeoError::DownloadFailed {
            status: 403,
            reason: "Forbidden".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Video download failed with status 403: Forbidden"
        );
    }
}
