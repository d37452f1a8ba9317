//! Veo video generation integration.
//!
//! Builds provider payloads from generation requests and talks to the hosted
//! video model: submit, poll the long-running operation, download the clip.

mod client;
mod operation;
mod payload;

pub use client::{append_key, is_auth_error, VeoClient, VeoError, DEFAULT_API_BASE_URL};
pub use operation::{
    GenerateVideoResponse, GeneratedVideo, OperationError, OperationResponse, OperationSnapshot,
    VideoAsset, VideoRef, VideoService, DEFAULT_VIDEO_MIME_TYPE,
};
pub use payload::{
    build_payload, compose_prompt, GenerationPayload, InlineImage, PredictRequest, ReferenceImage,
    ReferenceType, Strategy, VideoConfig, DEFAULT_RESOLUTION, MAX_REFERENCE_IMAGES,
    MULTI_REFERENCE_MODEL, SINGLE_REFERENCE_MODEL,
};
