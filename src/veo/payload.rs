//! Provider payload construction.
//!
//! Picks a request strategy from the number of reference images and renders
//! the scene description.

use std::fmt;

use base64::prelude::*;
use serde::Serialize;

use crate::collector::GenerationRequest;
use crate::model::{Action, AspectRatio, Gender, ImageInput};

/// Lighter model used for single-image requests. Supports 9:16 and 16:9.
pub const SINGLE_REFERENCE_MODEL: &str = "veo-3.1-fast-generate-preview";

/// Base model used for multi-image requests.
pub const MULTI_REFERENCE_MODEL: &str = "veo-3.1-generate-preview";

/// The multi-reference model accepts at most this many reference images.
pub const MAX_REFERENCE_IMAGES: usize = 3;

/// Output resolution requested for every clip.
pub const DEFAULT_RESOLUTION: &str = "720p";

/// How a request is presented to the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One inline image, caller-selected aspect ratio, fast model.
    SingleReference,
    /// Up to three asset references, forced 16:9, base model.
    MultiReference,
}

impl Strategy {
    pub fn for_image_count(count: usize) -> Self {
        if count > 1 {
            Strategy::MultiReference
        } else {
            Strategy::SingleReference
        }
    }

    pub fn model(self) -> &'static str {
        match self {
            Strategy::SingleReference => SINGLE_REFERENCE_MODEL,
            Strategy::MultiReference => MULTI_REFERENCE_MODEL,
        }
    }
}

/// Image bytes in the provider's inline form.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    /// Base64-encoded image bytes.
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

impl InlineImage {
    pub fn from_input(image: &ImageInput) -> Self {
        Self {
            bytes_base64_encoded: BASE64_STANDARD.encode(image.bytes()),
            mime_type: image.media_type().to_string(),
        }
    }
}

impl fmt::Debug for InlineImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineImage")
            .field("mime_type", &self.mime_type)
            .field("encoded_len", &self.bytes_base64_encoded.len())
            .finish()
    }
}

/// Reference image role understood by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceImage {
    pub image: InlineImage,
    pub reference_type: ReferenceType,
}

/// Output settings for one generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoConfig {
    pub number_of_videos: u32,
    pub resolution: String,
    pub aspect_ratio: AspectRatio,
    pub reference_images: Option<Vec<ReferenceImage>>,
}

/// A generation to submit. The model goes into the URL; the rest is sent as
/// a [`PredictRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPayload {
    pub model: String,
    pub prompt: String,
    pub image: Option<InlineImage>,
    pub config: VideoConfig,
}

impl GenerationPayload {
    /// Number of images carried, inline or as references.
    pub fn image_count(&self) -> usize {
        let refs = self
            .config
            .reference_images
            .as_ref()
            .map(|r| r.len())
            .unwrap_or(0);
        refs + usize::from(self.image.is_some())
    }

    /// Wire body for `models/{model}:predictLongRunning`.
    pub fn to_request(&self) -> PredictRequest<'_> {
        PredictRequest {
            instances: [Instance {
                prompt: &self.prompt,
                image: self.image.as_ref(),
                reference_images: self.config.reference_images.as_deref(),
            }],
            parameters: Parameters {
                aspect_ratio: self.config.aspect_ratio,
                resolution: &self.config.resolution,
                sample_count: self.config.number_of_videos,
            },
        }
    }
}

/// `{"instances": [...], "parameters": {...}}` request envelope.
#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    instances: [Instance<'a>; 1],
    parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Instance<'a> {
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a InlineImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_images: Option<&'a [ReferenceImage]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Parameters<'a> {
    aspect_ratio: AspectRatio,
    resolution: &'a str,
    sample_count: u32,
}

/// Render the scene description for a gender and action.
pub fn compose_prompt(gender: Gender, action: Action) -> String {
    format!(
        "A cinematic video of a {} wearing the clothing/outfit shown in the reference images. \
         The model is {}. High fashion aesthetic, realistic lighting, 4k resolution, \
         highly detailed texture.",
        gender.noun_phrase(),
        action.clause()
    )
}

/// Build the provider payload for a request.
pub fn build_payload(request: &GenerationRequest) -> GenerationPayload {
    let images = request.images();
    let strategy = Strategy::for_image_count(images.len());
    let prompt = compose_prompt(request.gender(), request.action());

    match strategy {
        Strategy::SingleReference => GenerationPayload {
            model: strategy.model().to_string(),
            prompt,
            image: images.first().map(InlineImage::from_input),
            config: VideoConfig {
                number_of_videos: 1,
                resolution: DEFAULT_RESOLUTION.to_string(),
                aspect_ratio: request.aspect_ratio(),
                reference_images: None,
            },
        },
        Strategy::MultiReference => {
            if images.len() > MAX_REFERENCE_IMAGES {
                // Uploads allow four images; only the first three reach the model.
                log::warn!(
                    "Multi-reference mode uses the first {} of {} images; the rest are dropped",
                    MAX_REFERENCE_IMAGES,
                    images.len()
                );
            }
            let references = images
                .iter()
                .take(MAX_REFERENCE_IMAGES)
                .map(|img| ReferenceImage {
                    image: InlineImage::from_input(img),
                    reference_type: ReferenceType::Asset,
                })
                .collect();
            GenerationPayload {
                model: strategy.model().to_string(),
                prompt,
                image: None,
                config: VideoConfig {
                    number_of_videos: 1,
                    resolution: DEFAULT_RESOLUTION.to_string(),
                    aspect_ratio: AspectRatio::Landscape,
                    reference_images: Some(references),
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{ImageCandidate, InputCollector};

    fn request_with(count: u8, ratio: AspectRatio) -> GenerationRequest {
        let mut collector = InputCollector::new();
        collector.set_aspect_ratio(ratio);
        collector.add_images(
            (0..count).map(|i| ImageCandidate::new(format!("{}.png", i), "image/png", vec![i; 8])),
        );
        collector.set_gender(Gender::Female);
        collector.set_action(Action::Walk);
        collector.build_request().unwrap()
    }

    #[test]
    fn test_single_image_keeps_selected_ratio() {
        for ratio in [AspectRatio::Portrait, AspectRatio::Landscape] {
            let payload = build_payload(&request_with(1, ratio));
            assert_eq!(payload.config.aspect_ratio, ratio);
            assert_eq!(payload.model, SINGLE_REFERENCE_MODEL);
            assert!(payload.image.is_some());
            assert!(payload.config.reference_images.is_none());
        }
    }

    #[test]
    fn test_multi_image_always_landscape() {
        for count in 2..=4 {
            let payload = build_payload(&request_with(count, AspectRatio::Portrait));
            assert_eq!(payload.config.aspect_ratio, AspectRatio::Landscape);
            assert_eq!(payload.model, MULTI_REFERENCE_MODEL);
            assert!(payload.image.is_none());
        }
    }

    #[test]
    fn test_multi_image_caps_references_at_three() {
        for count in 2..=4u8 {
            let payload = build_payload(&request_with(count, AspectRatio::Landscape));
            let refs = payload.config.reference_images.unwrap();
            assert_eq!(refs.len(), usize::from(count).min(MAX_REFERENCE_IMAGES));
            assert!(refs.iter().all(|r| r.reference_type == ReferenceType::Asset));
        }
    }

    #[test]
    fn test_fourth_image_is_the_one_dropped() {
        let request = request_with(4, AspectRatio::Landscape);
        let payload = build_payload(&request);
        let refs = payload.config.reference_images.unwrap();
        let expected: Vec<InlineImage> = request.images()[..3]
            .iter()
            .map(InlineImage::from_input)
            .collect();
        let actual: Vec<InlineImage> = refs.into_iter().map(|r| r.image).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_prompt_substitutes_gender_and_action() {
        let prompt = compose_prompt(Gender::Male, Action::Coffee);
        assert!(prompt.starts_with("A cinematic video of a male model wearing"));
        assert!(prompt.contains("The model is sitting in a chic cafe"));
        assert!(prompt.ends_with("highly detailed texture."));
    }

    #[test]
    fn test_single_payload_request_envelope() {
        let payload = build_payload(&request_with(1, AspectRatio::Portrait));
        let json = serde_json::to_value(payload.to_request()).unwrap();
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["instances", "parameters"]);

        let instance = &json["instances"][0];
        assert_eq!(json["instances"].as_array().unwrap().len(), 1);
        assert!(instance["prompt"].as_str().unwrap().contains("female model"));
        assert_eq!(instance["image"]["mimeType"], "image/png");
        assert_eq!(
            instance["image"]["bytesBase64Encoded"],
            BASE64_STANDARD.encode([0u8; 8])
        );
        assert!(instance.get("referenceImages").is_none());

        assert_eq!(json["parameters"]["sampleCount"], 1);
        assert_eq!(json["parameters"]["resolution"], "720p");
        assert_eq!(json["parameters"]["aspectRatio"], "9:16");
        assert!(json.get("model").is_none());
    }

    #[test]
    fn test_multi_payload_request_envelope() {
        let payload = build_payload(&request_with(2, AspectRatio::Portrait));
        let json = serde_json::to_value(payload.to_request()).unwrap();
        let instance = &json["instances"][0];
        assert!(instance.get("image").is_none());
        assert_eq!(instance["referenceImages"][0]["referenceType"], "asset");
        assert_eq!(
            instance["referenceImages"][1]["image"]["mimeType"],
            "image/png"
        );
        assert_eq!(json["parameters"]["aspectRatio"], "16:9");
        assert_eq!(payload.image_count(), 2);
    }
}
