//! Domain types shared by the input collector and the generation orchestrator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Media types accepted for reference images.
pub const ACCEPTED_MEDIA_TYPES: &[&str] = &["image/png", "image/jpeg", "image/webp"];

/// Gender of the generated fashion model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

impl Gender {
    /// Noun phrase substituted into the scene description.
    pub fn noun_phrase(self) -> &'static str {
        match self {
            Gender::Female => "female model",
            Gender::Male => "male model",
        }
    }
}

/// Action preset performed by the model in the clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Full-body runway walk.
    Walk,
    /// Upper-body cafe shot with a cup of coffee.
    Coffee,
    /// Studio stretch showing off the fit.
    Stretch,
}

impl Action {
    /// Action clause substituted into the scene description.
    pub fn clause(self) -> &'static str {
        match self {
            Action::Walk => "walking confidently down a high-fashion runway, full body shot",
            Action::Coffee => {
                "sitting in a chic cafe holding a cup of coffee, looking relaxed, upper body shot"
            }
            Action::Stretch => {
                "standing in a bright studio, stretching arms elegantly, showing off the outfit"
            }
        }
    }
}

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "16:9")]
    Landscape,
}

impl AspectRatio {
    /// Wire representation used by the provider ("9:16" or "16:9").
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Portrait => "9:16",
            AspectRatio::Landscape => "16:9",
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "9:16" => Ok(AspectRatio::Portrait),
            "16:9" => Ok(AspectRatio::Landscape),
            other => Err(format!(
                "Unknown aspect ratio '{}'. Use 9:16 or 16:9",
                other
            )),
        }
    }
}

/// Content-derived identity of an uploaded image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageId(String);

impl ImageId {
    /// Hash image bytes into an id: the first 16 bytes of SHA-256, hex encoded.
    pub fn for_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        ImageId(hex::encode(&digest[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated reference image held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageInput {
    id: ImageId,
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageInput {
    /// Wrap already-validated bytes. Validation lives in the collector.
    pub(crate) fn new(media_type: String, bytes: Vec<u8>) -> Self {
        Self {
            id: ImageId::for_bytes(&bytes),
            media_type,
            bytes,
        }
    }

    pub fn id(&self) -> &ImageId {
        &self.id
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

impl fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageInput")
            .field("id", &self.id)
            .field("media_type", &self.media_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}
