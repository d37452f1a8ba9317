//! Input collector for generation requests.
//!
//! Accumulates up to four validated reference images together with the gender,
//! action and aspect-ratio selections, and turns them into a [`GenerationRequest`].
//! Holding more than one image forces a 16:9 aspect ratio; the constraint is
//! re-applied whenever the image count changes.

use std::path::{Path, PathBuf};

use crate::model::{Action, AspectRatio, Gender, ImageId, ImageInput, ACCEPTED_MEDIA_TYPES};

/// Maximum number of reference images a request may carry.
pub const MAX_IMAGES: usize = 4;

/// Upper size bound for a single image (5 MiB). Images of this size or larger are rejected.
pub const MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Errors raised while collecting inputs. None of these ever reach the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("'{name}' has unsupported type '{media_type}' (accepted: PNG, JPEG, WebP)")]
    InvalidType { name: String, media_type: String },

    #[error("'{name}' is {size} bytes; images must be smaller than 5 MB")]
    TooLarge { name: String, size: u64 },

    #[error("'{name}' rejected: at most 4 images can be uploaded")]
    CapacityExceeded { name: String },

    #[error("At least one reference image is required")]
    NoImages,

    #[error("Too many reference images: {count} (maximum 4)")]
    TooManyImages { count: usize },

    #[error("Model gender has not been selected")]
    MissingGender,

    #[error("Model action has not been selected")]
    MissingAction,

    #[error("Failed to read image '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A file offered for upload, not yet validated.
#[derive(Clone)]
pub struct ImageCandidate {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageCandidate {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read a candidate from disk, deriving the media type from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, CollectorError> {
        let bytes = std::fs::read(path).map_err(|source| CollectorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, media_type_for_path(path), bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn validate(&self) -> Result<(), CollectorError> {
        if !ACCEPTED_MEDIA_TYPES.contains(&self.media_type.as_str()) {
            return Err(CollectorError::InvalidType {
                name: self.name.clone(),
                media_type: self.media_type.clone(),
            });
        }
        if self.size() >= MAX_IMAGE_BYTES {
            return Err(CollectorError::TooLarge {
                name: self.name.clone(),
                size: self.size(),
            });
        }
        Ok(())
    }
}

/// Guess a media type from a file extension.
pub fn media_type_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// A fully specified generation intent. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    images: Vec<ImageInput>,
    gender: Gender,
    action: Action,
    aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    /// Build a request, enforcing 1..=4 images. With more than one image the
    /// aspect ratio is forced to 16:9.
    pub fn new(
        images: Vec<ImageInput>,
        gender: Gender,
        action: Action,
        aspect_ratio: AspectRatio,
    ) -> Result<Self, CollectorError> {
        if images.is_empty() {
            return Err(CollectorError::NoImages);
        }
        if images.len() > MAX_IMAGES {
            return Err(CollectorError::TooManyImages {
                count: images.len(),
            });
        }
        let aspect_ratio = if images.len() > 1 {
            AspectRatio::Landscape
        } else {
            aspect_ratio
        };
        Ok(Self {
            images,
            gender,
            action,
            aspect_ratio,
        })
    }

    pub fn images(&self) -> &[ImageInput] {
        &self.images
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    pub fn is_multi_reference(&self) -> bool {
        self.images.len() > 1
    }
}

/// Collects and validates user selections ahead of a submission.
#[derive(Debug, Default)]
pub struct InputCollector {
    images: Vec<ImageInput>,
    gender: Option<Gender>,
    action: Option<Action>,
    aspect_ratio: AspectRatio,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append candidates in arrival order.
    ///
    /// Returns one result per candidate: the id of the stored image, or the
    /// reason it was rejected. Candidates beyond the image cap are rejected with
    /// [`CollectorError::CapacityExceeded`] and leave the stored images untouched.
    pub fn add_images<I>(&mut self, candidates: I) -> Vec<Result<ImageId, CollectorError>>
    where
        I: IntoIterator<Item = ImageCandidate>,
    {
        let results: Vec<_> = candidates
            .into_iter()
            .map(|candidate| self.add_image(candidate))
            .collect();
        self.enforce_aspect_ratio();
        results
    }

    fn add_image(&mut self, candidate: ImageCandidate) -> Result<ImageId, CollectorError> {
        candidate.validate()?;
        if self.images.len() >= MAX_IMAGES {
            log::warn!("Rejecting '{}': image cap reached", candidate.name);
            return Err(CollectorError::CapacityExceeded {
                name: candidate.name,
            });
        }
        let image = ImageInput::new(candidate.media_type, candidate.bytes);
        let id = image.id().clone();
        log::debug!(
            "Accepted image '{}' ({} bytes) as {}",
            candidate.name,
            image.size(),
            id
        );
        self.images.push(image);
        Ok(id)
    }

    /// Remove an image by id. Removing an unknown id is a no-op.
    pub fn remove_image(&mut self, id: &ImageId) {
        if let Some(pos) = self.images.iter().position(|img| img.id() == id) {
            self.images.remove(pos);
        }
        self.enforce_aspect_ratio();
    }

    /// Request an aspect ratio and return the one in effect.
    ///
    /// 9:16 is refused while more than one image is held.
    pub fn set_aspect_ratio(&mut self, ratio: AspectRatio) -> AspectRatio {
        if ratio == AspectRatio::Portrait && self.images.len() > 1 {
            log::debug!("Ignoring 9:16 request: multi-image mode requires 16:9");
        } else {
            self.aspect_ratio = ratio;
        }
        self.enforce_aspect_ratio();
        self.aspect_ratio
    }

    pub fn set_gender(&mut self, gender: Gender) {
        self.gender = Some(gender);
    }

    pub fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    fn enforce_aspect_ratio(&mut self) {
        if self.images.len() > 1 {
            self.aspect_ratio = AspectRatio::Landscape;
        }
    }

    pub fn images(&self) -> &[ImageInput] {
        &self.images
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// True once there is at least one image and both selections are made.
    pub fn can_submit(&self) -> bool {
        !self.images.is_empty() && self.gender.is_some() && self.action.is_some()
    }

    /// Snapshot the current selections into a request.
    pub fn build_request(&self) -> Result<GenerationRequest, CollectorError> {
        let gender = self.gender.ok_or(CollectorError::MissingGender)?;
        let action = self.action.ok_or(CollectorError::MissingAction)?;
        GenerationRequest::new(self.images.clone(), gender, action, self.aspect_ratio)
    }

    /// Discard every image and selection.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
