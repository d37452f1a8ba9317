//! Generation state machine.
//!
//! Drives one request through submit, poll and download against an injected
//! [`VideoService`], asking an injected [`KeyProvider`] for credentials. Every
//! transition emits a localized [`Notification`].

use std::fmt;
use std::future::Future;
use std::io;
use std::path::Path;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::collector::GenerationRequest;
use crate::keys::{ApiKey, KeyError, KeyProvider};
use crate::messages::{Language, Message};
use crate::veo::{build_payload, OperationSnapshot, VeoError, VideoAsset, VideoService};

/// Default wait between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// A finished clip held in memory until the next generation or reset.
pub struct VideoHandle {
    bytes: Vec<u8>,
    mime_type: String,
    source_uri: String,
}

impl VideoHandle {
    pub fn new(asset: VideoAsset, source_uri: impl Into<String>) -> Self {
        Self {
            bytes: asset.bytes,
            mime_type: asset.mime_type,
            source_uri: source_uri.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Download link without credentials.
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Short content hash, stable for identical bytes.
    pub fn content_id(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        hex::encode(&digest[..8])
    }

    /// File extension matching the media type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "video/webm" => "webm",
            "video/quicktime" => "mov",
            _ => "mp4",
        }
    }

    pub fn default_file_name(&self) -> String {
        format!("catwalk-{}.{}", self.content_id(), self.extension())
    }

    /// Write the clip to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)?;
        log::info!("Saved video to {:?} ({} bytes)", path, self.bytes.len());
        Ok(())
    }
}

impl fmt::Debug for VideoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoHandle")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .field("source_uri", &self.source_uri)
            .finish()
    }
}

impl Drop for VideoHandle {
    fn drop(&mut self) {
        log::debug!("Releasing video handle ({} bytes)", self.bytes.len());
    }
}

/// Why a generation did not produce a video.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("API key missing, invalid or unauthorized: {message}")]
    AuthRequired { message: String },

    #[error("Video generation failed: {message}")]
    Provider { message: String },

    #[error("Generation finished without a video link")]
    ResponseIncomplete,

    #[error("Video download failed: {message}")]
    Transport { message: String },

    #[error("Video generation timed out")]
    TimedOut,

    #[error("Video generation cancelled")]
    Cancelled,
}

impl GenerationError {
    /// One-line description for the user. A provider failure without a
    /// message falls back to the localized generic text.
    pub fn describe(&self, lang: Language) -> String {
        match self {
            GenerationError::Provider { message } if message.trim().is_empty() => {
                Message::ErrorGen.text(lang).to_string()
            }
            other => other.to_string(),
        }
    }

    /// Notification shown for this failure.
    pub fn message_kind(&self) -> Message {
        match self {
            GenerationError::AuthRequired { .. } => Message::ErrorKey,
            GenerationError::Provider { .. } => Message::ErrorGen,
            GenerationError::ResponseIncomplete => Message::ErrorLink,
            GenerationError::Transport { .. } => Message::ErrorDownload,
            GenerationError::TimedOut => Message::TimedOut,
            GenerationError::Cancelled => Message::Cancelled,
        }
    }
}

/// Where a generation currently stands.
#[derive(Debug)]
pub enum GenerationState {
    Idle,
    Submitting,
    /// A key must be selected before anything else can happen.
    AwaitingKey { trial_exhausted: bool },
    Polling { operation: String, ticks: u32 },
    Succeeded(VideoHandle),
    Failed(GenerationError),
}

/// Payload-free tag of a [`GenerationState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Idle,
    Submitting,
    AwaitingKey,
    Polling,
    Succeeded,
    Failed,
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StateKind::Idle => "idle",
            StateKind::Submitting => "submitting",
            StateKind::AwaitingKey => "awaiting key",
            StateKind::Polling => "polling",
            StateKind::Succeeded => "succeeded",
            StateKind::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

impl GenerationState {
    pub fn kind(&self) -> StateKind {
        match self {
            GenerationState::Idle => StateKind::Idle,
            GenerationState::Submitting => StateKind::Submitting,
            GenerationState::AwaitingKey { .. } => StateKind::AwaitingKey,
            GenerationState::Polling { .. } => StateKind::Polling,
            GenerationState::Succeeded(_) => StateKind::Succeeded,
            GenerationState::Failed(_) => StateKind::Failed,
        }
    }

    pub fn video(&self) -> Option<&VideoHandle> {
        match self {
            GenerationState::Succeeded(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&GenerationError> {
        match self {
            GenerationState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// A user-visible status update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: Message,
    pub text: String,
}

impl Notification {
    pub fn new(message: Message, lang: Language) -> Self {
        Self {
            message,
            text: message.text(lang).to_string(),
        }
    }

    /// Provider failures show the provider's own message when there is one.
    pub fn for_error(error: &GenerationError, lang: Language) -> Self {
        match error {
            GenerationError::Provider { message } if !message.trim().is_empty() => Self {
                message: Message::ErrorGen,
                text: message.clone(),
            },
            other => Self::new(other.message_kind(), lang),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A transition: the next state and what to tell the user about it.
#[derive(Debug)]
pub struct Step {
    pub next: GenerationState,
    pub notification: Notification,
}

impl Step {
    /// Route a failure. Auth failures wait for a key; everything else fails.
    pub fn from_error(error: GenerationError, has_generated: bool, lang: Language) -> Self {
        match error {
            GenerationError::AuthRequired { .. } => {
                let message = if has_generated {
                    Message::TrialExhausted
                } else {
                    Message::ErrorKey
                };
                Step {
                    next: GenerationState::AwaitingKey {
                        trial_exhausted: has_generated,
                    },
                    notification: Notification::new(message, lang),
                }
            }
            other => Step {
                notification: Notification::for_error(&other, lang),
                next: GenerationState::Failed(other),
            },
        }
    }

    /// No key selected yet.
    pub fn key_required(has_generated: bool, lang: Language) -> Self {
        let message = if has_generated {
            Message::TrialExhausted
        } else {
            Message::KeyRequired
        };
        Step {
            next: GenerationState::AwaitingKey {
                trial_exhausted: has_generated,
            },
            notification: Notification::new(message, lang),
        }
    }

    pub fn succeeded(handle: VideoHandle, lang: Language) -> Self {
        Step {
            next: GenerationState::Succeeded(handle),
            notification: Notification::new(Message::Ready, lang),
        }
    }
}

/// Map a submit or poll failure onto the error taxonomy.
pub fn classify_request_error(error: &VeoError) -> GenerationError {
    if error.is_auth_failure() {
        GenerationError::AuthRequired {
            message: error.to_string(),
        }
    } else {
        GenerationError::Provider {
            message: error.to_string(),
        }
    }
}

/// Inspect a finished operation: its download link, or why there is none.
pub fn classify_completion(snapshot: &OperationSnapshot) -> Result<&str, GenerationError> {
    if let Some(error) = &snapshot.error {
        return Err(GenerationError::Provider {
            message: error.message.clone().unwrap_or_default(),
        });
    }
    if let Some(uri) = snapshot.video_uri() {
        return Ok(uri);
    }
    match snapshot.filtered_reason() {
        Some(reason) => Err(GenerationError::Provider { message: reason }),
        None => Err(GenerationError::ResponseIncomplete),
    }
}

/// State entered by [`Orchestrator::reset`].
pub fn reset_target(has_generated: bool) -> GenerationState {
    if has_generated {
        GenerationState::AwaitingKey {
            trial_exhausted: true,
        }
    } else {
        GenerationState::Idle
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub poll_interval: Duration,
    /// Overall limit for one generation. `None` waits indefinitely.
    pub deadline: Option<Duration>,
    pub language: Language,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            language: Language::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("Cannot start while {state}")]
    NotReady { state: StateKind },

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Run `fut` unless cancellation or the deadline comes first.
async fn guarded<F: Future>(
    cancel: &CancellationToken,
    deadline: Option<Instant>,
    fut: F,
) -> Result<F::Output, GenerationError> {
    let expiry = async {
        match deadline {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        _ = expiry => Err(GenerationError::TimedOut),
        output = fut => Ok(output),
    }
}

/// Owns the generation state and the services it talks to.
pub struct Orchestrator<S, K> {
    service: S,
    keys: K,
    settings: OrchestratorSettings,
    state: GenerationState,
    has_generated: bool,
}

impl<S: VideoService, K: KeyProvider> Orchestrator<S, K> {
    pub fn new(service: S, keys: K, settings: OrchestratorSettings) -> Self {
        Self {
            service,
            keys,
            settings,
            state: GenerationState::Idle,
            has_generated: false,
        }
    }

    pub fn state(&self) -> &GenerationState {
        &self.state
    }

    /// Whether any generation has succeeded in this session.
    pub fn has_generated(&self) -> bool {
        self.has_generated
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn keys(&self) -> &K {
        &self.keys
    }

    fn language(&self) -> Language {
        self.settings.language
    }

    fn selected_key(&self) -> Option<ApiKey> {
        if self.keys.has_selected_api_key() {
            self.keys.api_key()
        } else {
            None
        }
    }

    fn apply(&mut self, step: Step) -> Notification {
        if matches!(step.next, GenerationState::Succeeded(_)) {
            self.has_generated = true;
        }
        log::info!("Generation state: {} -> {}", self.state.kind(), step.next.kind());
        self.state = step.next;
        step.notification
    }

    /// Startup key check. Only meaningful while idle or waiting for a key.
    ///
    /// Returns the notification to show when a key is still needed.
    pub fn check_key(&mut self) -> Option<Notification> {
        if !matches!(
            self.state,
            GenerationState::Idle | GenerationState::AwaitingKey { .. }
        ) {
            return None;
        }

        // An exhausted trial stays gated until select_key runs.
        if let GenerationState::AwaitingKey {
            trial_exhausted: true,
        } = self.state
        {
            return Some(Notification::new(Message::TrialExhausted, self.language()));
        }

        if self.selected_key().is_some() {
            self.state = GenerationState::Idle;
            None
        } else {
            let step = Step::key_required(self.has_generated, self.language());
            Some(self.apply(step))
        }
    }

    /// Let the user pick a key, then return to idle.
    pub fn select_key(&mut self) -> Result<(), OrchestratorError> {
        match self.state.kind() {
            StateKind::Idle | StateKind::AwaitingKey | StateKind::Failed => {}
            state => return Err(OrchestratorError::NotReady { state }),
        }
        self.keys.open_select_key()?;
        self.state = GenerationState::Idle;
        Ok(())
    }

    /// Discard the current result.
    ///
    /// After a successful generation this requires a new key.
    pub fn reset(&mut self) -> Option<Notification> {
        let next = reset_target(self.has_generated);
        log::info!("Reset: {} -> {}", self.state.kind(), next.kind());
        self.state = next;
        match self.state {
            GenerationState::AwaitingKey { .. } => {
                Some(Notification::new(Message::TrialExhausted, self.language()))
            }
            _ => None,
        }
    }

    /// Run one generation to completion, failure or a key request.
    ///
    /// Allowed from `Idle` or `Failed`. `on_notify` receives every status
    /// update in order.
    pub async fn generate<F>(
        &mut self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
        mut on_notify: F,
    ) -> Result<&GenerationState, OrchestratorError>
    where
        F: FnMut(&Notification),
    {
        match self.state.kind() {
            StateKind::Idle | StateKind::Failed => {}
            state => return Err(OrchestratorError::NotReady { state }),
        }

        let lang = self.language();
        self.state = GenerationState::Submitting;
        on_notify(&Notification::new(Message::Build, lang));

        let step = match self.selected_key() {
            Some(key) => self.run(request, &key, cancel, &mut on_notify).await,
            None => {
                log::warn!("No API key selected");
                Step::key_required(self.has_generated, lang)
            }
        };

        let notification = self.apply(step);
        on_notify(&notification);
        Ok(&self.state)
    }

    async fn run<F>(
        &mut self,
        request: &GenerationRequest,
        key: &ApiKey,
        cancel: &CancellationToken,
        on_notify: &mut F,
    ) -> Step
    where
        F: FnMut(&Notification),
    {
        let lang = self.language();
        let has_generated = self.has_generated;
        let deadline = self.settings.deadline.map(|limit| Instant::now() + limit);
        let fail = |error: GenerationError| Step::from_error(error, has_generated, lang);

        let payload = build_payload(request);
        on_notify(&Notification::new(Message::Init, lang));
        let stage = if request.is_multi_reference() {
            Message::Fusing
        } else {
            Message::Generating
        };
        on_notify(&Notification::new(stage, lang));

        let mut snapshot = match guarded(cancel, deadline, self.service.submit(key, &payload)).await
        {
            Err(stop) => return fail(stop),
            Ok(Err(error)) => return fail(classify_request_error(&error)),
            Ok(Ok(snapshot)) => snapshot,
        };

        let operation = snapshot.name.clone();
        if !snapshot.done && operation.is_empty() {
            log::error!("Submission returned a pending operation without a name");
            return fail(GenerationError::ResponseIncomplete);
        }

        let mut ticks = 0;
        while !snapshot.done {
            self.state = GenerationState::Polling {
                operation: operation.clone(),
                ticks,
            };
            let wait = tokio::time::sleep(self.settings.poll_interval);
            if let Err(stop) = guarded(cancel, deadline, wait).await {
                return fail(stop);
            }

            ticks += 1;
            on_notify(&Notification::new(Message::Rendering, lang));
            snapshot = match guarded(cancel, deadline, self.service.poll(key, &operation)).await {
                Err(stop) => return fail(stop),
                Ok(Err(error)) => return fail(classify_request_error(&error)),
                Ok(Ok(snapshot)) => snapshot,
            };
        }
        log::info!("Operation {} finished after {} poll(s)", operation, ticks);

        let uri = match classify_completion(&snapshot) {
            Ok(uri) => uri.to_string(),
            Err(error) => {
                log::warn!("Generation did not produce a video: {}", error);
                return fail(error);
            }
        };

        on_notify(&Notification::new(Message::Downloading, lang));
        match guarded(cancel, deadline, self.service.fetch_video(key, &uri)).await {
            Err(stop) => fail(stop),
            Ok(Err(error)) => fail(GenerationError::Transport {
                message: error.to_string(),
            }),
            Ok(Ok(asset)) => Step::succeeded(VideoHandle::new(asset, uri), lang),
        }
    }
}
