//! API key provisioning.
//!
//! The orchestrator never reads credentials from ambient state; it asks an
//! injected [`KeyProvider`] whether a key is selected and, when the provider
//! rejects one, asks it to select another.

use std::fmt;
use std::io::{self, BufRead, Write};

/// Default environment variable holding the Gemini API key.
pub const DEFAULT_KEY_ENV: &str = "GEMINI_API_KEY";

/// Fallback environment variable consulted when the configured one is unset.
pub const FALLBACK_KEY_ENV: &str = "API_KEY";

/// An API credential. `Debug` output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key, rejecting empty or whitespace-only input.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(ApiKey(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        write!(f, "ApiKey(****{})", tail)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("No API key was entered")]
    Empty,

    #[error("Interactive key selection is not available")]
    Unavailable,

    #[error("Failed to read API key: {0}")]
    Io(#[from] io::Error),
}

/// Capability for obtaining and re-selecting the API key.
pub trait KeyProvider {
    /// The currently selected key, if any.
    fn api_key(&self) -> Option<ApiKey>;

    fn has_selected_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Ask the user to select a (new) key.
    fn open_select_key(&mut self) -> Result<(), KeyError>;
}

/// Look up a key from `var`, falling back to `API_KEY`.
pub fn key_from_env(var: &str) -> Option<ApiKey> {
    std::env::var(var)
        .ok()
        .and_then(ApiKey::new)
        .or_else(|| std::env::var(FALLBACK_KEY_ENV).ok().and_then(ApiKey::new))
}

/// A fixed key with no selection UI.
#[derive(Debug, Clone, Default)]
pub struct StaticKey {
    key: Option<ApiKey>,
}

impl StaticKey {
    pub fn new(key: Option<ApiKey>) -> Self {
        Self { key }
    }

    pub fn from_env(var: &str) -> Self {
        Self::new(key_from_env(var))
    }
}

impl KeyProvider for StaticKey {
    fn api_key(&self) -> Option<ApiKey> {
        self.key.clone()
    }

    fn open_select_key(&mut self) -> Result<(), KeyError> {
        log::warn!("Key picker not available; set the API key in the environment or .env");
        Err(KeyError::Unavailable)
    }
}

/// Reads a replacement key from a line-oriented reader, prompting on a writer.
pub struct PromptKey<R, W> {
    key: Option<ApiKey>,
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> PromptKey<R, W> {
    pub fn new(key: Option<ApiKey>, reader: R, writer: W) -> Self {
        Self {
            key,
            reader,
            writer,
        }
    }
}

impl PromptKey<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, read from stdin.
    pub fn stdin(key: Option<ApiKey>) -> Self {
        Self::new(key, io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> KeyProvider for PromptKey<R, W> {
    fn api_key(&self) -> Option<ApiKey> {
        self.key.clone()
    }

    fn open_select_key(&mut self) -> Result<(), KeyError> {
        write!(self.writer, "Enter API key: ")?;
        self.writer.flush()?;

        let mut line = String::new();
        self.reader.read_line(&mut line)?;
        let key = ApiKey::new(line).ok_or(KeyError::Empty)?;
        log::info!("API key selected: {:?}", key);
        self.key = Some(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_rejects_blank() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" abc ").unwrap().expose(), "abc");
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("secret-key-1234").unwrap();
        let debug = format!("{:?}", key);
        assert_eq!(debug, "ApiKey(****1234)");
        assert!(!debug.contains("secret"));
    }

    #[test]
    fn test_static_key_cannot_select() {
        let mut keys = StaticKey::new(None);
        assert!(!keys.has_selected_api_key());
        assert!(matches!(keys.open_select_key(), Err(KeyError::Unavailable)));
    }

    #[test]
    fn test_prompt_key_reads_line() {
        let mut out = Vec::new();
        let mut keys = PromptKey::new(None, "new-key\n".as_bytes(), &mut out);
        assert!(!keys.has_selected_api_key());
        keys.open_select_key().unwrap();
        assert_eq!(keys.api_key().unwrap().expose(), "new-key");
        drop(keys);
        assert_eq!(String::from_utf8(out).unwrap(), "Enter API key: ");
    }

    #[test]
    fn test_prompt_key_empty_input_keeps_previous() {
        let previous = ApiKey::new("old").unwrap();
        let mut keys = PromptKey::new(Some(previous.clone()), "\n".as_bytes(), io::sink());
        assert!(matches!(keys.open_select_key(), Err(KeyError::Empty)));
        assert_eq!(keys.api_key(), Some(previous));
    }

    #[test]
    fn test_key_from_env_prefers_named_variable() {
        std::env::set_var("CATWALK_TEST_KEY_PRIMARY", "primary");
        let key = key_from_env("CATWALK_TEST_KEY_PRIMARY").unwrap();
        assert_eq!(key.expose(), "primary");
        std::env::remove_var("CATWALK_TEST_KEY_PRIMARY");
    }
}
