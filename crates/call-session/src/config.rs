//! Session configuration
//!
//! [`SessionConfig`] carries the two credentials the voice SDK needs, the
//! optional assistant features passed through to it, and the switches that
//! select controller behavior (mute support and which SDK event means "the call
//! is live").
//!
//! # Loading from the environment
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `TALKLINE_API_KEY` | SDK API key | `your-api-key` |
//! | `TALKLINE_ASSISTANT_ID` | Assistant identifier | `your-assistant-id` |
//! | `TALKLINE_TRANSCRIPTION_LANGUAGE` | Live transcription language | unset |
//! | `TALKLINE_SYSTEM_PROMPT` | Assistant system prompt | unset |
//!
//! Placeholder credentials do not block anything; they only make
//! [`SessionConfig::needs_configuration`] return true so a notice can be shown.
//!
//! ```rust
//! use talkline_call_session::config::SessionConfig;
//! use talkline_call_session::events::EventKind;
//!
//! let config = SessionConfig::new("key-123", "assistant-42")
//!     .with_connect_signals(vec![EventKind::CallConnect, EventKind::SpeechStart])
//!     .with_mute(false);
//!
//! assert!(config.validate().is_ok());
//! assert!(!config.needs_configuration());
//! ```

use crate::client::{AssistantConfig, SdkRunConfig, TranscriptionConfig};
use crate::error::{SessionError, SessionResult};
use crate::events::EventKind;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_VAR: &str = "TALKLINE_API_KEY";
/// Environment variable holding the assistant identifier
pub const ASSISTANT_ID_VAR: &str = "TALKLINE_ASSISTANT_ID";
/// Environment variable holding the transcription language
pub const TRANSCRIPTION_LANGUAGE_VAR: &str = "TALKLINE_TRANSCRIPTION_LANGUAGE";
/// Environment variable holding the system prompt
pub const SYSTEM_PROMPT_VAR: &str = "TALKLINE_SYSTEM_PROMPT";

/// Placeholder used when no API key is configured
pub const PLACEHOLDER_API_KEY: &str = "your-api-key";
/// Placeholder used when no assistant is configured
pub const PLACEHOLDER_ASSISTANT_ID: &str = "your-assistant-id";

/// Events that may be configured as the "call is live" signal
pub const CONNECT_SIGNAL_CANDIDATES: [EventKind; 2] = [EventKind::CallConnect, EventKind::SpeechStart];

const CONVERSATION_PARTNER_PROMPT: &str = "You are a friendly and engaging conversation partner who \
loves to talk and listen. Start conversations warmly, listen carefully to what the user wants to talk \
about, ask follow-up questions to keep the conversation flowing, share your thoughts when appropriate, \
and speak naturally. Don't follow a script; talk about whatever comes up.";

/// Configuration for a call session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// SDK API key
    pub api_key: String,
    /// Assistant to call
    pub assistant_id: String,
    /// Optional system prompt forwarded to the assistant
    pub system_prompt: Option<String>,
    /// Enables live transcription in this language when set
    pub transcription_language: Option<String>,
    /// Whether `toggle_mute` is available
    pub mute_enabled: bool,
    /// SDK events that move a connecting call to connected; first to arrive wins
    pub connect_signals: Vec<EventKind>,
    /// Period of the connected-duration counter
    pub tick_interval: Duration,
    /// Capacity of the session notification channel
    pub event_capacity: usize,
}

impl SessionConfig {
    /// Configuration with the given credentials and default behavior
    pub fn new(api_key: impl Into<String>, assistant_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            assistant_id: assistant_id.into(),
            system_prompt: None,
            transcription_language: None,
            mute_enabled: true,
            connect_signals: vec![EventKind::CallConnect],
            tick_interval: Duration::from_secs(1),
            event_capacity: 64,
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    ///
    /// Blank values are treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            system_prompt: read(SYSTEM_PROMPT_VAR),
            transcription_language: read(TRANSCRIPTION_LANGUAGE_VAR),
            ..Self::new(
                read(API_KEY_VAR).unwrap_or_else(|| PLACEHOLDER_API_KEY.to_string()),
                read(ASSISTANT_ID_VAR).unwrap_or_else(|| PLACEHOLDER_ASSISTANT_ID.to_string()),
            )
        };

        if config.needs_configuration() {
            tracing::warn!(
                "Voice credentials are placeholders; set {} and {}",
                API_KEY_VAR,
                ASSISTANT_ID_VAR
            );
        }
        config
    }

    /// Preset for the open-ended conversation partner assistant
    pub fn conversation_partner(self) -> Self {
        self.with_system_prompt(CONVERSATION_PARTNER_PROMPT)
            .with_transcription_language("en-US")
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_transcription_language(mut self, language: impl Into<String>) -> Self {
        self.transcription_language = Some(language.into());
        self
    }

    /// Enable or disable the mute control
    pub fn with_mute(mut self, enabled: bool) -> Self {
        self.mute_enabled = enabled;
        self
    }

    /// Set which SDK events signal a live call
    pub fn with_connect_signals(mut self, signals: Vec<EventKind>) -> Self {
        self.connect_signals = signals;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// True while either credential is still a placeholder
    pub fn needs_configuration(&self) -> bool {
        self.api_key == PLACEHOLDER_API_KEY || self.assistant_id == PLACEHOLDER_ASSISTANT_ID
    }

    /// Whether `kind` moves a connecting call to connected
    pub fn is_connect_signal(&self, kind: EventKind) -> bool {
        self.connect_signals.contains(&kind)
    }

    /// Check the behavioral settings
    pub fn validate(&self) -> SessionResult<()> {
        if self.connect_signals.is_empty() {
            return Err(SessionError::config("At least one connect signal must be configured"));
        }

        if let Some(kind) = self
            .connect_signals
            .iter()
            .find(|kind| !CONNECT_SIGNAL_CANDIDATES.contains(kind))
        {
            return Err(SessionError::config(format!(
                "'{}' cannot signal a connected call",
                kind
            )));
        }

        if self.tick_interval.is_zero() {
            return Err(SessionError::config("Tick interval must be greater than zero"));
        }

        if self.event_capacity == 0 {
            return Err(SessionError::config("Event capacity must be greater than zero"));
        }

        Ok(())
    }

    /// Build the configuration handed to the SDK's `run`
    pub fn run_config(&self) -> SdkRunConfig {
        SdkRunConfig {
            api_key: self.api_key.clone(),
            assistant: AssistantConfig {
                id: self.assistant_id.clone(),
                system_prompt: self.system_prompt.clone(),
            },
            real_time_transcription: self.transcription_language.as_ref().map(|language| {
                TranscriptionConfig {
                    enabled: true,
                    language: language.clone(),
                }
            }),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(PLACEHOLDER_API_KEY, PLACEHOLDER_ASSISTANT_ID)
    }
}
