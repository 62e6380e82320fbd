//! Capabilities the controller needs from the external voice SDK
//!
//! The SDK is loaded at runtime by an [`SdkLoader`], turned into a client by
//! [`VoiceSdk::run`], and the resulting [`VoiceClient`] is handed to the
//! controller. Nothing in this crate reaches for a global SDK handle.
//!
//! ```text
//! ┌──────────────┐  load()   ┌────────────┐  run(config)  ┌──────────────┐
//! │  SdkLoader   │──────────►│  VoiceSdk  │──────────────►│ VoiceClient  │
//! └──────────────┘           └────────────┘               └──────┬───────┘
//!                                                                │ attach
//!                                                       ┌────────▼────────┐
//!                                                       │   Controller    │
//!                                                       └─────────────────┘
//! ```

use crate::error::ClientResult;
use crate::events::{EventHandler, EventKind, Subscription};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An initialized voice SDK client
///
/// `start` and `stop` are asynchronous and may reject. The mute methods are
/// synchronous and read or flip the SDK's own microphone flag.
#[async_trait]
pub trait VoiceClient: Send + Sync {
    /// Begin a call with the given assistant
    async fn start(&self, assistant_id: &str) -> ClientResult<()>;

    /// Hang up the current call
    async fn stop(&self) -> ClientResult<()>;

    fn mute(&self);

    fn unmute(&self);

    fn is_muted(&self) -> bool;

    /// Register `handler` for `kind`; disposing the returned subscription
    /// unregisters it
    fn on(&self, kind: EventKind, handler: EventHandler) -> Subscription;
}

/// A loaded SDK that can produce clients
pub trait VoiceSdk: Send + Sync {
    fn run(&self, config: &SdkRunConfig) -> ClientResult<Arc<dyn VoiceClient>>;
}

/// Loads the SDK, typically from a remote script or a native library
#[async_trait]
pub trait SdkLoader: Send + Sync {
    async fn load(&self) -> ClientResult<Arc<dyn VoiceSdk>>;
}

/// Configuration passed opaquely to [`VoiceSdk::run`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkRunConfig {
    pub api_key: String,
    pub assistant: AssistantConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_time_transcription: Option<TranscriptionConfig>,
}

/// Assistant selection and prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// Live transcription settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    pub enabled: bool,
    pub language: String,
}
