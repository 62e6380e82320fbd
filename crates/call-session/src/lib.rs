//! # Talkline Call Session
//!
//! State management for a spoken conversation with a remote AI assistant. The
//! external voice SDK does all audio capture, transport, speech recognition
//! and assistant orchestration; this crate tracks what the user should see:
//!
//! - a call status (`idle`, `connecting`, `connected` with a duration,
//!   `ended`, `error` with a message),
//! - whether the remote party is speaking,
//! - whether the microphone is muted.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use talkline_call_session::{bootstrap, CallSessionController, CallView, SdkLoader, SessionConfig};
//!
//! async fn run(loader: &dyn SdkLoader) -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = CallSessionController::new(SessionConfig::from_env())?;
//!     bootstrap(loader, &controller).await?;
//!
//!     controller.start().await;
//!     let view = CallView::from_snapshot(&controller.snapshot(), controller.config(), controller.is_ready());
//!     println!("{}: {}", view.title, view.subtitle);
//!
//!     controller.end().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`client`]: the injected SDK capabilities ([`VoiceClient`], [`VoiceSdk`], [`SdkLoader`])
//! - [`bootstrap`](mod@bootstrap): load → run → attach
//! - [`controller`]: the state machine and duration ticker
//! - [`events`]: SDK event vocabulary, disposable subscriptions, session notifications
//! - [`view`]: text and indicator state for a UI

#![warn(missing_docs)]

pub mod bootstrap;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod types;
pub mod view;

// Re-export main types
pub use bootstrap::bootstrap;
pub use client::{SdkLoader, SdkRunConfig, VoiceClient, VoiceSdk};
pub use config::SessionConfig;
pub use controller::CallSessionController;
pub use error::{ClientError, ClientResult, SessionError, SessionResult};
pub use events::{EventKind, EventRegistry, EventStream, SdkEvent, SessionEvent, Subscription};
pub use types::{CallId, CallPhase, CallSnapshot, CallStatus};
pub use view::{format_duration, CallView, IndicatorTone};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
