//! Call status and snapshot types
//!
//! [`CallStatus`] is the single source of truth for the lifecycle phase of a
//! voice session. Exactly one variant is active at a time, and the connected
//! duration only exists while the call is [`CallStatus::Connected`].
//!
//! # Example
//!
//! ```rust
//! use talkline_call_session::types::{CallPhase, CallStatus};
//!
//! let status = CallStatus::Connected { duration: 42 };
//! assert_eq!(status.phase(), CallPhase::Connected);
//! assert_eq!(status.duration(), Some(42));
//! assert!(status.is_active());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single call attempt
///
/// A new id is assigned every time `start()` is invoked so that late results
/// from an earlier attempt can be told apart from the current one.
pub type CallId = uuid::Uuid;

/// Lifecycle phase of a voice session, with per-phase attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CallStatus {
    /// No call has been attempted yet
    Idle,
    /// `start()` was invoked and the SDK has not reported a live call yet
    Connecting,
    /// The call is live
    Connected {
        /// Seconds since the call became live
        duration: u64,
    },
    /// The call finished normally, or a stop failed and was forced
    Ended,
    /// The call failed
    Error {
        /// Human readable failure description, never empty
        message: String,
    },
}

impl CallStatus {
    /// Attribute-free tag of this status
    pub fn phase(&self) -> CallPhase {
        match self {
            Self::Idle => CallPhase::Idle,
            Self::Connecting => CallPhase::Connecting,
            Self::Connected { .. } => CallPhase::Connected,
            Self::Ended => CallPhase::Ended,
            Self::Error { .. } => CallPhase::Error,
        }
    }

    /// Whether a call is in progress (connecting or connected)
    pub fn is_active(&self) -> bool {
        self.phase().is_active()
    }

    /// Connected duration in seconds; `None` outside of `Connected`
    pub fn duration(&self) -> Option<u64> {
        match self {
            Self::Connected { duration } => Some(*duration),
            _ => None,
        }
    }

    /// Failure message; `None` outside of `Error`
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

impl Default for CallStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected { duration } => write!(f, "connected ({}s)", duration),
            Self::Error { message } => write!(f, "error: {}", message),
            other => write!(f, "{}", other.phase()),
        }
    }
}

/// The phase of a [`CallStatus`] without its attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallPhase {
    Idle,
    Connecting,
    Connected,
    Ended,
    Error,
}

impl CallPhase {
    /// Whether the phase belongs to an in-progress call
    pub fn is_active(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }

    /// Whether a fresh `start()` is accepted from this phase
    pub fn can_start(self) -> bool {
        !self.is_active()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Ended => "ended",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of everything the controller tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSnapshot {
    /// Current call attempt, if `start()` was ever invoked
    pub call_id: Option<CallId>,
    /// Lifecycle status
    pub status: CallStatus,
    /// Remote party currently detected as speaking
    pub listening: bool,
    /// Microphone muted by the user
    pub muted: bool,
    /// When the current call became live
    pub connected_at: Option<DateTime<Utc>>,
    /// When the current call ended or failed
    pub ended_at: Option<DateTime<Utc>>,
}

impl CallSnapshot {
    pub fn phase(&self) -> CallPhase {
        self.status.phase()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

impl Default for CallSnapshot {
    fn default() -> Self {
        Self {
            call_id: None,
            status: CallStatus::Idle,
            listening: false,
            muted: false,
            connected_at: None,
            ended_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_only_exists_while_connected() {
        assert_eq!(CallStatus::Idle.duration(), None);
        assert_eq!(CallStatus::Connecting.duration(), None);
        assert_eq!(CallStatus::Connected { duration: 0 }.duration(), Some(0));
        assert_eq!(CallStatus::Ended.duration(), None);
        assert_eq!(
            CallStatus::Error { message: "boom".to_string() }.duration(),
            None
        );
    }

    #[test]
    fn test_active_phases() {
        let active: Vec<CallPhase> = [
            CallPhase::Idle,
            CallPhase::Connecting,
            CallPhase::Connected,
            CallPhase::Ended,
            CallPhase::Error,
        ]
        .into_iter()
        .filter(|phase| phase.is_active())
        .collect();

        assert_eq!(active, vec![CallPhase::Connecting, CallPhase::Connected]);
        assert!(CallPhase::Ended.can_start());
        assert!(!CallPhase::Connecting.can_start());
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_value(CallStatus::Connected { duration: 3 }).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "connected", "duration": 3 }));

        let json = serde_json::to_value(CallStatus::Error { message: "network down".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "error", "message": "network down" }));
    }

    #[test]
    fn test_default_snapshot_is_idle() {
        let snapshot = CallSnapshot::default();
        assert_eq!(snapshot.status, CallStatus::Idle);
        assert!(!snapshot.listening);
        assert!(!snapshot.muted);
        assert!(snapshot.call_id.is_none());
    }
}
