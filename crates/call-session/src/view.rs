//! Presentation state derived from a call snapshot
//!
//! Nothing here renders; [`CallView`] is plain data (serializable to JSON) that
//! a UI layer turns into markup.

use crate::config::{SessionConfig, API_KEY_VAR, ASSISTANT_ID_VAR};
use crate::types::{CallPhase, CallSnapshot};
use serde::Serialize;

/// Colour/animation class of the status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IndicatorTone {
    /// Grey, nothing happening
    Idle,
    /// Pulsing amber
    Connecting,
    /// Pulsing green, remote party speaking
    Speaking,
    /// Steady blue, call live
    Live,
    /// Red
    Error,
    /// Grey, call over
    Disconnected,
}

/// Everything a view needs to draw the call screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallView {
    /// The SDK is still loading; only a spinner and `title` apply
    pub loading: bool,
    pub title: &'static str,
    pub subtitle: &'static str,
    pub indicator_label: &'static str,
    pub indicator_tone: IndicatorTone,
    /// `MM:SS` while connected
    pub duration_text: Option<String>,
    pub error_text: Option<String>,
    pub call_active: bool,
    /// Text under the call button
    pub action_hint: &'static str,
    pub start_enabled: bool,
    /// Whether a mute toggle should be offered
    pub mute_available: bool,
    pub muted: bool,
    /// Persistent notice while credentials are placeholders
    pub configuration_notice: Option<String>,
}

impl CallView {
    /// Derive the view for `snapshot`
    ///
    /// `sdk_ready` is false until a voice client has been attached.
    pub fn from_snapshot(snapshot: &CallSnapshot, config: &SessionConfig, sdk_ready: bool) -> Self {
        let phase = snapshot.phase();
        let listening = phase == CallPhase::Connected && snapshot.listening;
        let call_active = phase.is_active();

        let (title, subtitle) = match phase {
            CallPhase::Idle => ("AI Conversation Partner", "Tap to start a natural conversation"),
            CallPhase::Connecting => ("Connecting...", "Getting ready to chat..."),
            CallPhase::Connected if listening => ("Listening...", "I'm listening to you speak"),
            CallPhase::Connected => ("In Conversation", "We're having a conversation"),
            CallPhase::Ended => ("Call Ended", "Thanks for the great conversation!"),
            CallPhase::Error => ("Connection Error", "Something went wrong. Try again."),
        };

        let (indicator_label, indicator_tone) = match phase {
            CallPhase::Idle => ("Ready", IndicatorTone::Idle),
            CallPhase::Connecting => ("Connecting", IndicatorTone::Connecting),
            CallPhase::Connected if listening => ("You're Speaking", IndicatorTone::Speaking),
            CallPhase::Connected => ("AI is Listening", IndicatorTone::Live),
            CallPhase::Error => ("Error", IndicatorTone::Error),
            CallPhase::Ended => ("Disconnected", IndicatorTone::Disconnected),
        };

        let configuration_notice = config.needs_configuration().then(|| {
            format!(
                "Configure `{}` and `{}` in your environment variables",
                API_KEY_VAR, ASSISTANT_ID_VAR
            )
        });

        Self {
            loading: !sdk_ready,
            title: if sdk_ready { title } else { "Loading AI Assistant..." },
            subtitle: if sdk_ready { subtitle } else { "" },
            indicator_label,
            indicator_tone,
            duration_text: snapshot.status.duration().map(format_duration),
            error_text: snapshot.status.error_message().map(str::to_string),
            call_active,
            action_hint: if call_active { "Tap to end call" } else { "Tap to start conversation" },
            start_enabled: sdk_ready && phase.can_start(),
            mute_available: config.mute_enabled && call_active,
            muted: snapshot.muted,
            configuration_notice,
        }
    }
}

/// Format seconds as zero-padded `MM:SS`
///
/// Minutes are not wrapped into hours, so a 75 minute call reads `75:00`.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
