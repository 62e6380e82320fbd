//! Call session controller
//!
//! The controller owns the [`CallStatus`] of a single voice session and the
//! flags derived from it. It is driven from two sides:
//!
//! - **User actions**: [`start`](CallSessionController::start),
//!   [`end`](CallSessionController::end) and
//!   [`toggle_mute`](CallSessionController::toggle_mute) call into the
//!   attached [`VoiceClient`] and absorb its failures.
//! - **SDK events**: every [`EventKind`] is subscribed on attach and mapped to
//!   a transition.
//!
//! # State machine
//!
//! ```text
//!            start()            connect signal
//!   idle ─────────────► connecting ─────────────► connected ──┐ tick
//!    ▲                   │      │                  │   │  ◄───┘ duration + 1
//!    │                   │      └──── call-end ────┼───┴──────► ended
//!    │                   └─────────── error ───────┴──────────► error
//!    └──────── start() from ended / error goes straight to connecting
//! ```
//!
//! While connected a ticker task increments the duration once per
//! [`tick_interval`](crate::config::SessionConfig::tick_interval). It is
//! cancelled on every path that leaves `connected`, on
//! [`shutdown`](CallSessionController::shutdown), and when the last
//! controller handle is dropped.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use talkline_call_session::{CallSessionController, SessionConfig, VoiceClient};
//!
//! async fn run(client: Arc<dyn VoiceClient>) -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = CallSessionController::with_client(SessionConfig::from_env(), client)?;
//!
//!     controller.start().await;
//!     println!("status: {}", controller.status());
//!
//!     controller.end().await;
//!     controller.shutdown();
//!     Ok(())
//! }
//! ```

use crate::client::VoiceClient;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{
    EventEmitter, EventIterator, EventKind, EventStream, SdkEvent, SessionEvent, Subscription,
};
use crate::types::{CallId, CallPhase, CallSnapshot, CallStatus};
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Message used when the SDK rejects `start` without one
pub const DEFAULT_START_ERROR: &str = "Failed to start call";
/// Message used when the SDK emits an error event without one
pub const DEFAULT_CALL_ERROR: &str = "Call failed";
/// Message shown when the SDK could not be loaded
pub const SDK_LOAD_ERROR: &str = "Failed to load voice SDK";

struct SessionState {
    snapshot: CallSnapshot,
    ticker: Option<JoinHandle<()>>,
}

impl SessionState {
    fn cancel_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn transition(&mut self, status: CallStatus) -> SessionEvent {
        let previous = self.snapshot.status.phase();
        self.snapshot.status = status.clone();
        SessionEvent::StatusChanged {
            call_id: self.snapshot.call_id,
            previous,
            status,
        }
    }

    fn set_listening(&mut self, listening: bool, out: &mut Vec<SessionEvent>) {
        if self.snapshot.listening != listening {
            self.snapshot.listening = listening;
            out.push(SessionEvent::ListeningChanged {
                call_id: self.snapshot.call_id,
                listening,
            });
        }
    }

    fn set_muted(&mut self, muted: bool, out: &mut Vec<SessionEvent>) {
        if self.snapshot.muted != muted {
            self.snapshot.muted = muted;
            out.push(SessionEvent::MuteChanged {
                call_id: self.snapshot.call_id,
                muted,
            });
        }
    }

    /// Leave the call for a terminal status, releasing everything tied to it
    fn finish(&mut self, status: CallStatus, out: &mut Vec<SessionEvent>) {
        self.cancel_ticker();
        self.snapshot.ended_at = Some(Utc::now());
        out.push(self.transition(status));
        self.set_listening(false, out);
        self.set_muted(false, out);
    }
}

struct Inner {
    config: SessionConfig,
    state: Mutex<SessionState>,
    client: RwLock<Option<Arc<dyn VoiceClient>>>,
    subscriptions: Mutex<Vec<Subscription>>,
    emitter: EventEmitter,
    runtime: Handle,
    disposed: AtomicBool,
}

impl Inner {
    fn client(&self) -> Option<Arc<dyn VoiceClient>> {
        self.client.read().clone()
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn publish(&self, events: Vec<SessionEvent>) {
        for event in events {
            self.emitter.emit(event);
        }
    }

    fn handle_sdk_event(self: &Arc<Self>, event: &SdkEvent) {
        let kind = event.kind();
        if self.is_disposed() {
            tracing::debug!("Dropping SDK event {} after shutdown", kind);
            return;
        }

        let mut out = Vec::new();
        {
            let mut state = self.state.lock();
            let phase = state.snapshot.status.phase();
            if !phase.is_active() {
                tracing::debug!("Ignoring SDK event {} while {}", kind, phase);
                return;
            }

            // First connect signal wins; later ones find the call connected
            if phase == CallPhase::Connecting && self.config.is_connect_signal(kind) {
                self.enter_connected(&mut state, &mut out);
            }

            match event {
                SdkEvent::CallStart | SdkEvent::CallConnect => {}
                SdkEvent::SpeechStart => state.set_listening(true, &mut out),
                SdkEvent::SpeechEnd => state.set_listening(false, &mut out),
                SdkEvent::CallEnd => {
                    tracing::info!("Call {:?} ended", state.snapshot.call_id);
                    state.finish(CallStatus::Ended, &mut out);
                }
                SdkEvent::Error { message } => {
                    let message = message
                        .as_deref()
                        .map(str::trim)
                        .filter(|message| !message.is_empty())
                        .unwrap_or(DEFAULT_CALL_ERROR)
                        .to_string();
                    tracing::warn!("Call {:?} failed: {}", state.snapshot.call_id, message);
                    state.finish(CallStatus::Error { message }, &mut out);
                }
            }
        }
        self.publish(out);
    }

    fn enter_connected(self: &Arc<Self>, state: &mut SessionState, out: &mut Vec<SessionEvent>) {
        let Some(call_id) = state.snapshot.call_id else {
            return;
        };

        state.snapshot.connected_at = Some(Utc::now());
        out.push(state.transition(CallStatus::Connected { duration: 0 }));
        state.cancel_ticker();
        state.ticker = Some(self.spawn_ticker(call_id));
        tracing::info!("Call {} connected", call_id);
    }

    fn spawn_ticker(self: &Arc<Self>, call_id: CallId) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(self);
        let period = self.config.tick_interval;
        let first_tick = Instant::now() + period;

        self.runtime.spawn(async move {
            let mut interval = interval_at(first_tick, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let Some(session) = inner.upgrade() else {
                    break;
                };
                if !session.tick(call_id) {
                    break;
                }
            }
        })
    }

    /// Advance the connected duration; false once the ticker should stop
    fn tick(&self, call_id: CallId) -> bool {
        if self.is_disposed() {
            return false;
        }

        let event = {
            let mut state = self.state.lock();
            if state.snapshot.call_id != Some(call_id) {
                return false;
            }
            match &mut state.snapshot.status {
                CallStatus::Connected { duration } => {
                    *duration += 1;
                    SessionEvent::DurationTick {
                        call_id,
                        seconds: *duration,
                    }
                }
                _ => return false,
            }
        };

        tracing::debug!("Call {} tick: {:?}", call_id, event);
        self.emitter.emit(event);
        true
    }

    /// Land a failed `start` in the error state
    fn fail_start(&self, call_id: CallId, message: String) {
        if self.is_disposed() {
            return;
        }

        let mut out = Vec::new();
        {
            let mut state = self.state.lock();
            if state.snapshot.call_id != Some(call_id) || !state.snapshot.is_active() {
                tracing::debug!("Ignoring start failure of finished call {}", call_id);
                return;
            }
            state.finish(CallStatus::Error { message }, &mut out);
        }
        self.publish(out);
    }

    /// Fallback after a failed `stop`: never leave the call looking live
    fn force_end(&self, call_id: CallId) {
        if self.is_disposed() {
            return;
        }

        let mut out = Vec::new();
        {
            let mut state = self.state.lock();
            if state.snapshot.call_id != Some(call_id) || !state.snapshot.is_active() {
                return;
            }
            state.finish(CallStatus::Ended, &mut out);
        }
        self.publish(out);
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.state.get_mut().cancel_ticker();
    }
}

/// Drives one voice session on top of an injected [`VoiceClient`]
///
/// Cloning yields another handle to the same session. Dropping the last handle
/// cancels the ticker and disposes every SDK subscription.
#[derive(Clone)]
pub struct CallSessionController {
    inner: Arc<Inner>,
}

impl CallSessionController {
    /// Create an idle controller with no client attached yet
    ///
    /// Must be called from within a tokio runtime; the duration ticker is
    /// spawned on it.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| SessionError::NoRuntime {
            message: e.to_string(),
        })?;

        let emitter = EventEmitter::new(config.event_capacity);
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(SessionState {
                    snapshot: CallSnapshot::default(),
                    ticker: None,
                }),
                client: RwLock::new(None),
                subscriptions: Mutex::new(Vec::new()),
                emitter,
                runtime,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Create a controller and attach `client` immediately
    pub fn with_client(config: SessionConfig, client: Arc<dyn VoiceClient>) -> SessionResult<Self> {
        let controller = Self::new(config)?;
        controller.attach(client)?;
        Ok(controller)
    }

    /// Attach the voice client and subscribe to all of its lifecycle events
    pub fn attach(&self, client: Arc<dyn VoiceClient>) -> SessionResult<()> {
        if self.inner.is_disposed() {
            return Err(SessionError::invalid_state("controller has been shut down"));
        }

        let mut slot = self.inner.client.write();
        if slot.is_some() {
            return Err(SessionError::invalid_state("a voice client is already attached"));
        }

        let subscriptions: Vec<Subscription> = EventKind::ALL
            .into_iter()
            .map(|kind| {
                let inner = Arc::downgrade(&self.inner);
                client.on(
                    kind,
                    Arc::new(move |event: &SdkEvent| {
                        if let Some(inner) = inner.upgrade() {
                            inner.handle_sdk_event(event);
                        }
                    }),
                )
            })
            .collect();

        for subscription in &subscriptions {
            tracing::debug!("Subscribed to SDK event {}", subscription.kind());
        }
        self.inner.subscriptions.lock().extend(subscriptions);
        *slot = Some(client);
        tracing::info!(
            "Voice client attached (connect signals: {:?}, mute enabled: {})",
            self.inner.config.connect_signals,
            self.inner.config.mute_enabled
        );
        Ok(())
    }

    /// Whether a voice client is attached
    pub fn is_ready(&self) -> bool {
        self.inner.client.read().is_some()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> CallSnapshot {
        self.inner.state.lock().snapshot.clone()
    }

    pub fn status(&self) -> CallStatus {
        self.inner.state.lock().snapshot.status.clone()
    }

    pub fn is_listening(&self) -> bool {
        self.inner.state.lock().snapshot.listening
    }

    pub fn is_muted(&self) -> bool {
        self.inner.state.lock().snapshot.muted
    }

    /// Subscribe to session notifications
    pub fn events(&self) -> EventStream {
        self.inner.emitter.subscribe()
    }

    /// Subscribe to session notifications with a simple iterator
    pub fn events_simple(&self) -> EventIterator {
        self.inner.emitter.subscribe_simple()
    }

    /// Start a call
    ///
    /// The status is `connecting` before the SDK is awaited. A rejection lands
    /// the session in `error`. Does nothing without a client or while a call is
    /// already in progress.
    pub async fn start(&self) {
        let Some(client) = self.inner.client() else {
            tracing::debug!("start ignored: no voice client attached");
            return;
        };
        if self.inner.is_disposed() {
            tracing::debug!("start ignored: controller has been shut down");
            return;
        }

        let call_id = CallId::new_v4();
        let event = {
            let mut state = self.inner.state.lock();
            let phase = state.snapshot.status.phase();
            if !phase.can_start() {
                tracing::debug!("start ignored: call already {}", phase);
                return;
            }

            state.cancel_ticker();
            state.snapshot = CallSnapshot {
                call_id: Some(call_id),
                status: CallStatus::Connecting,
                ..CallSnapshot::default()
            };
            SessionEvent::StatusChanged {
                call_id: Some(call_id),
                previous: phase,
                status: CallStatus::Connecting,
            }
        };
        self.inner.emitter.emit(event);

        let assistant_id = &self.inner.config.assistant_id;
        tracing::info!("Starting call {} with assistant {}", call_id, assistant_id);

        if let Err(e) = client.start(assistant_id).await {
            let message = e.message().unwrap_or(DEFAULT_START_ERROR).to_string();
            tracing::warn!("Call {} failed to start: {}", call_id, e);
            self.inner.fail_start(call_id, message);
        }
    }

    /// End the current call
    ///
    /// On success the SDK's `call-end` event drives the transition. If the SDK
    /// rejects the stop, the failure is logged and the call is forced to
    /// `ended`.
    pub async fn end(&self) {
        let Some(client) = self.inner.client() else {
            tracing::debug!("end ignored: no voice client attached");
            return;
        };

        let call_id = {
            let state = self.inner.state.lock();
            if !state.snapshot.is_active() {
                tracing::debug!("end ignored: no active call ({})", state.snapshot.phase());
                return;
            }
            state.snapshot.call_id
        };

        tracing::info!("Ending call {:?}", call_id);
        if let Err(e) = client.stop().await {
            tracing::error!("Error ending call {:?}: {}", call_id, e);
            if let Some(call_id) = call_id {
                self.inner.force_end(call_id);
            }
        }
    }

    /// Flip the microphone mute state of the active call
    ///
    /// The SDK's flag is read rather than the local mirror so the two cannot
    /// drift. Returns the resulting local flag; nothing changes when mute is
    /// disabled or no call is active.
    pub fn toggle_mute(&self) -> bool {
        if !self.inner.config.mute_enabled {
            tracing::debug!("toggle_mute ignored: mute is disabled");
            return self.is_muted();
        }
        let Some(client) = self.inner.client() else {
            tracing::debug!("toggle_mute ignored: no voice client attached");
            return self.is_muted();
        };

        let call_id = {
            let state = self.inner.state.lock();
            if self.inner.is_disposed() || !state.snapshot.is_active() {
                tracing::debug!("toggle_mute ignored: no active call");
                return state.snapshot.muted;
            }
            state.snapshot.call_id
        };

        let was_muted = client.is_muted();
        if was_muted {
            client.unmute();
        } else {
            client.mute();
        }

        let mut out = Vec::new();
        let muted = {
            let mut state = self.inner.state.lock();
            if state.snapshot.call_id == call_id && state.snapshot.is_active() {
                state.set_muted(!was_muted, &mut out);
            }
            state.snapshot.muted
        };
        self.inner.publish(out);

        tracing::info!("Call {:?} {}", call_id, if muted { "muted" } else { "unmuted" });
        muted
    }

    /// Surface an SDK load failure before any call exists
    ///
    /// Ignored while a call is connecting or connected.
    pub fn report_sdk_failure(&self, message: impl Into<String>) {
        if self.inner.is_disposed() {
            return;
        }

        let mut out = Vec::new();
        {
            let mut state = self.inner.state.lock();
            if state.snapshot.is_active() {
                tracing::debug!("Ignoring SDK failure report during an active call");
                return;
            }
            state.finish(CallStatus::Error { message: message.into() }, &mut out);
        }
        self.inner.publish(out);
    }

    /// Cancel the ticker and dispose every SDK subscription
    ///
    /// No state changes happen after this returns. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        self.inner.state.lock().cancel_ticker();
        let subscriptions = std::mem::take(&mut *self.inner.subscriptions.lock());
        let count = subscriptions.len();
        drop(subscriptions);
        tracing::info!("Call session shut down ({} subscriptions disposed)", count);
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.is_disposed()
    }
}

impl fmt::Debug for CallSessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSessionController")
            .field("snapshot", &self.snapshot())
            .field("ready", &self.is_ready())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
