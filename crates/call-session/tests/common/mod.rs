//! Shared test support: a scripted voice client
#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use talkline_call_session::events::{
    EventHandler, EventIterator, EventKind, EventRegistry, SdkEvent, SessionEvent, Subscription,
};
use talkline_call_session::{CallSessionController, ClientError, ClientResult, SessionConfig, VoiceClient};
use tokio::sync::Notify;

/// Voice client whose events and failures are driven by the test
#[derive(Default)]
pub struct FakeVoiceClient {
    registry: EventRegistry,
    sdk_muted: AtomicBool,
    next_start_error: Mutex<Option<ClientError>>,
    next_stop_error: Mutex<Option<ClientError>>,
    start_gate: Mutex<Option<Arc<Notify>>>,
    start_calls: Mutex<Vec<String>>,
    stop_calls: AtomicUsize,
    mute_calls: AtomicUsize,
    unmute_calls: AtomicUsize,
}

impl FakeVoiceClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver an SDK event to every subscribed handler
    pub fn emit(&self, event: SdkEvent) -> usize {
        self.registry.emit(&event)
    }

    pub fn fail_next_start(&self, error: ClientError) {
        *self.next_start_error.lock() = Some(error);
    }

    pub fn fail_next_stop(&self, error: ClientError) {
        *self.next_stop_error.lock() = Some(error);
    }

    /// Make `start` wait until the returned notify is signalled
    pub fn hold_start(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.start_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn set_sdk_muted(&self, muted: bool) {
        self.sdk_muted.store(muted, Ordering::SeqCst);
    }

    pub fn start_calls(&self) -> Vec<String> {
        self.start_calls.lock().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn mute_count(&self) -> usize {
        self.mute_calls.load(Ordering::SeqCst)
    }

    pub fn unmute_count(&self) -> usize {
        self.unmute_calls.load(Ordering::SeqCst)
    }

    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }
}

#[async_trait]
impl VoiceClient for FakeVoiceClient {
    async fn start(&self, assistant_id: &str) -> ClientResult<()> {
        self.start_calls.lock().push(assistant_id.to_string());
        let gate = self.start_gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.next_start_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> ClientResult<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_stop_error.lock().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn mute(&self) {
        self.mute_calls.fetch_add(1, Ordering::SeqCst);
        self.sdk_muted.store(true, Ordering::SeqCst);
    }

    fn unmute(&self) {
        self.unmute_calls.fetch_add(1, Ordering::SeqCst);
        self.sdk_muted.store(false, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.sdk_muted.load(Ordering::SeqCst)
    }

    fn on(&self, kind: EventKind, handler: EventHandler) -> Subscription {
        self.registry.on(kind, handler)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("talkline_call_session=debug")
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> SessionConfig {
    SessionConfig::new("test-key", "assistant-1")
}

/// Controller with a fake client attached
pub fn controller_with(config: SessionConfig) -> (CallSessionController, Arc<FakeVoiceClient>) {
    init_tracing();
    let client = FakeVoiceClient::new();
    let controller = CallSessionController::with_client(config, client.clone())
        .expect("controller should build");
    (controller, client)
}

/// Controller that has been started and connected through `call-connect`
pub async fn connected_controller() -> (CallSessionController, Arc<FakeVoiceClient>) {
    let (controller, client) = controller_with(test_config());
    controller.start().await;
    client.emit(SdkEvent::CallStart);
    client.emit(SdkEvent::CallConnect);
    (controller, client)
}

/// Let the paused clock run forward by `secs` seconds plus a margin
pub async fn run_for_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs) + Duration::from_millis(500)).await;
}

/// Next session event, failing the test instead of hanging when none arrives
pub async fn next_event(events: &mut EventIterator) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(1), events.next())
        .await
        .expect("session event should arrive within a second")
        .expect("session event stream closed")
}
