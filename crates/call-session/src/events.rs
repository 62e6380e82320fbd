//! Event system for the call session
//!
//! Two directions of events meet in this module:
//!
//! - **Inbound** [`SdkEvent`]s are lifecycle notifications emitted by the voice
//!   SDK. Handlers are registered per [`EventKind`] and every registration
//!   returns a [`Subscription`] whose disposal (explicit or on drop) removes the
//!   handler. SDK adapters can implement their `on` method on top of
//!   [`EventRegistry`].
//! - **Outbound** [`SessionEvent`]s are published by the controller through an
//!   [`EventEmitter`] so a UI layer can react to state changes.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use talkline_call_session::events::{EventKind, EventRegistry, SdkEvent};
//!
//! let registry = EventRegistry::new();
//! let hits = Arc::new(AtomicUsize::new(0));
//! let counter = Arc::clone(&hits);
//! let subscription = registry.on(EventKind::SpeechStart, Arc::new(move |_event: &SdkEvent| {
//!     counter.fetch_add(1, Ordering::SeqCst);
//! }));
//!
//! registry.emit(&SdkEvent::SpeechStart);
//! subscription.dispose();
//! registry.emit(&SdkEvent::SpeechStart);
//!
//! assert_eq!(hits.load(Ordering::SeqCst), 1);
//! ```

use crate::error::SessionError;
use crate::types::{CallId, CallPhase, CallStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

/// Names of the lifecycle events the voice SDK emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// The SDK began setting up a call
    CallStart,
    /// The call is live (not emitted by every SDK build)
    CallConnect,
    /// The call finished
    CallEnd,
    /// The SDK hit a runtime failure
    Error,
    /// The remote party started speaking
    SpeechStart,
    /// The remote party stopped speaking
    SpeechEnd,
}

impl EventKind {
    /// Every event kind, in subscription order
    pub const ALL: [EventKind; 6] = [
        EventKind::CallStart,
        EventKind::CallConnect,
        EventKind::CallEnd,
        EventKind::Error,
        EventKind::SpeechStart,
        EventKind::SpeechEnd,
    ];

    /// Wire name used by the SDK's `on`/`off` interface
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallStart => "call-start",
            Self::CallConnect => "call-connect",
            Self::CallEnd => "call-end",
            Self::Error => "error",
            Self::SpeechStart => "speech-start",
            Self::SpeechEnd => "speech-end",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| SessionError::config(format!("unknown SDK event '{}'", s)))
    }
}

/// A lifecycle event delivered by the voice SDK
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    CallStart,
    CallConnect,
    CallEnd,
    /// Runtime failure, with the SDK's message when it provided one
    Error { message: Option<String> },
    SpeechStart,
    SpeechEnd,
}

impl SdkEvent {
    /// Create an error event carrying a message
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: Some(message.into()),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::CallStart => EventKind::CallStart,
            Self::CallConnect => EventKind::CallConnect,
            Self::CallEnd => EventKind::CallEnd,
            Self::Error { .. } => EventKind::Error,
            Self::SpeechStart => EventKind::SpeechStart,
            Self::SpeechEnd => EventKind::SpeechEnd,
        }
    }
}

/// Callback invoked for each matching SDK event
pub type EventHandler = Arc<dyn Fn(&SdkEvent) + Send + Sync>;

/// Handle to a registered event handler
///
/// Disposing the subscription (or dropping it) unregisters the handler. After
/// disposal the handler is never invoked again.
#[must_use = "dropping a subscription unregisters its handler"]
pub struct Subscription {
    kind: EventKind,
    disposer: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription that runs `disposer` exactly once on disposal
    pub fn new(kind: EventKind, disposer: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind,
            disposer: Some(Box::new(disposer)),
        }
    }

    /// Event kind the handler was registered for
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Unregister the handler now
    pub fn dispose(mut self) {
        self.run_disposer();
    }

    fn run_disposer(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_disposer();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .field("active", &self.disposer.is_some())
            .finish()
    }
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    handlers: Vec<(u64, EventKind, EventHandler)>,
}

/// Per-kind handler registry for SDK adapters
///
/// Handlers are invoked in registration order, outside the registry lock, so a
/// handler may register or dispose subscriptions while running.
#[derive(Clone, Default)]
pub struct EventRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl EventRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`
    pub fn on(&self, kind: EventKind, handler: EventHandler) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.handlers.push((id, kind, handler));
            id
        };

        let registry: Weak<Mutex<RegistryInner>> = Arc::downgrade(&self.inner);
        Subscription::new(kind, move || {
            if let Some(inner) = registry.upgrade() {
                inner.lock().handlers.retain(|(handler_id, _, _)| *handler_id != id);
            }
        })
    }

    /// Deliver `event` to every handler registered for its kind
    ///
    /// Returns the number of handlers invoked.
    pub fn emit(&self, event: &SdkEvent) -> usize {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .inner
            .lock()
            .handlers
            .iter()
            .filter(|(_, handler_kind, _)| *handler_kind == kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.inner
            .lock()
            .handlers
            .iter()
            .filter(|(_, handler_kind, _)| *handler_kind == kind)
            .count()
    }

    /// Total number of registered handlers
    pub fn len(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Notifications published by the call session controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The call status changed phase
    StatusChanged {
        /// Call attempt the change belongs to
        call_id: Option<CallId>,
        /// Phase before the change
        previous: CallPhase,
        /// New status
        status: CallStatus,
    },

    /// The remote party started or stopped speaking
    ListeningChanged {
        call_id: Option<CallId>,
        listening: bool,
    },

    /// The local microphone was muted or unmuted
    MuteChanged {
        call_id: Option<CallId>,
        muted: bool,
    },

    /// One more second of connected time elapsed
    DurationTick {
        call_id: CallId,
        /// Connected duration after this tick
        seconds: u64,
    },
}

/// Event stream type
pub type EventStream = BroadcastStream<SessionEvent>;

/// Simple event iterator that doesn't require StreamExt
pub struct EventIterator {
    stream: EventStream,
}

impl EventIterator {
    /// Create a new event iterator from a stream
    pub fn new(stream: EventStream) -> Self {
        Self { stream }
    }

    /// Get the next event, skipping over notifications lost to lag
    pub async fn next(&mut self) -> Option<SessionEvent> {
        use tokio_stream::StreamExt;
        loop {
            match self.stream.next().await {
                Some(Ok(event)) => return Some(event),
                Some(Err(lagged)) => {
                    tracing::debug!("Session event subscriber lagged: {}", lagged);
                }
                None => return None,
            }
        }
    }
}

/// Event emitter for session notifications
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event
    pub fn emit(&self, event: SessionEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    /// Subscribe to events with a simple iterator
    pub fn subscribe_simple(&self) -> EventIterator {
        EventIterator::new(self.subscribe())
    }

    /// Get the number of active receivers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(64)
    }
}
