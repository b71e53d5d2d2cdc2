//! Subscription lifecycle
//!
//! A subscription moves through `Idle -> Started -> (data* | error) ->
//! Stopped`. `Stopped` is terminal and reachable from any state via explicit
//! unsubscribe; once stopped, no further callback may fire. The guard is
//! enforced here rather than trusted to the transport, because the transport
//! may emit after teardown was requested.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::error::ClientError;
use crate::transport::Unsubscribable;

/// A unique, time-ordered subscription identifier based on UUID v7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(Uuid);

impl SubscriptionId {
    /// Create a new subscription ID.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse a subscription ID, with or without the `sub_` prefix.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        let uuid_str = s.strip_prefix("sub_").unwrap_or(s);
        Uuid::parse_str(uuid_str).map(Self)
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// Cancellation signal shared between a handle and in-flight work.
///
/// Also forwarded into query fetch functions when abort-on-unmount is
/// enabled, so the transport can observe teardown.
#[derive(Debug, Default)]
pub struct CancellationSignal {
    cancelled: AtomicBool,
    notify: tokio::sync::Notify,
}

impl CancellationSignal {
    /// Create a new, uncancelled signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the signal and wake all waiters.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Check whether the signal was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Wait until cancelled.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Lifecycle state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Created, transport not yet confirmed.
    Idle,
    /// Transport confirmed the stream; data may flow.
    Started,
    /// The stream failed; no further data is expected.
    Errored,
    /// Explicitly torn down. Terminal.
    Stopped,
}

const STATE_IDLE: u8 = 0;
const STATE_STARTED: u8 = 1;
const STATE_ERRORED: u8 = 2;
const STATE_STOPPED: u8 = 3;

fn state_from_u8(raw: u8) -> SubscriptionState {
    match raw {
        STATE_STARTED => SubscriptionState::Started,
        STATE_ERRORED => SubscriptionState::Errored,
        STATE_STOPPED => SubscriptionState::Stopped,
        _ => SubscriptionState::Idle,
    }
}

/// Callback invoked when the transport confirms the stream.
pub type StartedCallback = Arc<dyn Fn() + Send + Sync>;
/// Callback invoked for each data event.
pub type DataCallback = Arc<dyn Fn(Value) + Send + Sync>;
/// Callback invoked when the stream fails.
pub type ErrorCallback = Arc<dyn Fn(ClientError) + Send + Sync>;

/// Caller-supplied subscription options.
#[derive(Clone)]
pub struct SubscriptionOptions {
    /// When false, the subscription is registered but never started.
    pub enabled: bool,
    /// Invoked once when the stream is confirmed.
    pub on_started: Option<StartedCallback>,
    /// Invoked for each data event.
    pub on_data: DataCallback,
    /// Invoked when the stream fails.
    pub on_error: Option<ErrorCallback>,
}

impl SubscriptionOptions {
    /// Options with a data callback and defaults otherwise.
    pub fn new(on_data: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self {
            enabled: true,
            on_started: None,
            on_data: Arc::new(on_data),
            on_error: None,
        }
    }

    /// Set the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Attach a started callback.
    pub fn on_started(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_started = Some(Arc::new(f));
        self
    }

    /// Attach an error callback.
    pub fn on_error(mut self, f: impl Fn(ClientError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for SubscriptionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionOptions")
            .field("enabled", &self.enabled)
            .field("on_started", &self.on_started.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// The state-guarded observer handed to the transport collaborator.
///
/// Every emission is checked against the state machine, so a transport that
/// keeps emitting after teardown cannot reach the caller's callbacks.
#[derive(Clone)]
pub struct SubscriptionObserver {
    state: Arc<AtomicU8>,
    options: SubscriptionOptions,
}

impl SubscriptionObserver {
    fn new(state: Arc<AtomicU8>, options: SubscriptionOptions) -> Self {
        Self { state, options }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        state_from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Transport confirmed the stream. Fires `on_started` at most once,
    /// and never after stop.
    pub fn started(&self) {
        let moved = self
            .state
            .compare_exchange(STATE_IDLE, STATE_STARTED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if moved {
            if let Some(on_started) = &self.options.on_started {
                on_started();
            }
        }
    }

    /// A data event arrived. Forwarded only while the stream is started.
    pub fn data(&self, value: Value) {
        if self.state.load(Ordering::SeqCst) == STATE_STARTED {
            (self.options.on_data)(value);
        }
    }

    /// The stream failed. Forwarded unless already errored or stopped.
    pub fn error(&self, error: ClientError) {
        let from_idle = self
            .state
            .compare_exchange(STATE_IDLE, STATE_ERRORED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        let from_started = !from_idle
            && self
                .state
                .compare_exchange(
                    STATE_STARTED,
                    STATE_ERRORED,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok();
        if from_idle || from_started {
            if let Some(on_error) = &self.options.on_error {
                on_error(error);
            }
        }
    }
}

impl fmt::Debug for SubscriptionObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionObserver")
            .field("state", &self.state())
            .finish()
    }
}

/// Handle to an active subscription.
pub struct SubscriptionHandle {
    /// Unique subscription ID.
    pub id: SubscriptionId,
    /// Resolved wire path of the subscribed route.
    pub path: String,
    state: Arc<AtomicU8>,
    signal: Arc<CancellationSignal>,
    inner: Mutex<Option<Box<dyn Unsubscribable>>>,
}

impl SubscriptionHandle {
    /// Create a handle in the idle state.
    pub fn new(id: SubscriptionId, path: impl Into<String>) -> Self {
        Self {
            id,
            path: path.into(),
            state: Arc::new(AtomicU8::new(STATE_IDLE)),
            signal: Arc::new(CancellationSignal::new()),
            inner: Mutex::new(None),
        }
    }

    /// Build the guarded observer that shares this handle's state.
    pub fn observer(&self, options: SubscriptionOptions) -> SubscriptionObserver {
        SubscriptionObserver::new(self.state.clone(), options)
    }

    /// Attach the transport's teardown hook.
    pub fn attach(&self, unsubscribable: Box<dyn Unsubscribable>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        *inner = Some(unsubscribable);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        state_from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the subscription was torn down.
    pub fn is_stopped(&self) -> bool {
        self.state() == SubscriptionState::Stopped
    }

    /// The cancellation signal tied to this subscription.
    pub fn signal(&self) -> Arc<CancellationSignal> {
        self.signal.clone()
    }

    /// Tear the subscription down. Idempotent; reachable from any state.
    pub fn unsubscribe(&self) {
        let previous = self.state.swap(STATE_STOPPED, Ordering::SeqCst);
        if previous == STATE_STOPPED {
            return;
        }
        debug!(id = %self.id, path = %self.path, "subscription stopped");
        self.signal.cancel();
        let inner = {
            let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            guard.take()
        };
        if let Some(unsubscribable) = inner {
            unsubscribable.unsubscribe();
        }
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Tracks active subscriptions so a consumer teardown can cancel them all.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    subscriptions: RwLock<HashMap<SubscriptionId, Arc<SubscriptionHandle>>>,
}

impl SubscriptionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a subscription.
    pub fn register(&self, handle: Arc<SubscriptionHandle>) -> SubscriptionId {
        let id = handle.id;
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, handle);
        id
    }

    /// Tear down and forget one subscription.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        let removed = self
            .subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
        match removed {
            Some(handle) => {
                handle.unsubscribe();
                true
            }
            None => false,
        }
    }

    /// Number of tracked subscriptions.
    pub fn count(&self) -> usize {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether a subscription is tracked.
    pub fn exists(&self, id: &SubscriptionId) -> bool {
        self.subscriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
    }

    /// Tear down every tracked subscription.
    pub fn cancel_all(&self) {
        let drained: Vec<_> = {
            let mut subscriptions = self
                .subscriptions
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            subscriptions.drain().map(|(_, handle)| handle).collect()
        };
        for handle in drained {
            handle.unsubscribe();
        }
    }

    /// Forget subscriptions that already stopped.
    pub fn cleanup(&self) {
        self.subscriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, handle| !handle.is_stopped());
    }
}
