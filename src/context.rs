//! Client context and ambient registration
//!
//! Every terminal operation runs against an explicit [`ClientContext`]
//! holding the two collaborators. The ambient slot is a thin convenience at
//! the boundary: a host registers a context once via [`provide_context`],
//! and proxies built with [`crate::RouteProxy::from_ambient`] resolve it
//! lazily. Invoking an operation with nothing registered is a fatal setup
//! error, not something this core recovers from.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{ClientError, ClientResult};
use crate::runtime::QueryRuntime;
use crate::subscription::SubscriptionManager;
use crate::transport::Transport;

/// Inputs for building a [`ClientContext`].
#[derive(Clone)]
pub struct ContextProps {
    /// Transport collaborator executing requests.
    pub client: Arc<dyn Transport>,
    /// Caching/fetching collaborator owning storage and retries.
    pub runtime: Arc<dyn QueryRuntime>,
    /// Client-level abort-on-unmount default.
    pub abort_on_unmount: bool,
}

impl ContextProps {
    /// Props with abort-on-unmount off.
    pub fn new(client: Arc<dyn Transport>, runtime: Arc<dyn QueryRuntime>) -> Self {
        Self {
            client,
            runtime,
            abort_on_unmount: false,
        }
    }

    /// Set the client-level abort-on-unmount default.
    pub fn abort_on_unmount(mut self, enabled: bool) -> Self {
        self.abort_on_unmount = enabled;
        self
    }
}

/// Shared state every terminal operation runs against.
#[derive(Clone)]
pub struct ClientContext {
    /// Transport collaborator.
    pub client: Arc<dyn Transport>,
    /// Caching/fetching collaborator.
    pub runtime: Arc<dyn QueryRuntime>,
    /// Client-level abort-on-unmount default.
    pub abort_on_unmount: bool,
    /// Active subscriptions, cancelled together on teardown.
    pub subscriptions: Arc<SubscriptionManager>,
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("abort_on_unmount", &self.abort_on_unmount)
            .field("subscriptions", &self.subscriptions.count())
            .finish()
    }
}

/// Build a context from props.
pub fn create_context(props: ContextProps) -> ClientContext {
    ClientContext {
        client: props.client,
        runtime: props.runtime,
        abort_on_unmount: props.abort_on_unmount,
        subscriptions: Arc::new(SubscriptionManager::new()),
    }
}

static AMBIENT: RwLock<Option<ClientContext>> = RwLock::new(None);

/// Register a context in the ambient slot, replacing any previous one.
pub fn provide_context(context: ClientContext) {
    let mut slot = AMBIENT.write().unwrap_or_else(PoisonError::into_inner);
    *slot = Some(context);
}

/// Resolve the ambient context.
///
/// # Errors
/// Returns [`ClientError::context_missing`] when nothing was registered.
pub fn current_context() -> ClientResult<ClientContext> {
    let slot = AMBIENT.read().unwrap_or_else(PoisonError::into_inner);
    slot.clone().ok_or_else(ClientError::context_missing)
}

/// Clear the ambient slot, cancelling the context's subscriptions.
pub fn clear_context() {
    let taken = {
        let mut slot = AMBIENT.write().unwrap_or_else(PoisonError::into_inner);
        slot.take()
    };
    if let Some(context) = taken {
        context.subscriptions.cancel_all();
    }
}
