//! Caching/fetching collaborator interface
//!
//! Cache storage, retries, and refetch scheduling are owned by an external
//! runtime. This core hands it a derived key, an async fetch function, and
//! type-erased passthrough options, and receives back a live handle. The
//! handle is wrapped with a [`RouteExtension`] so keys can be derived from a
//! result without re-traversing the proxy chain.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::ClientResult;
use crate::input::MutationVariables;
use crate::key::{get_mutation_key, get_query_key, MutationKey, QueryKey, QueryType};
use crate::subscription::CancellationSignal;

/// Context handed to a fetch function on each execution.
#[derive(Clone, Default)]
pub struct QueryFnContext {
    /// Cancellation signal, forwarded when abort-on-unmount is enabled.
    pub signal: Option<Arc<CancellationSignal>>,
    /// Cursor for infinite queries; injected at `query.cursor`.
    pub page_param: Option<Value>,
}

impl fmt::Debug for QueryFnContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryFnContext")
            .field("signal", &self.signal.is_some())
            .field("page_param", &self.page_param)
            .finish()
    }
}

/// Async fetch function registered with the runtime.
pub type QueryFn =
    Arc<dyn Fn(QueryFnContext) -> BoxFuture<'static, ClientResult<Value>> + Send + Sync>;

/// Async mutation function registered with the runtime.
pub type MutationFn =
    Arc<dyn Fn(MutationVariables) -> BoxFuture<'static, ClientResult<Value>> + Send + Sync>;

/// Success callback for mutations, invoked with the result and the
/// variables that produced it.
pub type OnSuccessFn = Arc<dyn Fn(&Value, &MutationVariables) + Send + Sync>;

/// A query registration handed to the runtime.
pub struct QueryRegistration {
    /// Structural cache identity.
    pub query_key: QueryKey,
    /// Kind recorded in the key.
    pub query_type: QueryType,
    /// Fetch function; `None` when the call was skipped and the runtime
    /// should register a permanently-pending entry.
    pub query_fn: Option<QueryFn>,
    /// Passthrough options the runtime interprets (staleness, retry, ...).
    pub options: Option<Value>,
}

impl fmt::Debug for QueryRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryRegistration")
            .field("query_key", &self.query_key)
            .field("query_type", &self.query_type)
            .field("skipped", &self.query_fn.is_none())
            .field("options", &self.options)
            .finish()
    }
}

/// A mutation registration handed to the runtime.
pub struct MutationRegistration {
    /// Path-only cache identity.
    pub mutation_key: MutationKey,
    /// Mutation function executed per invocation.
    pub mutation_fn: MutationFn,
    /// Invoked by the runtime after a successful mutation.
    pub on_success: Option<OnSuccessFn>,
    /// Passthrough options the runtime interprets.
    pub options: Option<Value>,
}

impl fmt::Debug for MutationRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRegistration")
            .field("mutation_key", &self.mutation_key)
            .field("on_success", &self.on_success.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// Live query handle owned by the runtime.
pub trait QueryObserver: Send + Sync {
    /// Re-execute the fetch function and return the fresh value.
    fn fetch(&self) -> BoxFuture<'static, ClientResult<Value>>;
}

/// Live mutation handle owned by the runtime.
pub trait MutationObserver: Send + Sync {
    /// Execute the mutation with the given variables.
    fn mutate(&self, variables: MutationVariables) -> BoxFuture<'static, ClientResult<Value>>;
}

/// The external caching/fetching collaborator.
pub trait QueryRuntime: Send + Sync {
    /// Register a query and return its live handle.
    fn register_query(&self, registration: QueryRegistration) -> Arc<dyn QueryObserver>;

    /// Register several queries at once, preserving order.
    fn register_queries(
        &self,
        registrations: Vec<QueryRegistration>,
    ) -> Vec<Arc<dyn QueryObserver>> {
        registrations
            .into_iter()
            .map(|registration| self.register_query(registration))
            .collect()
    }

    /// Register a mutation and return its live handle.
    fn register_mutation(&self, registration: MutationRegistration) -> Arc<dyn MutationObserver>;

    /// Execute a query once, outside any registered observer.
    fn fetch_query(&self, registration: QueryRegistration) -> BoxFuture<'static, ClientResult<Value>>;

    /// Drop cached entries whose keys match the filter (prefix semantics,
    /// see [`QueryKey::matches`]).
    fn invalidate(&self, filter: &QueryKey);
}

/// Introspection metadata attached to every returned handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteExtension {
    /// The resolved, verb-free path of the route.
    pub path: Vec<String>,
}

impl RouteExtension {
    /// Extension for a resolved path.
    pub fn new(path: Vec<String>) -> Self {
        Self { path }
    }

    /// Derive a query key from this handle's path.
    pub fn query_key(&self, input: Option<&crate::input::NormalizedInput>, query_type: QueryType) -> QueryKey {
        get_query_key(&self.path, input, query_type)
    }

    /// Derive a mutation key from this handle's path.
    pub fn mutation_key(&self, options: Option<Value>) -> MutationKey {
        get_mutation_key(&self.path, options)
    }
}

/// A registered query with its route metadata.
#[derive(Clone)]
pub struct QueryResult {
    /// Live handle owned by the runtime.
    pub handle: Arc<dyn QueryObserver>,
    /// Route introspection metadata.
    pub route: RouteExtension,
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryResult")
            .field("route", &self.route)
            .finish()
    }
}

/// A registered mutation with its route metadata.
#[derive(Clone)]
pub struct MutationResult {
    /// Live handle owned by the runtime.
    pub handle: Arc<dyn MutationObserver>,
    /// Route introspection metadata.
    pub route: RouteExtension,
}

impl fmt::Debug for MutationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationResult")
            .field("route", &self.route)
            .finish()
    }
}
