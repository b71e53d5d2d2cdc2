//! Root operation set
//!
//! The fixed map of operations a chain can terminate in. Each operation
//! derives the cache identity for the resolved route, builds an async fetch
//! function over the transport, and delegates execution to the caching
//! runtime. Nothing here performs I/O or stores results.

use futures::future::BoxFuture;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::config::{
    merge_option_objects, resolve_abort_on_unmount, split_base_options, ClientConfig,
};
use crate::context::ClientContext;
use crate::input::{
    mutation_wire_input, thread_params_into_variables, NormalizedInput,
};
use crate::key::{get_mutation_key, get_query_key, MutationKey, QueryKey, QueryType};
use crate::path::parse_paths_and_method;
use crate::runtime::{
    MutationFn, MutationRegistration, MutationResult, OnSuccessFn, QueryFn, QueryObserver,
    QueryRegistration, QueryResult, RouteExtension,
};
use crate::subscription::{SubscriptionHandle, SubscriptionId, SubscriptionOptions};
use crate::transport::RequestParams;

/// The operation a chain terminated in, resolved from the terminal name
/// through a typed dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Read operation registered with the caching runtime.
    Query,
    /// Cursor-paginated read operation.
    InfiniteQuery,
    /// Write operation keyed by path only.
    Mutation,
    /// Streaming operation with explicit teardown.
    Subscription,
    /// Accessor for key derivation and invalidation helpers.
    Utils,
}

impl OperationKind {
    /// Resolve a terminal segment name to an operation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "use_query" => Some(Self::Query),
            "use_infinite_query" => Some(Self::InfiniteQuery),
            "use_mutation" => Some(Self::Mutation),
            "use_subscription" => Some(Self::Subscription),
            "use_utils" => Some(Self::Utils),
            _ => None,
        }
    }

    /// The terminal segment name of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Query => "use_query",
            Self::InfiniteQuery => "use_infinite_query",
            Self::Mutation => "use_mutation",
            Self::Subscription => "use_subscription",
            Self::Utils => "use_utils",
        }
    }

    /// Whether the operation accepts structured input.
    pub fn accepts_input(&self) -> bool {
        !matches!(self, Self::Utils)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Query input, with an explicit skip marker.
///
/// A skipped query is registered with the runtime (so the key exists for
/// invalidation and deduplication) but carries no fetch function.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum QueryInput {
    /// No input at all; the derived key stays minimal.
    #[default]
    Empty,
    /// Normalized input.
    Value(NormalizedInput),
    /// Register without ever fetching.
    Skip,
}

impl QueryInput {
    /// The normalized input, when present.
    pub fn as_normalized(&self) -> Option<&NormalizedInput> {
        match self {
            Self::Value(input) => Some(input),
            _ => None,
        }
    }

    fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl From<Option<NormalizedInput>> for QueryInput {
    fn from(input: Option<NormalizedInput>) -> Self {
        match input {
            Some(input) => Self::Value(input),
            None => Self::Empty,
        }
    }
}

/// Options for registering a mutation.
#[derive(Clone, Default)]
pub struct MutationOptions {
    /// Invoked by the runtime after a successful mutation.
    pub on_success: Option<OnSuccessFn>,
    /// Passthrough options the runtime interprets.
    pub options: Option<Value>,
}

impl MutationOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a success callback.
    pub fn on_success(
        mut self,
        f: impl Fn(&Value, &crate::input::MutationVariables) + Send + Sync + 'static,
    ) -> Self {
        self.on_success = Some(Arc::new(f));
        self
    }

    /// Attach passthrough options.
    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("on_success", &self.on_success.is_some())
            .field("options", &self.options)
            .finish()
    }
}

/// The root operation set, bound to a context and optional configuration.
#[derive(Clone)]
pub struct RootHooks {
    context: ClientContext,
    config: Option<ClientConfig>,
}

impl fmt::Debug for RootHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RootHooks")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish()
    }
}

impl RootHooks {
    /// Bind the operation set to a context.
    pub fn new(context: ClientContext, config: Option<ClientConfig>) -> Self {
        Self { context, config }
    }

    /// The bound context.
    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Build the registration for a plain query without registering it.
    pub fn query_options(
        &self,
        segments: &[String],
        input: QueryInput,
        options: Option<Value>,
    ) -> QueryRegistration {
        self.build_query_registration(segments, input, options, QueryType::Query)
    }

    /// Build the registration for an infinite query without registering it.
    pub fn infinite_query_options(
        &self,
        segments: &[String],
        input: QueryInput,
        options: Option<Value>,
    ) -> QueryRegistration {
        self.build_query_registration(segments, input, options, QueryType::Infinite)
    }

    /// Register a query and return its handle with route metadata attached.
    pub fn use_query(
        &self,
        segments: &[String],
        input: QueryInput,
        options: Option<Value>,
    ) -> QueryResult {
        let registration = self.query_options(segments, input, options);
        let route = RouteExtension::new(registration.query_key.path.clone());
        let handle = self.context.runtime.register_query(registration);
        QueryResult { handle, route }
    }

    /// Register an infinite query and return its handle with route metadata.
    pub fn use_infinite_query(
        &self,
        segments: &[String],
        input: QueryInput,
        options: Option<Value>,
    ) -> QueryResult {
        let registration = self.infinite_query_options(segments, input, options);
        let route = RouteExtension::new(registration.query_key.path.clone());
        let handle = self.context.runtime.register_query(registration);
        QueryResult { handle, route }
    }

    /// Register a batch of queries built by the caller.
    ///
    /// The closure assembles registrations through [`Self::query_options`] /
    /// [`Self::infinite_query_options`]; they are handed to the runtime in
    /// one call, preserving order.
    pub fn use_queries<F>(&self, build: F) -> Vec<Arc<dyn QueryObserver>>
    where
        F: FnOnce(&Self) -> Vec<QueryRegistration>,
    {
        let registrations = build(self);
        self.context.runtime.register_queries(registrations)
    }

    /// Build the registration for a mutation without registering it.
    pub fn mutation_options(
        &self,
        segments: &[String],
        input: Option<NormalizedInput>,
        options: MutationOptions,
    ) -> MutationRegistration {
        let endpoint = parse_paths_and_method(segments);
        let mutation_key = get_mutation_key(&endpoint.paths, None);
        debug!(path = %endpoint.path, method = %endpoint.method, "derived mutation key");

        let captured: Map<String, Value> = input.map(|i| i.params).unwrap_or_default();
        let client = self.context.client.clone();
        let path = endpoint.path;
        let method = endpoint.method;

        let mutation_fn: MutationFn = Arc::new(move |variables| {
            let threaded = thread_params_into_variables(&captured, variables);
            let wire = mutation_wire_input(&threaded);
            let params = RequestParams {
                path: path.clone(),
                method: method.clone(),
                options: Some(wire),
                signal: None,
            };
            let response = client.query(params);
            Box::pin(async move { response.await.into_result() })
        });

        MutationRegistration {
            mutation_key,
            mutation_fn,
            on_success: options.on_success,
            options: options.options,
        }
    }

    /// Register a mutation and return its handle with route metadata.
    pub fn use_mutation(
        &self,
        segments: &[String],
        input: Option<NormalizedInput>,
        options: MutationOptions,
    ) -> MutationResult {
        let registration = self.mutation_options(segments, input, options);
        let route = RouteExtension::new(registration.mutation_key.path.clone());
        let handle = self.context.runtime.register_mutation(registration);
        MutationResult { handle, route }
    }

    /// Open a subscription on the resolved route.
    ///
    /// The returned handle must be torn down explicitly (or dropped); its
    /// observer is state-guarded, so transport emissions after teardown
    /// never reach the caller's callbacks.
    pub fn use_subscription(
        &self,
        segments: &[String],
        input: Option<NormalizedInput>,
        options: SubscriptionOptions,
    ) -> Arc<SubscriptionHandle> {
        let endpoint = parse_paths_and_method(segments);
        let handle = Arc::new(SubscriptionHandle::new(
            SubscriptionId::new(),
            endpoint.path.clone(),
        ));

        if options.enabled {
            let observer = handle.observer(options);
            let params = RequestParams {
                path: endpoint.path,
                method: endpoint.method,
                options: input,
                signal: Some(handle.signal()),
            };
            let unsubscribable = self.context.client.subscribe(params, observer);
            handle.attach(unsubscribable);
        }

        self.context.subscriptions.register(handle.clone());
        handle
    }

    /// Utilities scoped to the resolved route.
    pub fn use_utils(&self, segments: &[String]) -> RouteUtils {
        RouteUtils {
            hooks: self.clone(),
            segments: segments.to_vec(),
        }
    }

    fn build_query_registration(
        &self,
        segments: &[String],
        input: QueryInput,
        options: Option<Value>,
        query_type: QueryType,
    ) -> QueryRegistration {
        let endpoint = parse_paths_and_method(segments);
        let query_key = get_query_key(&endpoint.paths, input.as_normalized(), query_type);
        debug!(path = %endpoint.path, method = %endpoint.method, kind = %query_type, "derived query key");

        let defaults = self
            .config
            .as_ref()
            .and_then(|config| config.default_query_options.clone());
        let (base, passthrough) = split_base_options(merge_option_objects(defaults, options));
        let forward_signal =
            resolve_abort_on_unmount(&base, self.config.as_ref(), self.context.abort_on_unmount);

        let query_fn = if input.is_skip() {
            None
        } else {
            let client = self.context.client.clone();
            let normalized = match input {
                QueryInput::Value(input) => Some(input),
                _ => None,
            };
            let path = endpoint.path;
            let method = endpoint.method;
            let infinite = query_type == QueryType::Infinite;

            let fetch: QueryFn = Arc::new(move |fn_ctx| {
                let mut wire = normalized.clone();
                if infinite {
                    if let Some(page_param) = fn_ctx.page_param.clone() {
                        inject_cursor(wire.get_or_insert_with(NormalizedInput::default), page_param);
                    }
                }
                let params = RequestParams {
                    path: path.clone(),
                    method: method.clone(),
                    options: wire,
                    signal: if forward_signal { fn_ctx.signal } else { None },
                };
                let response = client.query(params);
                Box::pin(async move { response.await.into_result() })
            });
            Some(fetch)
        };

        QueryRegistration {
            query_key,
            query_type,
            query_fn,
            options: passthrough,
        }
    }
}

/// Place an infinite query's page cursor at `query.cursor`.
fn inject_cursor(input: &mut NormalizedInput, page_param: Value) {
    match &mut input.query {
        Some(Value::Object(query)) => {
            query.insert("cursor".to_string(), page_param);
        }
        _ => {
            let mut query = Map::new();
            query.insert("cursor".to_string(), page_param);
            input.query = Some(Value::Object(query));
        }
    }
}

/// Key-derivation and invalidation helpers scoped to one route.
#[derive(Clone)]
pub struct RouteUtils {
    hooks: RootHooks,
    segments: Vec<String>,
}

impl fmt::Debug for RouteUtils {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteUtils")
            .field("segments", &self.segments)
            .finish()
    }
}

impl RouteUtils {
    /// The verb-free path of this route.
    pub fn path(&self) -> Vec<String> {
        parse_paths_and_method(&self.segments).paths
    }

    /// Derive a query key for this route.
    pub fn query_key(&self, input: Option<&NormalizedInput>, query_type: QueryType) -> QueryKey {
        get_query_key(&self.path(), input, query_type)
    }

    /// Derive a mutation key for this route.
    pub fn mutation_key(&self) -> MutationKey {
        get_mutation_key(&self.path(), None)
    }

    /// Invalidate every cached entry under this route's path prefix.
    pub fn invalidate(&self) {
        let filter = QueryKey::from_path(self.path());
        self.hooks.context().runtime.invalidate(&filter);
    }

    /// Fetch this route once, outside any registered observer.
    pub fn fetch(
        &self,
        input: QueryInput,
        options: Option<Value>,
    ) -> BoxFuture<'static, crate::error::ClientResult<Value>> {
        let registration = self.hooks.query_options(&self.segments, input, options);
        self.hooks.context().runtime.fetch_query(registration)
    }
}
