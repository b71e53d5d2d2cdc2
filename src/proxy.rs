//! Recursive route proxy
//!
//! A [`RouteProxy`] represents an as-yet-unresolved route: an immutable
//! value carrying the segments and parameter bindings accumulated so far.
//! Each hop returns a new proxy; nothing is shared mutably, so chains
//! branching from a common prefix stay isolated.
//!
//! A chain terminates either through the typed operation methods
//! ([`RouteProxy::use_query`] and friends) or through the dynamic
//! [`RouteProxy::invoke`] entry point, which classifies the call arguments
//! the way the typed methods do: a leading parameter binding extends the
//! chain, anything else resolves the trailing segment as an operation name.
//!
//! Chains that terminate before any route segment was added are not guarded
//! here; they surface as operation lookup failures. The proxy is meant to be
//! driven from statically-known route definitions, where such chains do not
//! occur.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::argument::{get_path_param, Argument};
use crate::config::ClientConfig;
use crate::context::{current_context, ClientContext};
use crate::error::{ClientError, ClientResult};
use crate::input::{fold_params, normalize_args, NormalizedInput};
use crate::key::{get_query_key, MutationKey, QueryKey, QueryType};
use crate::operations::{MutationOptions, OperationKind, QueryInput, RootHooks, RouteUtils};
use crate::path::{parse_paths_and_method, RoutePath};
use crate::runtime::{MutationResult, QueryResult};
use crate::subscription::{SubscriptionHandle, SubscriptionOptions};

/// The outcome of a dynamic [`RouteProxy::invoke`] call.
#[derive(Debug)]
pub enum Invocation {
    /// The call bound a path parameter; the chain continues.
    Hop(RouteProxy),
    /// The chain terminated in a query registration.
    Query(QueryResult),
    /// The chain terminated in an infinite-query registration.
    InfiniteQuery(QueryResult),
    /// The chain terminated in a mutation registration.
    Mutation(MutationResult),
    /// The chain terminated in the utils accessor.
    Utils(RouteUtils),
}

/// An infinitely extensible route path bound to the root operation set.
#[derive(Clone)]
pub struct RouteProxy {
    hooks: Arc<RootHooks>,
    path: RoutePath,
}

impl fmt::Debug for RouteProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteProxy")
            .field("segments", &self.path.segments())
            .finish()
    }
}

impl RouteProxy {
    /// The root of a chain.
    pub fn new(hooks: Arc<RootHooks>) -> Self {
        Self {
            hooks,
            path: RoutePath::root(),
        }
    }

    /// A root chain resolving the ambient context.
    ///
    /// # Errors
    /// Fails with `ContextMissing` when no context was provided.
    pub fn from_ambient(config: Option<ClientConfig>) -> ClientResult<Self> {
        let context = current_context()?;
        Ok(Self::new(Arc::new(RootHooks::new(context, config))))
    }

    /// The bound context.
    pub fn context(&self) -> &ClientContext {
        self.hooks.context()
    }

    /// Extend the chain with a route segment.
    ///
    /// The reserved `"index"` segment models the route's own node and does
    /// not extend the sequence: `root.route("index").route("users")` equals
    /// `root.route("users")`.
    pub fn route(&self, segment: &str) -> Self {
        Self {
            hooks: self.hooks.clone(),
            path: self.path.push_segment(segment),
        }
    }

    /// Extend the chain with a parameter binding (`users.param("id", 5)`
    /// appends the `:id` placeholder and records the value).
    pub fn param(&self, name: &str, value: impl Into<Value>) -> Self {
        Self {
            hooks: self.hooks.clone(),
            path: self.path.push_param(name, value.into()),
        }
    }

    /// The raw accumulated path segments.
    ///
    /// This is the introspection escape hatch used by the key-derivation
    /// helpers; it never dispatches an operation.
    pub fn defs(&self) -> Vec<String> {
        self.path.segments().to_vec()
    }

    /// The parameter bindings recorded so far, in traversal order.
    pub fn bindings(&self) -> &[(String, Value)] {
        self.path.bindings()
    }

    /// Dynamic terminal call.
    ///
    /// A leading [`Argument::Param`] produces a [`Invocation::Hop`] unless
    /// the trailing segment already names an operation. Otherwise the
    /// trailing segment is popped and resolved through the operation
    /// dispatch table; unrecognized names fail with `OperationNotFound`.
    ///
    /// Subscriptions carry callbacks and cannot travel through value-shaped
    /// arguments; terminate those chains with [`Self::use_subscription`].
    pub fn invoke(&self, args: Vec<Argument>) -> ClientResult<Invocation> {
        if let Some(param) = get_path_param(&args) {
            let terminal_is_operation = self
                .path
                .segments()
                .last()
                .is_some_and(|segment| OperationKind::from_name(segment).is_some());
            if !terminal_is_operation {
                trace!(param = %param.key, "parameter-binding hop");
                return Ok(Invocation::Hop(Self {
                    hooks: self.hooks.clone(),
                    path: self.path.push_param(&param.key, param.value),
                }));
            }
        }

        let (terminal, rest) = self.path.split_terminal();
        let kind = OperationKind::from_name(&terminal)
            .ok_or_else(|| ClientError::operation_not_found(&terminal))?;
        trace!(operation = %kind, segments = ?rest.segments(), "dispatching terminal call");

        let call = normalize_args(kind, &args, rest.bindings())?;

        match kind {
            OperationKind::Query => Ok(Invocation::Query(self.hooks.use_query(
                rest.segments(),
                call.input.into(),
                call.options,
            ))),
            OperationKind::InfiniteQuery => Ok(Invocation::InfiniteQuery(
                self.hooks
                    .use_infinite_query(rest.segments(), call.input.into(), call.options),
            )),
            OperationKind::Mutation => Ok(Invocation::Mutation(self.hooks.use_mutation(
                rest.segments(),
                call.input,
                MutationOptions {
                    on_success: None,
                    options: call.options,
                },
            ))),
            OperationKind::Subscription => Err(ClientError::subscription(
                "subscriptions take callbacks; terminate the chain with `use_subscription`",
            )),
            OperationKind::Utils => Ok(Invocation::Utils(self.hooks.use_utils(rest.segments()))),
        }
    }

    /// Terminate the chain in a query.
    pub fn use_query(
        &self,
        input: Option<Value>,
        options: Option<Value>,
    ) -> ClientResult<QueryResult> {
        match self.terminal(OperationKind::Query, input, options)? {
            Invocation::Query(result) => Ok(result),
            other => Err(unexpected_invocation(OperationKind::Query, &other)),
        }
    }

    /// Terminate the chain in a query that is registered but never fetched.
    pub fn use_query_skipped(&self, options: Option<Value>) -> QueryResult {
        self.hooks
            .use_query(self.path.segments(), QueryInput::Skip, options)
    }

    /// Terminate the chain in an infinite query.
    pub fn use_infinite_query(
        &self,
        input: Option<Value>,
        options: Option<Value>,
    ) -> ClientResult<QueryResult> {
        match self.terminal(OperationKind::InfiniteQuery, input, options)? {
            Invocation::InfiniteQuery(result) => Ok(result),
            other => Err(unexpected_invocation(OperationKind::InfiniteQuery, &other)),
        }
    }

    /// Terminate the chain in a mutation.
    pub fn use_mutation(&self, options: MutationOptions) -> ClientResult<MutationResult> {
        let call = normalize_args(OperationKind::Mutation, &[], self.path.bindings())?;
        Ok(self
            .hooks
            .use_mutation(self.path.segments(), call.input, options))
    }

    /// Terminate the chain in a subscription.
    pub fn use_subscription(
        &self,
        input: Option<Value>,
        options: SubscriptionOptions,
    ) -> ClientResult<Arc<SubscriptionHandle>> {
        let args = input.map(Argument::input).into_iter().collect::<Vec<_>>();
        let call = normalize_args(OperationKind::Subscription, &args, self.path.bindings())?;
        Ok(self
            .hooks
            .use_subscription(self.path.segments(), call.input, options))
    }

    /// Utilities scoped to this route.
    pub fn use_utils(&self) -> RouteUtils {
        self.hooks.use_utils(self.path.segments())
    }

    fn terminal(
        &self,
        kind: OperationKind,
        input: Option<Value>,
        options: Option<Value>,
    ) -> ClientResult<Invocation> {
        let mut args = Vec::new();
        if let Some(input) = input {
            args.push(Argument::input(input));
        }
        if let Some(options) = options {
            args.push(Argument::options(options));
        }
        self.route(kind.name()).invoke(args)
    }
}

fn unexpected_invocation(expected: OperationKind, got: &Invocation) -> ClientError {
    ClientError::internal(format!(
        "operation '{}' resolved to an unexpected invocation: {:?}",
        expected, got
    ))
}

/// Derive a query key from a route handle without invoking the operation.
///
/// The handle's accumulated bindings become `input.params`; `input` supplies
/// the query data. The trailing HTTP verb, if present, is parsed off so the
/// key matches the one the operation itself would derive.
pub fn get_route_query_key(
    route: &RouteProxy,
    input: Option<Value>,
    query_type: QueryType,
) -> QueryKey {
    let endpoint = parse_paths_and_method(route.path.segments());
    let normalized = NormalizedInput::from_parts(fold_params(route.path.bindings()), input);
    get_query_key(&endpoint.paths, normalized.as_ref(), query_type)
}

/// Derive a mutation key from a route handle without invoking the operation.
pub fn get_route_mutation_key(route: &RouteProxy, options: Option<Value>) -> MutationKey {
    let endpoint = parse_paths_and_method(route.path.segments());
    crate::key::get_mutation_key(&endpoint.paths, options)
}
