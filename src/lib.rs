//! Route-proxy and query-key resolution engine
//!
//! Callers describe an API call as a chain of route hops against a
//! statically-known route tree; this crate resolves that chain into a
//! canonical path, an accumulated set of path-parameter substitutions, a
//! normalized input object, and a stable, structurally-ordered cache key.
//! Execution and storage stay with two external collaborators: a
//! [`Transport`] that runs requests and a [`QueryRuntime`] that owns
//! caching, retries, and refetching.
//!
//! ```rust,ignore
//! use route_query::prelude::*;
//!
//! let client = route_query::create_client(ContextProps::new(transport, runtime), None);
//!
//! let result = client
//!     .route("nendoroid")
//!     .param("id", 1895)
//!     .route("name")
//!     .route("get")
//!     .use_query(Some(json!({"location": "jp"})), None)?;
//!
//! // result.route.path == ["nendoroid", ":id", "name"]
//! ```

use std::sync::Arc;

mod argument;
mod config;
mod context;
mod error;
mod input;
mod key;
mod operations;
mod path;
mod proxy;
mod runtime;
mod subscription;
mod transport;

#[cfg(test)]
mod tests;

pub use argument::{get_path_param, Argument, PathParam};
pub use config::{
    merge_option_objects, resolve_abort_on_unmount, split_base_options, ClientConfig,
    QueryBaseOptions, BASE_OPTIONS_KEY,
};
pub use context::{
    clear_context, create_context, current_context, provide_context, ClientContext, ContextProps,
};
pub use error::{ClientError, ClientErrorCode, ClientResult};
pub use input::{
    fold_params, mutation_wire_input, normalize_args, thread_params_into_variables,
    MutationVariables, NormalizedCall, NormalizedInput,
};
pub use key::{
    get_mutation_key, get_query_key, KeyParams, MutationKey, QueryKey, QueryType,
};
pub use operations::{
    MutationOptions, OperationKind, QueryInput, RootHooks, RouteUtils,
};
pub use path::{
    is_http_method, parse_paths_and_method, placeholder, Endpoint, RoutePath, DEFAULT_METHOD,
    HTTP_MUTATION_METHODS, HTTP_QUERY_METHODS, HTTP_SUBSCRIPTION_METHODS, PATH_SEPARATOR,
    RESERVED_SELF_SEGMENT,
};
pub use proxy::{get_route_mutation_key, get_route_query_key, Invocation, RouteProxy};
pub use runtime::{
    MutationFn, MutationObserver, MutationRegistration, MutationResult, OnSuccessFn, QueryFn,
    QueryFnContext, QueryObserver, QueryRegistration, QueryResult, QueryRuntime, RouteExtension,
};
pub use subscription::{
    CancellationSignal, DataCallback, ErrorCallback, StartedCallback, SubscriptionHandle,
    SubscriptionId, SubscriptionManager, SubscriptionObserver, SubscriptionOptions,
    SubscriptionState,
};
pub use transport::{RequestParams, Transport, TransportResponse, Unsubscribable};

/// Build a root proxy bound to an explicit context.
pub fn create_client(props: ContextProps, config: Option<ClientConfig>) -> RouteProxy {
    let context = create_context(props);
    RouteProxy::new(Arc::new(RootHooks::new(context, config)))
}

/// Build a root proxy resolving the ambient context registered via
/// [`provide_context`].
///
/// # Errors
/// Fails with `ContextMissing` when no context was registered.
pub fn create_ambient_client(config: Option<ClientConfig>) -> ClientResult<RouteProxy> {
    RouteProxy::from_ambient(config)
}

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        create_client, Argument, ClientConfig, ClientContext, ClientError, ClientErrorCode,
        ClientResult, ContextProps, MutationOptions, MutationVariables, NormalizedInput,
        QueryInput, QueryKey, QueryRuntime, QueryType, RequestParams, RouteProxy,
        SubscriptionOptions, Transport, TransportResponse,
    };
}
