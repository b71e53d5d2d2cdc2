//! Chain resolution tests
//!
//! Drives full chains against the collaborator doubles: path accumulation,
//! parameter hops, terminal dispatch, key derivation, and the wire-level
//! requests the fetch functions produce.

use serde_json::{json, Map};
use std::sync::Arc;

use crate::input::NormalizedInput;
use crate::key::{QueryKey, QueryType};
use crate::operations::{MutationOptions, QueryInput, RootHooks};
use crate::runtime::QueryFnContext;
use crate::subscription::CancellationSignal;
use crate::tests::{client_with, MockRuntime, MockTransport};
use crate::{
    clear_context, create_context, get_route_mutation_key, get_route_query_key, provide_context,
    Argument, ClientConfig, ClientErrorCode, ContextProps, Invocation, MutationVariables,
};

fn segs(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let transport = MockTransport::returning(json!("Nendoroid Shiki Ichinose"));
    let runtime = MockRuntime::new();
    let client = client_with(transport.clone(), runtime.clone(), None);

    let result = client
        .route("nendoroid")
        .param("id", 1895)
        .route("name")
        .route("get")
        .use_query(Some(json!({"location": "jp"})), None)
        .unwrap();

    // Key identity: placeholders intact, substituted values inside input.
    assert_eq!(
        serde_json::to_value(runtime.last_query()).unwrap(),
        json!([
            ["nendoroid", ":id", "name"],
            {"input": {"params": {"id": 1895}, "query": {"location": "jp"}}, "type": "query"}
        ])
    );

    // Route metadata on the handle.
    assert_eq!(result.route.path, segs(&["nendoroid", ":id", "name"]));

    // Wire-level request produced by the fetch function.
    let value = result.handle.fetch().await.unwrap();
    assert_eq!(value, json!("Nendoroid Shiki Ichinose"));

    let request = transport.last_request();
    assert_eq!(request.path, "nendoroid.:id.name");
    assert_eq!(request.method, "get");

    let options = request.options.unwrap();
    assert_eq!(options.params["id"], json!(1895));
    assert_eq!(options.query, Some(json!({"location": "jp"})));
    assert_eq!(options.body, None);
}

#[test]
fn test_reserved_index_segment_is_noop() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let direct = client.route("users");
    let through_index = client.route("index").route("users").route("index");

    assert_eq!(direct.defs(), through_index.defs());
}

#[test]
fn test_branch_isolation() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let users = client.route("users");
    let a = users.param("id", 5);
    let b = users.param("id", 9);

    assert_eq!(a.bindings(), [("id".to_string(), json!(5))]);
    assert_eq!(b.bindings(), [("id".to_string(), json!(9))]);
    assert!(users.bindings().is_empty());
}

#[test]
fn test_binding_order_preserved() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime.clone(), None);

    client
        .route("a")
        .param("id", 5)
        .route("b")
        .param("slug", "x")
        .route("get")
        .use_query(None, None)
        .unwrap();

    let key = runtime.last_query();
    assert_eq!(key.path, segs(&["a", ":id", "b", ":slug"]));

    let input = key.params.unwrap().input.unwrap();
    let params = input["params"].as_object().unwrap();
    let keys: Vec<_> = params.keys().cloned().collect();
    assert_eq!(keys, ["id", "slug"]);
}

#[tokio::test]
async fn test_no_parameter_passthrough() {
    let transport = MockTransport::returning(json!([]));
    let runtime = MockRuntime::new();
    let client = client_with(transport.clone(), runtime.clone(), None);

    let result = client
        .route("users")
        .route("get")
        .use_query(None, None)
        .unwrap();

    // Minimal key: no wrapper beyond the recorded kind.
    assert_eq!(
        serde_json::to_value(runtime.last_query()).unwrap(),
        json!([["users"], {"type": "query"}])
    );

    result.handle.fetch().await.unwrap();
    let request = transport.last_request();
    assert_eq!(request.options, None);
}

#[test]
fn test_unknown_operation_is_a_resolution_error() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let err = client
        .route("users")
        .route("use_querry")
        .invoke(Vec::new())
        .unwrap_err();

    assert_eq!(err.code, ClientErrorCode::OperationNotFound);
}

#[test]
fn test_invoke_param_hop_extends_chain() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let hop = client
        .route("users")
        .invoke(vec![Argument::param("id", 5)])
        .unwrap();

    let Invocation::Hop(proxy) = hop else {
        panic!("expected a parameter-binding hop");
    };
    assert_eq!(proxy.defs(), segs(&["users", ":id"]));
    assert_eq!(proxy.bindings(), [("id".to_string(), json!(5))]);
}

#[test]
fn test_param_does_not_hop_on_terminal_operation() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    // The trailing segment names an operation, so the binding cannot hop;
    // it reaches normalization and is rejected there.
    let err = client
        .route("users")
        .route("use_query")
        .invoke(vec![Argument::param("id", 5)])
        .unwrap_err();

    assert_eq!(err.code, ClientErrorCode::BadArguments);
}

#[test]
fn test_invoke_dispatches_query() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime.clone(), None);

    let invocation = client
        .route("users")
        .route("get")
        .route("use_query")
        .invoke(vec![Argument::input(json!({"page": 1}))])
        .unwrap();

    assert!(matches!(invocation, Invocation::Query(_)));
    assert_eq!(
        serde_json::to_value(runtime.last_query()).unwrap(),
        json!([["users"], {"input": {"query": {"page": 1}}, "type": "query"}])
    );
}

#[test]
fn test_key_helper_matches_operation_key() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime.clone(), None);

    let route = client.route("nendoroid").param("id", 1895).route("name").route("get");

    route
        .use_query(Some(json!({"location": "jp"})), None)
        .unwrap();

    let derived = get_route_query_key(&route, Some(json!({"location": "jp"})), QueryType::Query);
    assert_eq!(derived, runtime.last_query());
}

#[test]
fn test_mutation_key_helper_is_path_only() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let route = client.route("users").param("id", 3).route("post");
    let key = get_route_mutation_key(&route, None);

    assert_eq!(
        serde_json::to_value(key).unwrap(),
        json!([["users", ":id"]])
    );
}

#[test]
fn test_skipped_query_registers_without_fetch_fn() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime.clone(), None);

    client
        .route("users")
        .route("get")
        .use_query_skipped(None);

    let queries = runtime.queries.lock().unwrap();
    let snapshot = queries.last().unwrap();
    assert!(snapshot.skipped);
    assert_eq!(snapshot.query_type, QueryType::Query);
    assert_eq!(
        serde_json::to_value(&snapshot.query_key).unwrap(),
        json!([["users"], {"type": "query"}])
    );
}

#[tokio::test]
async fn test_infinite_query_injects_cursor_and_strips_it_from_key() {
    let transport = MockTransport::returning(json!({"items": []}));
    let runtime = MockRuntime::new();
    let client = client_with(transport.clone(), runtime.clone(), None);

    client
        .route("feed")
        .route("get")
        .use_infinite_query(Some(json!({"limit": 10})), None)
        .unwrap();

    // Key records the infinite kind and the cursor-free input.
    assert_eq!(
        serde_json::to_value(runtime.last_query()).unwrap(),
        json!([["feed"], {"input": {"query": {"limit": 10}}, "type": "infinite"}])
    );

    // Drive the registered fetch function with a page param.
    let hooks = RootHooks::new(
        create_context(ContextProps::new(transport.clone(), runtime.clone())),
        None,
    );
    let mut input = NormalizedInput::default();
    input.query = Some(json!({"limit": 10}));
    let registration =
        hooks.infinite_query_options(&segs(&["feed", "get"]), QueryInput::Value(input), None);

    let fetch = registration.query_fn.unwrap();
    fetch(QueryFnContext {
        signal: None,
        page_param: Some(json!("page-2")),
    })
    .await
    .unwrap();

    let request = transport.last_request();
    assert_eq!(
        request.options.unwrap().query,
        Some(json!({"limit": 10, "cursor": "page-2"}))
    );
}

#[tokio::test]
async fn test_mutation_threads_params_and_body() {
    let transport = MockTransport::returning(json!({"ok": true}));
    let runtime = MockRuntime::new();
    let client = client_with(transport.clone(), runtime.clone(), None);

    let result = client
        .route("users")
        .param("id", 7)
        .route("post")
        .use_mutation(MutationOptions::new())
        .unwrap();

    // Path-only mutation identity.
    {
        let mutations = runtime.mutations.lock().unwrap();
        let (key, has_on_success, _) = mutations.last().unwrap();
        assert_eq!(
            serde_json::to_value(key).unwrap(),
            json!([["users", ":id"]])
        );
        assert!(!has_on_success);
    }

    let out = result
        .handle
        .mutate(MutationVariables::new(json!({"name": "updated"})))
        .await
        .unwrap();
    assert_eq!(out, json!({"ok": true}));

    let request = transport.last_request();
    assert_eq!(request.path, "users.:id");
    assert_eq!(request.method, "post");

    let options = request.options.unwrap();
    assert_eq!(options.params["id"], json!(7));
    assert_eq!(options.body, Some(json!({"name": "updated"})));
}

#[tokio::test]
async fn test_transport_error_surfaces_unwrapped() {
    let original = crate::ClientError::transport("bad gateway").with_details(json!({"status": 502}));
    let transport = MockTransport::failing(original.clone());
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let result = client
        .route("users")
        .route("get")
        .use_query(None, None)
        .unwrap();

    let err = result.handle.fetch().await.unwrap_err();
    assert_eq!(err, original);
}

#[test]
fn test_reserved_options_section_is_not_passed_through() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime.clone(), None);

    client
        .route("users")
        .route("get")
        .use_query(
            None,
            Some(json!({"route": {"abort_on_unmount": true}, "retry": 3})),
        )
        .unwrap();

    let queries = runtime.queries.lock().unwrap();
    assert_eq!(queries.last().unwrap().options, Some(json!({"retry": 3})));
}

#[test]
fn test_config_defaults_merge_under_call_options() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let config = ClientConfig::new()
        .with_default_query_options(json!({"stale_time": 500, "retry": 1}));
    let client = client_with(transport, runtime.clone(), Some(config));

    client
        .route("users")
        .route("get")
        .use_query(None, Some(json!({"retry": 3})))
        .unwrap();

    let queries = runtime.queries.lock().unwrap();
    assert_eq!(
        queries.last().unwrap().options,
        Some(json!({"stale_time": 500, "retry": 3}))
    );
}

#[tokio::test]
async fn test_abort_on_unmount_precedence() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();

    let signal_ctx = || QueryFnContext {
        signal: Some(Arc::new(CancellationSignal::new())),
        page_param: None,
    };

    // Client-level default forwards the signal.
    let hooks = RootHooks::new(
        create_context(ContextProps::new(transport.clone(), runtime.clone()).abort_on_unmount(true)),
        None,
    );
    let registration = hooks.query_options(&segs(&["users", "get"]), QueryInput::Empty, None);
    registration.query_fn.unwrap()(signal_ctx()).await.unwrap();
    assert!(transport.last_request().signal.is_some());

    // Call-level override wins over client and config.
    let hooks = RootHooks::new(
        create_context(ContextProps::new(transport.clone(), runtime.clone()).abort_on_unmount(true)),
        Some(ClientConfig::new().with_abort_on_unmount(true)),
    );
    let registration = hooks.query_options(
        &segs(&["users", "get"]),
        QueryInput::Empty,
        Some(json!({"route": {"abort_on_unmount": false}})),
    );
    registration.query_fn.unwrap()(signal_ctx()).await.unwrap();
    assert!(transport.last_request().signal.is_none());

    // Default is off.
    let hooks = RootHooks::new(
        create_context(ContextProps::new(transport.clone(), runtime.clone())),
        None,
    );
    let registration = hooks.query_options(&segs(&["users", "get"]), QueryInput::Empty, None);
    registration.query_fn.unwrap()(signal_ctx()).await.unwrap();
    assert!(transport.last_request().signal.is_none());
}

#[test]
fn test_use_queries_preserves_order() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let hooks = RootHooks::new(
        create_context(ContextProps::new(transport, runtime.clone())),
        None,
    );

    let handles = hooks.use_queries(|h| {
        vec![
            h.query_options(&segs(&["users", "get"]), QueryInput::Empty, None),
            h.query_options(&segs(&["posts", "get"]), QueryInput::Empty, None),
        ]
    });

    assert_eq!(handles.len(), 2);
    let queries = runtime.queries.lock().unwrap();
    assert_eq!(queries[0].query_key.path, segs(&["users"]));
    assert_eq!(queries[1].query_key.path, segs(&["posts"]));
}

#[tokio::test]
async fn test_utils_invalidate_and_fetch() {
    let transport = MockTransport::returning(json!([1, 2, 3]));
    let runtime = MockRuntime::new();
    let client = client_with(transport.clone(), runtime.clone(), None);

    let utils = client.route("users").param("id", 2).use_utils();

    utils.invalidate();
    {
        let invalidations = runtime.invalidations.lock().unwrap();
        assert_eq!(
            invalidations.last().unwrap(),
            &QueryKey::from_path(segs(&["users", ":id"]))
        );
    }

    let value = utils.fetch(QueryInput::Empty, None).await.unwrap();
    assert_eq!(value, json!([1, 2, 3]));
    assert_eq!(transport.last_request().path, "users.:id");
}

#[test]
fn test_utils_keys() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let utils = client.route("users").route("get").use_utils();
    assert_eq!(utils.path(), segs(&["users"]));

    let mut params = Map::new();
    params.insert("id".to_string(), json!(1));
    let input = NormalizedInput {
        params,
        query: None,
        body: None,
    };
    let key = utils.query_key(Some(&input), QueryType::Query);
    assert_eq!(
        serde_json::to_value(key).unwrap(),
        json!([["users"], {"input": {"params": {"id": 1}}, "type": "query"}])
    );

    assert_eq!(
        serde_json::to_value(utils.mutation_key()).unwrap(),
        json!([["users"]])
    );
}

#[test]
fn test_ambient_context_lifecycle() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();

    // Nothing registered yet: fatal setup error.
    clear_context();
    let err = crate::create_ambient_client(None).unwrap_err();
    assert_eq!(err.code, ClientErrorCode::ContextMissing);

    provide_context(create_context(ContextProps::new(transport, runtime.clone())));
    let client = crate::create_ambient_client(None).unwrap();
    client.route("users").route("get").use_query(None, None).unwrap();
    assert_eq!(runtime.last_query().path, segs(&["users"]));

    clear_context();
    assert_eq!(
        crate::create_ambient_client(None).unwrap_err().code,
        ClientErrorCode::ContextMissing
    );
}

#[test]
fn test_duplicate_binding_last_write_wins() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime.clone(), None);

    client
        .route("users")
        .param("id", 1)
        .route("detail")
        .param("id", 2)
        .route("get")
        .use_query(None, None)
        .unwrap();

    let key = runtime.last_query();
    let input = key.params.unwrap().input.unwrap();
    assert_eq!(input["params"], json!({"id": 2}));
}

#[test]
fn test_subscription_via_invoke_is_rejected() {
    let transport = MockTransport::returning(json!(null));
    let runtime = MockRuntime::new();
    let client = client_with(transport, runtime, None);

    let err = client
        .route("events")
        .route("use_subscription")
        .invoke(Vec::new())
        .unwrap_err();
    assert_eq!(err.code, ClientErrorCode::SubscriptionError);
}
