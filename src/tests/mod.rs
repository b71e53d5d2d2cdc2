//! Test modules for route-query
//!
//! Property-based tests live next to scenario tests; the mocks below stand
//! in for the two external collaborators so chains can be driven end to end
//! without any I/O.


#[cfg(test)]
pub mod proxy_tests;


use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::atomic::AtomicUsize;
use std::sync::{Arc, Mutex};

use crate::error::{ClientError, ClientResult};
use crate::key::{MutationKey, QueryKey, QueryType};
use crate::runtime::{
    MutationFn, MutationObserver, MutationRegistration, QueryFn, QueryFnContext, QueryObserver,
    QueryRegistration, QueryRuntime,
};
use crate::subscription::SubscriptionObserver;
use crate::transport::{RequestParams, Transport, TransportResponse, Unsubscribable};
use crate::{ClientConfig, ContextProps, RouteProxy};

/// Transport double: records requests, echoes a canned response, and hands
/// out its subscription observers for manual driving.
pub struct MockTransport {
    pub requests: Mutex<Vec<RequestParams>>,
    pub observers: Mutex<Vec<SubscriptionObserver>>,
    pub unsubscribe_count: Arc<AtomicUsize>,
    response: TransportResponse,
}

impl MockTransport {
    pub fn returning(value: Value) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            unsubscribe_count: Arc::new(AtomicUsize::new(0)),
            response: TransportResponse::data(value),
        })
    }

    pub fn failing(error: ClientError) -> Arc<Self> {
        Arc::new(Self {
            requests: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            unsubscribe_count: Arc::new(AtomicUsize::new(0)),
            response: TransportResponse::error(error),
        })
    }

    pub fn last_request(&self) -> RequestParams {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn last_observer(&self) -> SubscriptionObserver {
        self.observers.lock().unwrap().last().cloned().expect("no observer recorded")
    }
}

struct MockUnsubscribable {
    count: Arc<AtomicUsize>,
}

impl Unsubscribable for MockUnsubscribable {
    fn unsubscribe(&self) {
        self.count.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Transport for MockTransport {
    fn query(&self, params: RequestParams) -> BoxFuture<'static, TransportResponse> {
        self.requests.lock().unwrap().push(params);
        let response = self.response.clone();
        Box::pin(async move { response })
    }

    fn subscribe(
        &self,
        params: RequestParams,
        observer: SubscriptionObserver,
    ) -> Box<dyn Unsubscribable> {
        self.requests.lock().unwrap().push(params);
        self.observers.lock().unwrap().push(observer);
        Box::new(MockUnsubscribable {
            count: self.unsubscribe_count.clone(),
        })
    }
}

/// Snapshot of a query registration, minus the fetch closure.
pub struct QuerySnapshot {
    pub query_key: QueryKey,
    pub query_type: QueryType,
    pub skipped: bool,
    pub options: Option<Value>,
}

/// Runtime double: records registrations and returns observers that run the
/// registered functions directly.
#[derive(Default)]
pub struct MockRuntime {
    pub queries: Mutex<Vec<QuerySnapshot>>,
    pub mutations: Mutex<Vec<(MutationKey, bool, Option<Value>)>>,
    pub invalidations: Mutex<Vec<QueryKey>>,
}

impl MockRuntime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn last_query(&self) -> QueryKey {
        self.queries.lock().unwrap().last().map(|s| s.query_key.clone()).expect("no query registered")
    }
}

pub struct MockQueryObserver {
    query_fn: Option<QueryFn>,
}

impl MockQueryObserver {
    /// Drive the registered fetch function with an explicit context.
    pub fn run(&self, context: QueryFnContext) -> BoxFuture<'static, ClientResult<Value>> {
        match &self.query_fn {
            Some(fetch) => fetch(context),
            None => Box::pin(async { Err(ClientError::internal("query was skipped")) }),
        }
    }
}

impl QueryObserver for MockQueryObserver {
    fn fetch(&self) -> BoxFuture<'static, ClientResult<Value>> {
        self.run(QueryFnContext::default())
    }
}

pub struct MockMutationObserver {
    mutation_fn: MutationFn,
}

impl MutationObserver for MockMutationObserver {
    fn mutate(
        &self,
        variables: crate::input::MutationVariables,
    ) -> BoxFuture<'static, ClientResult<Value>> {
        (self.mutation_fn)(variables)
    }
}

impl QueryRuntime for MockRuntime {
    fn register_query(&self, registration: QueryRegistration) -> Arc<dyn QueryObserver> {
        self.queries.lock().unwrap().push(QuerySnapshot {
            query_key: registration.query_key,
            query_type: registration.query_type,
            skipped: registration.query_fn.is_none(),
            options: registration.options,
        });
        Arc::new(MockQueryObserver {
            query_fn: registration.query_fn,
        })
    }

    fn register_mutation(&self, registration: MutationRegistration) -> Arc<dyn MutationObserver> {
        self.mutations.lock().unwrap().push((
            registration.mutation_key,
            registration.on_success.is_some(),
            registration.options,
        ));
        Arc::new(MockMutationObserver {
            mutation_fn: registration.mutation_fn,
        })
    }

    fn fetch_query(
        &self,
        registration: QueryRegistration,
    ) -> BoxFuture<'static, ClientResult<Value>> {
        match registration.query_fn {
            Some(fetch) => fetch(QueryFnContext::default()),
            None => Box::pin(async { Err(ClientError::internal("query was skipped")) }),
        }
    }

    fn invalidate(&self, filter: &QueryKey) {
        self.invalidations.lock().unwrap().push(filter.clone());
    }
}

/// Build a root proxy over the given doubles.
pub fn client_with(
    transport: Arc<MockTransport>,
    runtime: Arc<MockRuntime>,
    config: Option<ClientConfig>,
) -> RouteProxy {
    crate::create_client(ContextProps::new(transport, runtime), config)
}
