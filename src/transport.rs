//! Transport collaborator interface
//!
//! This core performs no network I/O. A [`Transport`] executes requests and
//! answers with a `{data, error}` pair; converting that pair into a single
//! `Result` happens inside the fetch functions this crate builds, so the
//! caching collaborator always observes either a value or the original,
//! unwrapped transport error.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::{ClientError, ClientResult};
use crate::input::NormalizedInput;
use crate::subscription::{CancellationSignal, SubscriptionObserver};

/// The wire-level request handed to the transport.
#[derive(Debug, Clone)]
pub struct RequestParams {
    /// Resolved route path, placeholders in wire form (`users.:id.posts`).
    pub path: String,
    /// Resolved HTTP-like method.
    pub method: String,
    /// Normalized input: path params plus query or body data.
    pub options: Option<NormalizedInput>,
    /// Present when abort-on-unmount resolved to enabled for this call.
    pub signal: Option<Arc<CancellationSignal>>,
}

/// The transport's answer: data or error, never meaningfully both.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    /// Successful payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Failure reported by the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ClientError>,
}

impl TransportResponse {
    /// A successful response.
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            data: Some(value.into()),
            error: None,
        }
    }

    /// A failed response.
    pub fn error(error: ClientError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    /// Collapse into a single result. The error side wins when both are
    /// present, and the error object is surfaced unwrapped.
    pub fn into_result(self) -> ClientResult<Value> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

/// Teardown hook returned by [`Transport::subscribe`].
pub trait Unsubscribable: Send + Sync {
    /// Stop the underlying stream.
    fn unsubscribe(&self);
}

/// The external request-execution collaborator.
pub trait Transport: Send + Sync {
    /// Execute a request asynchronously.
    fn query(&self, params: RequestParams) -> BoxFuture<'static, TransportResponse>;

    /// Open a streaming subscription, emitting through `observer`.
    fn subscribe(
        &self,
        params: RequestParams,
        observer: SubscriptionObserver,
    ) -> Box<dyn Unsubscribable>;
}
