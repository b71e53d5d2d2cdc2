//! Input normalization
//!
//! At the terminal call of a chain, the accumulated parameter bindings and
//! the caller's trailing arguments are folded into a single
//! [`NormalizedInput`]. That object is the only argument the key builder and
//! the root operations see afterward; no path-parameter value travels to
//! those layers independently.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::argument::Argument;
use crate::error::{ClientError, ClientResult};
use crate::operations::OperationKind;

/// The normalized input of a terminal call: folded path parameters plus the
/// caller-supplied query or body data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedInput {
    /// Path-parameter substitutions, keyed by parameter name.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
    /// Query data for read operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    /// Body data for write operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl NormalizedInput {
    /// True when the input carries no params, query, or body.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.query.is_none() && self.body.is_none()
    }

    /// Build an input from folded params and optional query data, or `None`
    /// when both are absent so derived keys stay minimal.
    pub fn from_parts(params: Map<String, Value>, query: Option<Value>) -> Option<Self> {
        if params.is_empty() && query.is_none() {
            return None;
        }
        Some(Self {
            params,
            query,
            body: None,
        })
    }
}

/// Fold an ordered binding list into a single params map.
///
/// Bindings are applied in traversal order. Re-binding the same name twice
/// in one chain should not occur under correct typed usage; when it does,
/// the later binding wins.
pub fn fold_params(bindings: &[(String, Value)]) -> Map<String, Value> {
    let mut params = Map::new();
    for (name, value) in bindings {
        if params.insert(name.clone(), value.clone()).is_some() {
            warn!(param = %name, "duplicate path parameter binding; keeping the later value");
        }
    }
    params
}

/// A terminal call after argument normalization.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedCall {
    /// Merged input, absent when the call carried neither params nor data.
    pub input: Option<NormalizedInput>,
    /// Passthrough options bag for the caching collaborator.
    pub options: Option<Value>,
}

/// Normalize the trailing arguments of a terminal call.
///
/// Operations that accept no structured input (the utils accessor) pass
/// their options through unchanged. A `Param` argument reaching this layer
/// means the chain classified it as non-binding; that is a usage error.
pub fn normalize_args(
    kind: OperationKind,
    args: &[Argument],
    bindings: &[(String, Value)],
) -> ClientResult<NormalizedCall> {
    let mut query: Option<Value> = None;
    let mut options: Option<Value> = None;

    for arg in args {
        match arg {
            Argument::Param { name, .. } => {
                return Err(ClientError::bad_arguments(format!(
                    "path parameter '{}' cannot be bound on a terminal operation",
                    name
                )));
            }
            Argument::Input(value) => {
                if !kind.accepts_input() {
                    return Err(ClientError::bad_arguments(format!(
                        "operation '{}' does not accept input",
                        kind
                    )));
                }
                if kind == OperationKind::Mutation {
                    return Err(ClientError::bad_arguments(
                        "mutations take their body at dispatch time, not as call input",
                    ));
                }
                if query.replace(value.clone()).is_some() {
                    return Err(ClientError::bad_arguments("duplicate input argument"));
                }
            }
            Argument::Options(value) => {
                if options.replace(value.clone()).is_some() {
                    return Err(ClientError::bad_arguments("duplicate options argument"));
                }
            }
        }
    }

    if !kind.accepts_input() {
        return Ok(NormalizedCall {
            input: None,
            options,
        });
    }

    let input = NormalizedInput::from_parts(fold_params(bindings), query);

    Ok(NormalizedCall { input, options })
}

/// The variables a mutation handle is invoked with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationVariables {
    /// Request body.
    pub body: Value,
    /// Per-invocation options (may carry `params` and `query` fragments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl MutationVariables {
    /// Variables with a body and no options.
    pub fn new(body: impl Into<Value>) -> Self {
        Self {
            body: body.into(),
            options: None,
        }
    }

    /// Attach per-invocation options.
    pub fn with_options(mut self, options: impl Into<Value>) -> Self {
        self.options = Some(options.into());
        self
    }
}

/// Thread accumulated path parameters into a mutation's options layer.
///
/// The variables' own `options.params` entries win over accumulated ones,
/// so a per-invocation override stays possible.
pub fn thread_params_into_variables(
    params: &Map<String, Value>,
    mut variables: MutationVariables,
) -> MutationVariables {
    if params.is_empty() {
        return variables;
    }

    let mut options = match variables.options.take() {
        Some(Value::Object(map)) => map,
        Some(_) => {
            warn!("mutation options was not an object; replacing with params-only options");
            Map::new()
        }
        None => Map::new(),
    };

    let mut merged = params.clone();
    if let Some(Value::Object(existing)) = options.remove("params") {
        for (key, value) in existing {
            merged.insert(key, value);
        }
    }
    options.insert("params".to_string(), Value::Object(merged));

    variables.options = Some(Value::Object(options));
    variables
}

/// Project mutation variables into the wire-level input for the transport.
pub fn mutation_wire_input(variables: &MutationVariables) -> NormalizedInput {
    let mut params = Map::new();
    let mut query = None;

    if let Some(Value::Object(options)) = &variables.options {
        if let Some(Value::Object(p)) = options.get("params") {
            params = p.clone();
        }
        query = options.get("query").cloned();
    }

    NormalizedInput {
        params,
        query,
        body: Some(variables.body.clone()),
    }
}
