//! Cache-key derivation
//!
//! Keys are array-shaped and deterministic: the same path, structurally
//! equal input, and operation kind always produce a deeply equal key. The
//! path component keeps placeholders as written (`:id`), never substituted
//! runtime values; substituted values live inside `input.params`. When a key
//! carries neither input nor type, the trailing wrapper is omitted entirely
//! so that invalidating by path alone matches every key sharing that prefix.

use serde::de::{Deserializer, Error as DeError};
use serde::ser::{SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::input::NormalizedInput;

/// The operation kind recorded inside a query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// A plain query.
    Query,
    /// An infinite (cursor-paginated) query.
    Infinite,
    /// Matches any kind; never recorded in a key.
    Any,
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query => write!(f, "query"),
            Self::Infinite => write!(f, "infinite"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// The optional second element of a query key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyParams {
    /// Normalized input, serialized structurally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Operation kind, omitted for `Any`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
}

impl KeyParams {
    fn is_empty(&self) -> bool {
        self.input.is_none() && self.query_type.is_none()
    }
}

/// A structurally-ordered query cache key: `[path]` or `[path, {input?, type?}]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryKey {
    /// Path segments with placeholders left intact.
    pub path: Vec<String>,
    /// Input/type wrapper, omitted for minimal keys.
    pub params: Option<KeyParams>,
}

impl QueryKey {
    /// A path-only key, usable as an invalidation filter.
    pub fn from_path(path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            params: None,
        }
    }

    /// Whether this key is matched by `filter`.
    ///
    /// A filter matches when its path is a prefix of this key's path and
    /// every component it pins (input, type) is structurally equal here.
    pub fn matches(&self, filter: &QueryKey) -> bool {
        if !self.path.starts_with(&filter.path) {
            return false;
        }
        match &filter.params {
            None => true,
            Some(pinned) => {
                let own = self.params.clone().unwrap_or_default();
                (pinned.input.is_none() || pinned.input == own.input)
                    && (pinned.query_type.is_none() || pinned.query_type == own.query_type)
            }
        }
    }
}

impl Serialize for QueryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let empty = self.path.is_empty() && self.params.is_none();
        let len = if empty {
            0
        } else if self.params.is_some() {
            2
        } else {
            1
        };
        let mut seq = serializer.serialize_seq(Some(len))?;
        if !empty {
            seq.serialize_element(&self.path)?;
            if let Some(params) = &self.params {
                seq.serialize_element(params)?;
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for QueryKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut elements = Vec::<Value>::deserialize(deserializer)?;
        if elements.len() > 2 {
            return Err(D::Error::custom("query key has more than two elements"));
        }
        let params = if elements.len() == 2 {
            let raw = elements.pop().unwrap_or_default();
            Some(serde_json::from_value(raw).map_err(D::Error::custom)?)
        } else {
            None
        };
        let path = match elements.pop() {
            Some(raw) => serde_json::from_value(raw).map_err(D::Error::custom)?,
            None => Vec::new(),
        };
        Ok(Self { path, params })
    }
}

/// A mutation cache key: `[path]`, optionally decorated with options.
///
/// Mutation identity intentionally excludes variable input, so repeated
/// calls to the same endpoint share one key regardless of payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationKey {
    /// Path segments with placeholders left intact.
    pub path: Vec<String>,
    /// Optional options decoration.
    pub options: Option<Value>,
}

impl Serialize for MutationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.options.is_some() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.path)?;
        if let Some(options) = &self.options {
            seq.serialize_element(options)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for MutationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut elements = Vec::<Value>::deserialize(deserializer)?;
        if elements.is_empty() || elements.len() > 2 {
            return Err(D::Error::custom("mutation key must have one or two elements"));
        }
        let options = if elements.len() == 2 { elements.pop() } else { None };
        let path = serde_json::from_value(elements.pop().unwrap_or_default())
            .map_err(D::Error::custom)?;
        Ok(Self { path, options })
    }
}

/// Cursor fields stripped from an infinite query's keyed input, so every
/// page of one infinite query resolves to the same key.
const INFINITE_CURSOR_KEYS: &[&str] = &["cursor", "direction"];

/// Derive the cache key for a query-like operation.
pub fn get_query_key(
    paths: &[String],
    input: Option<&NormalizedInput>,
    query_type: QueryType,
) -> QueryKey {
    let keyed_input = input.filter(|i| !i.is_empty()).map(|i| {
        let mut keyed = i.clone();
        if query_type == QueryType::Infinite {
            if let Some(Value::Object(query)) = &mut keyed.query {
                for key in INFINITE_CURSOR_KEYS {
                    query.remove(*key);
                }
            }
        }
        serde_json::to_value(keyed).unwrap_or(Value::Null)
    });

    let params = KeyParams {
        input: keyed_input,
        query_type: (query_type != QueryType::Any).then_some(query_type),
    };

    QueryKey {
        path: paths.to_vec(),
        params: (!params.is_empty()).then_some(params),
    }
}

/// Derive the cache key for a mutation operation.
pub fn get_mutation_key(paths: &[String], options: Option<Value>) -> MutationKey {
    MutationKey {
        path: paths.to_vec(),
        options,
    }
}
