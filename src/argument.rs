//! Call-argument classification
//!
//! A proxy chain cannot tell from position alone whether a call supplies a
//! dynamic path-segment value or the first ordinary input argument. The
//! distinction is made structural: call sites produce [`Argument`] variants,
//! and [`get_path_param`] only ever recognizes the `Param` tag. A bare value
//! that happens to look like `{"id": 5}` is never mistaken for a path
//! parameter.

use serde_json::Value;

/// A tagged call argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    /// A dynamic path-segment binding (`users(":id" -> 5)`).
    Param {
        /// Parameter name, without the placeholder marker.
        name: String,
        /// Bound runtime value.
        value: Value,
    },
    /// Ordinary operation input (a query object or request body).
    Input(Value),
    /// An options bag passed through to the caching collaborator.
    Options(Value),
}

impl Argument {
    /// Tag a value as a path-parameter binding.
    pub fn param(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Param {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Tag a value as ordinary operation input.
    pub fn input(value: impl Into<Value>) -> Self {
        Self::Input(value.into())
    }

    /// Tag a value as a passthrough options bag.
    pub fn options(value: impl Into<Value>) -> Self {
        Self::Options(value.into())
    }
}

/// A recognized path-parameter binding extracted from call arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct PathParam {
    /// Parameter name, without the placeholder marker.
    pub key: String,
    /// Bound runtime value.
    pub value: Value,
}

/// Decide whether a call supplies a path-parameter binding.
///
/// Only a leading `Param` argument counts; a trailing options bag alone, or
/// an ordinary input object, yields nothing.
pub fn get_path_param(args: &[Argument]) -> Option<PathParam> {
    match args.first() {
        Some(Argument::Param { name, value }) => Some(PathParam {
            key: name.clone(),
            value: value.clone(),
        }),
        _ => None,
    }
}
