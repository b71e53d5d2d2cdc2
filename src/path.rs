//! Route path accumulation and path/method parsing
//!
//! A [`RoutePath`] is the immutable value a proxy chain threads through each
//! hop: an ordered list of segments (literals and `:name` placeholders) plus
//! the parameter bindings recorded in lock-step with the placeholders.
//! Extension is copy-on-append, so two chains branching from a common prefix
//! never observe each other's later segments.
//!
//! Route trees encode the HTTP verb as the deepest accessor (`...get()`,
//! `...post()`), but the wire path must not contain the verb;
//! [`parse_paths_and_method`] splits the two apart.

use serde_json::Value;

/// Segment that models an explicit "self" route node.
///
/// Accessing it does not extend the path sequence.
pub const RESERVED_SELF_SEGMENT: &str = "index";

/// Method used when the trailing segment is not a recognized verb.
pub const DEFAULT_METHOD: &str = "get";

/// Separator used when rendering a segment sequence as a wire path.
pub const PATH_SEPARATOR: &str = ".";

/// Verbs that resolve to query (read) semantics.
pub const HTTP_QUERY_METHODS: &[&str] = &["get", "options", "head"];

/// Verbs that resolve to mutation (write) semantics.
pub const HTTP_MUTATION_METHODS: &[&str] = &["post", "put", "patch", "delete"];

/// Verbs that resolve to subscription (streaming) semantics.
pub const HTTP_SUBSCRIPTION_METHODS: &[&str] = &["subscribe", "ws"];

/// Check whether a segment belongs to the HTTP verb vocabulary.
pub fn is_http_method(segment: &str) -> bool {
    HTTP_QUERY_METHODS.contains(&segment)
        || HTTP_MUTATION_METHODS.contains(&segment)
        || HTTP_SUBSCRIPTION_METHODS.contains(&segment)
}

/// Render a parameter name in its placeholder wire form (`:name`).
pub fn placeholder(name: &str) -> String {
    format!(":{}", name)
}

/// An accumulated route path: segments plus parameter bindings.
///
/// Invariant: every placeholder segment has a binding recorded at the
/// matching position of the binding list, in traversal order. Both lists are
/// copied on every extension; a `RoutePath` is never mutated in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutePath {
    segments: Vec<String>,
    bindings: Vec<(String, Value)>,
}

impl RoutePath {
    /// The empty path at the root of a chain.
    pub fn root() -> Self {
        Self::default()
    }

    /// Return a new path with `segment` appended.
    ///
    /// The reserved `"index"` segment is a pass-through: the returned path
    /// is unchanged.
    pub fn push_segment(&self, segment: &str) -> Self {
        if segment == RESERVED_SELF_SEGMENT {
            return self.clone();
        }
        let mut next = self.clone();
        next.segments.push(segment.to_string());
        next
    }

    /// Return a new path with a `:name` placeholder appended and the
    /// corresponding binding recorded.
    pub fn push_param(&self, name: &str, value: Value) -> Self {
        let mut next = self.clone();
        next.segments.push(placeholder(name));
        next.bindings.push((name.to_string(), value));
        next
    }

    /// The accumulated segments, placeholders included.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The parameter bindings recorded so far, in traversal order.
    pub fn bindings(&self) -> &[(String, Value)] {
        &self.bindings
    }

    /// Split off the trailing segment, returning it with the remaining path.
    ///
    /// Returns an empty name when the chain never added a segment; the
    /// downstream operation lookup surfaces that misuse.
    pub fn split_terminal(&self) -> (String, Self) {
        let mut rest = self.clone();
        let terminal = rest.segments.pop().unwrap_or_default();
        (terminal, rest)
    }

    /// Whether the trailing segment names an HTTP verb.
    pub fn ends_with_method(&self) -> bool {
        self.segments
            .last()
            .is_some_and(|segment| is_http_method(segment))
    }
}

/// A parsed endpoint: the verb-free segment sequence, its rendered wire
/// path, and the resolved method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Segments with the trailing verb removed, placeholders intact.
    pub paths: Vec<String>,
    /// Segments joined with [`PATH_SEPARATOR`].
    pub path: String,
    /// The popped verb, or [`DEFAULT_METHOD`] when none was present.
    pub method: String,
}

/// Split an accumulated segment sequence into `{paths, path, method}`.
///
/// If the trailing segment matches the verb vocabulary it is popped and
/// becomes the method; otherwise the method falls back to `"get"`.
pub fn parse_paths_and_method(segments: &[String]) -> Endpoint {
    let mut paths = segments.to_vec();

    let method = match paths.last() {
        Some(last) if is_http_method(last) => paths.pop().unwrap_or_default(),
        _ => DEFAULT_METHOD.to_string(),
    };

    let path = paths.join(PATH_SEPARATOR);

    Endpoint {
        paths,
        path,
        method,
    }
}
