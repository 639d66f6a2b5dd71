//! Request predicates.
//!
//! # Responsibilities
//! - Match method (fixed set of verbs, exact comparison)
//! - Match path template segments, `{name}` segments are wildcards
//! - Match a header or query parameter carrying a given value
//! - Combine the above with AND semantics
//!
//! # Design Decisions
//! - Predicates are pure and hold only their matching criteria
//! - Path templates match as a prefix: extra request segments are ignored
//! - Request paths are percent-decoded before they are split
//! - Header and query checks are "any value equals", not "all values equal"
//! - Absent parts of a composite predicate always match

use axum::body::Body;
use axum::http::{HeaderName, Method, Request};
use percent_encoding::percent_decode_str;

use crate::error::BuildError;

/// Trait for matching requests against conditions.
pub trait Predicate: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request<Body>) -> bool;
}

const ALLOWED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
];

/// Matches the request method exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodPredicate {
    method: Method,
}

impl MethodPredicate {
    pub fn new(method: &str) -> Result<Self, BuildError> {
        ALLOWED_METHODS
            .iter()
            .find(|allowed| allowed.as_str() == method)
            .map(|allowed| Self {
                method: allowed.clone(),
            })
            .ok_or_else(|| BuildError::InvalidMethod(method.to_string()))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

impl Predicate for MethodPredicate {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.method() == self.method
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Wildcard,
}

/// Matches leading path segments against a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPredicate {
    segments: Vec<Segment>,
}

impl PathPredicate {
    /// Parse a template such as `/users/{id}/posts`.
    ///
    /// `/a/b/`, `/a/b` and `a/b` are equivalent; `""` and `"/"` match everything.
    pub fn new(template: &str) -> Self {
        let segments = split_segments(template)
            .map(|part| {
                if part.starts_with('{') && part.ends_with('}') && part.len() >= 2 {
                    Segment::Wildcard
                } else {
                    Segment::Literal(part.to_string())
                }
            })
            .collect();
        Self { segments }
    }
}

impl Predicate for PathPredicate {
    fn matches(&self, req: &Request<Body>) -> bool {
        let path = percent_decode_str(req.uri().path()).decode_utf8_lossy();
        let mut request_segments = split_segments(&path);
        for segment in &self.segments {
            let Some(actual) = request_segments.next() else {
                return false;
            };
            if let Segment::Literal(expected) = segment {
                if expected != actual {
                    return false;
                }
            }
        }
        true
    }
}

/// Split on `/`, dropping one leading and one trailing empty segment.
fn split_segments(path: &str) -> impl Iterator<Item = &str> {
    let trimmed = if path == "/" { "" } else { path };
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);
    let mut parts = trimmed.split('/');
    if trimmed.is_empty() {
        // `"".split('/')` yields one empty item; an empty path has no segments.
        parts.next();
    }
    parts
}

/// Matches when a header carries the given value among its values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPredicate {
    name: HeaderName,
    value: String,
}

impl HeaderPredicate {
    pub fn new(name: &str, value: impl Into<String>) -> Result<Self, BuildError> {
        if name.is_empty() {
            return Err(BuildError::EmptyName("header"));
        }
        let name = HeaderName::try_from(name)
            .map_err(|_| BuildError::InvalidHeaderName(name.to_string()))?;
        Ok(Self {
            name,
            value: value.into(),
        })
    }
}

impl Predicate for HeaderPredicate {
    fn matches(&self, req: &Request<Body>) -> bool {
        req.headers()
            .get_all(&self.name)
            .iter()
            .any(|v| v.as_bytes() == self.value.as_bytes())
    }
}

/// Matches when a decoded query parameter carries the given value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPredicate {
    name: String,
    value: String,
}

impl QueryPredicate {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Result<Self, BuildError> {
        let name = name.into();
        if name.is_empty() {
            return Err(BuildError::EmptyName("query"));
        }
        Ok(Self {
            name,
            value: value.into(),
        })
    }
}

impl Predicate for QueryPredicate {
    fn matches(&self, req: &Request<Body>) -> bool {
        let Some(query) = req.uri().query() else {
            return false;
        };
        url::form_urlencoded::parse(query.as_bytes())
            .any(|(name, value)| name == self.name.as_str() && value == self.value.as_str())
    }
}

/// AND of up to one predicate of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestPredicate {
    pub method: Option<MethodPredicate>,
    pub path: Option<PathPredicate>,
    pub header: Option<HeaderPredicate>,
    pub query: Option<QueryPredicate>,
}

impl RequestPredicate {
    /// A predicate that matches every request.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: MethodPredicate) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: PathPredicate) -> Self {
        self.path = Some(path);
        self
    }

    pub fn header(mut self, header: HeaderPredicate) -> Self {
        self.header = Some(header);
        self
    }

    pub fn query(mut self, query: QueryPredicate) -> Self {
        self.query = Some(query);
        self
    }
}

impl Predicate for RequestPredicate {
    fn matches(&self, req: &Request<Body>) -> bool {
        self.method.as_ref().is_none_or(|p| p.matches(req))
            && self.path.as_ref().is_none_or(|p| p.matches(req))
            && self.header.as_ref().is_none_or(|p| p.matches(req))
            && self.query.as_ref().is_none_or(|p| p.matches(req))
    }
}
