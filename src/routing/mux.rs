//! Pattern multiplexer used by the path router.
//!
//! Resolves a request's host and path to one registered pattern string.
//! The multiplexer only knows patterns; the caller owns what they bind to.
//!
//! # Design Decisions
//! - Patterns without a trailing slash match one path exactly
//! - Patterns with a trailing slash match their whole subtree; the longest
//!   registered subtree wins
//! - Host-qualified patterns (`example.com/api/`) are tried before
//!   host-less ones
//! - `/tree` redirects to `/tree/` when only the subtree form is registered
//! - Lookups use the percent-decoded path; redirects keep the path as sent

use std::collections::HashSet;

use axum::http::{header, Request};
use percent_encoding::percent_decode_str;

use crate::error::BuildError;

/// Outcome of resolving a request against the registered patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// The winning pattern, as registered.
    Matched(&'a str),
    /// Permanent redirect to this location.
    Redirect(String),
    NotFound,
}

#[derive(Debug, Default)]
pub struct PathMux {
    exact: HashSet<String>,
    /// Subtree patterns, longest first.
    subtrees: Vec<String>,
    has_hosts: bool,
}

impl PathMux {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern`. Registering an existing pattern again is a no-op
    /// here; the caller replaces the binding.
    pub fn register(&mut self, pattern: &str) -> Result<(), BuildError> {
        if pattern.is_empty() || !pattern.contains('/') {
            return Err(BuildError::InvalidPattern(pattern.to_string()));
        }
        if !self.exact.insert(pattern.to_string()) {
            return Ok(());
        }
        if pattern.ends_with('/') {
            let at = self
                .subtrees
                .iter()
                .position(|existing| existing.len() < pattern.len())
                .unwrap_or(self.subtrees.len());
            self.subtrees.insert(at, pattern.to_string());
        }
        if !pattern.starts_with('/') {
            self.has_hosts = true;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn resolve<B>(&self, req: &Request<B>) -> Resolution<'_> {
        let host = request_host(req);
        let raw = req.uri().path();
        let path = percent_decode_str(raw).decode_utf8_lossy();

        if self.needs_trailing_slash(&host, &path) {
            let location = match req.uri().query() {
                Some(query) => format!("{raw}/?{query}"),
                None => format!("{raw}/"),
            };
            return Resolution::Redirect(location);
        }

        match self.lookup(&host, &path) {
            Some(pattern) => Resolution::Matched(pattern),
            None => Resolution::NotFound,
        }
    }

    fn lookup(&self, host: &str, path: &str) -> Option<&str> {
        if self.has_hosts && !host.is_empty() {
            if let Some(pattern) = self.match_path(&format!("{host}{path}")) {
                return Some(pattern);
            }
        }
        self.match_path(path)
    }

    fn match_path(&self, path: &str) -> Option<&str> {
        if let Some(pattern) = self.exact.get(path) {
            return Some(pattern.as_str());
        }
        self.subtrees
            .iter()
            .find(|pattern| path.starts_with(pattern.as_str()))
            .map(String::as_str)
    }

    /// True when only the subtree form of `path` is registered.
    fn needs_trailing_slash(&self, host: &str, path: &str) -> bool {
        if path.ends_with('/') {
            return false;
        }
        let mut candidates = vec![path.to_string()];
        if self.has_hosts && !host.is_empty() {
            candidates.insert(0, format!("{host}{path}"));
        }
        if candidates.iter().any(|c| self.exact.contains(c)) {
            return false;
        }
        candidates
            .iter()
            .any(|c| self.exact.contains(&format!("{c}/")))
    }
}

/// Host without port, from the URI authority or the `Host` header.
fn request_host<B>(req: &Request<B>) -> String {
    let raw = req
        .uri()
        .authority()
        .map(|a| a.as_str().to_string())
        .or_else(|| {
            req.headers()
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();
    strip_port(&raw).to_ascii_lowercase()
}

fn strip_port(host: &str) -> &str {
    // Bracketed IPv6 literal.
    if let Some(end) = host.find(']') {
        return &host[..=end];
    }
    match host.rsplit_once(':') {
        Some((name, _)) => name,
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mux(patterns: &[&str]) -> PathMux {
        let mut mux = PathMux::new();
        for pattern in patterns {
            mux.register(pattern).unwrap();
        }
        mux
    }

    fn get(uri: &str) -> Request<()> {
        Request::builder().uri(uri).body(()).unwrap()
    }

    fn with_host(uri: &str, host: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .body(())
            .unwrap()
    }

    #[test]
    fn test_exact_pattern_matches_only_itself() {
        let mux = mux(&["/capture"]);
        assert_eq!(mux.resolve(&get("/capture")), Resolution::Matched("/capture"));
        assert_eq!(mux.resolve(&get("/capture/more")), Resolution::NotFound);
        assert_eq!(mux.resolve(&get("/")), Resolution::NotFound);
    }

    #[test]
    fn test_subtree_pattern_matches_descendants() {
        let mux = mux(&["/api/"]);
        assert_eq!(mux.resolve(&get("/api/")), Resolution::Matched("/api/"));
        assert_eq!(mux.resolve(&get("/api/v1/users")), Resolution::Matched("/api/"));
        assert_eq!(mux.resolve(&get("/apis")), Resolution::NotFound);
    }

    #[test]
    fn test_root_catches_everything() {
        let mux = mux(&["/", "/capture"]);
        assert_eq!(mux.resolve(&get("/capture")), Resolution::Matched("/capture"));
        assert_eq!(mux.resolve(&get("/anything/else")), Resolution::Matched("/"));
    }

    #[test]
    fn test_longest_subtree_wins() {
        let mux = mux(&["/", "/api/", "/api/v2/"]);
        assert_eq!(mux.resolve(&get("/api/v2/items")), Resolution::Matched("/api/v2/"));
        assert_eq!(mux.resolve(&get("/api/v1/items")), Resolution::Matched("/api/"));
        assert_eq!(mux.resolve(&get("/web")), Resolution::Matched("/"));
    }

    #[test]
    fn test_registration_order_does_not_matter() {
        let forward = mux(&["/a/", "/a/b/"]);
        let reverse = mux(&["/a/b/", "/a/"]);
        for path in ["/a/x", "/a/b/x"] {
            assert_eq!(forward.resolve(&get(path)), reverse.resolve(&get(path)));
        }
    }

    #[test]
    fn test_redirects_to_subtree() {
        let mux = mux(&["/tree/"]);
        assert_eq!(
            mux.resolve(&get("/tree")),
            Resolution::Redirect("/tree/".to_string())
        );
        assert_eq!(
            mux.resolve(&get("/tree?x=1")),
            Resolution::Redirect("/tree/?x=1".to_string())
        );
    }

    #[test]
    fn test_lookup_uses_decoded_path() {
        let mux = mux(&["/café", "/docs/a b/"]);
        assert_eq!(mux.resolve(&get("/caf%C3%A9")), Resolution::Matched("/café"));
        assert_eq!(
            mux.resolve(&get("/docs/a%20b/intro")),
            Resolution::Matched("/docs/a b/")
        );
        assert_eq!(
            mux.resolve(&get("/docs/a%20b")),
            Resolution::Redirect("/docs/a%20b/".to_string())
        );
    }

    #[test]
    fn test_exact_registration_suppresses_redirect() {
        let mux = mux(&["/tree/", "/tree"]);
        assert_eq!(mux.resolve(&get("/tree")), Resolution::Matched("/tree"));
    }

    #[test]
    fn test_host_patterns_take_precedence() {
        let mux = mux(&["/api/", "internal.example.com/api/"]);
        assert_eq!(
            mux.resolve(&with_host("/api/x", "internal.example.com:8080")),
            Resolution::Matched("internal.example.com/api/")
        );
        assert_eq!(
            mux.resolve(&with_host("/api/x", "public.example.com")),
            Resolution::Matched("/api/")
        );
        assert_eq!(mux.resolve(&get("/api/x")), Resolution::Matched("/api/"));
    }

    #[test]
    fn test_rejects_invalid_patterns() {
        let mut mux = PathMux::new();
        assert!(matches!(mux.register(""), Err(BuildError::InvalidPattern(_))));
        assert!(matches!(
            mux.register("example.com"),
            Err(BuildError::InvalidPattern(_))
        ));
        assert!(mux.is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_idempotent() {
        let mux = mux(&["/a/", "/a/"]);
        assert_eq!(mux.len(), 1);
        assert_eq!(mux.subtrees.len(), 1);
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:80"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
    }
}
