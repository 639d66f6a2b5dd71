//! Upstream forwarding.
//!
//! # Responsibilities
//! - Buffer the inbound body, then send method, headers and body to a fixed
//!   `http` or `https` target URL
//! - Copy upstream status and end-to-end headers, then stream the upstream
//!   body chunk by chunk
//! - Map failures: local problems → 500, upstream unreachable or slow → 502
//!
//! # Design Decisions
//! - Hop-by-hop headers describe one connection and are dropped both ways
//! - One deadline covers the upstream exchange and the body copy
//! - Dropping the request future (client gone) drops the upstream call
//! - A failure while copying the body is logged; the status already written
//!   stays as is

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderName, Request, StatusCode, Uri};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::{timeout_at, Instant};
use url::Url;

use super::{http_error, read_body, Handler, ResponseSink};
use crate::error::BuildError;
use crate::observability::metrics;

/// Upstream timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Headers that only make sense for a single connection.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "proxy-connection"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

#[derive(Debug)]
pub struct ForwardHandler {
    url: Url,
    target: Uri,
    timeout: Duration,
    client: UpstreamClient,
}

impl ForwardHandler {
    /// Forward to `target`, an absolute URL with a host.
    pub fn new(target: &str) -> Result<Self, BuildError> {
        let invalid = |reason: String| BuildError::InvalidUrl {
            url: target.to_string(),
            reason,
        };

        let url = Url::parse(target).map_err(|e| invalid(e.to_string()))?;
        if !url.has_host() {
            return Err(invalid("missing host".to_string()));
        }
        let uri = url.as_str().parse::<Uri>().map_err(|e| invalid(e.to_string()))?;

        let mut http = HttpConnector::new();
        http.enforce_http(false);
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())
            .map_err(|e| BuildError::Tls(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            url,
            target: uri,
            timeout: DEFAULT_TIMEOUT,
            client,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Copy the upstream body into `sink`, flushing after every chunk.
    async fn relay_body(&self, mut body: Incoming, sink: &mut dyn ResponseSink, deadline: Instant) {
        loop {
            match timeout_at(deadline, body.frame()).await {
                Ok(Some(Ok(frame))) => {
                    if let Ok(data) = frame.into_data() {
                        sink.write(&data);
                        sink.flush().await;
                    }
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::error!(upstream = %self.url, error = %e, "Error copying response");
                    metrics::record_upstream_error("body");
                    break;
                }
                Err(_) => {
                    tracing::error!(upstream = %self.url, "Upstream timed out while copying response");
                    metrics::record_upstream_error("timeout");
                    break;
                }
            }
        }
    }
}

#[async_trait]
impl Handler for ForwardHandler {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let deadline = Instant::now() + self.timeout;
        let (parts, body) = request.into_parts();

        let body = match read_body(body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Error reading body");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        let mut builder = Request::builder()
            .method(parts.method.clone())
            .uri(self.target.clone());
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in parts.headers.iter() {
                // Host comes from the target URI.
                if name == header::HOST || is_hop_by_hop(name) {
                    continue;
                }
                headers.append(name.clone(), value.clone());
            }
        }

        let outbound = match builder.body(Body::from(body)) {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(error = %e, "Error creating request");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        tracing::debug!(
            method = %parts.method,
            upstream = %self.url,
            "Forwarding request"
        );

        let response = match timeout_at(deadline, self.client.request(outbound)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!(upstream = %self.url, error = %e, "Error forwarding request");
                metrics::record_upstream_error("request");
                http_error(sink, StatusCode::BAD_GATEWAY, "Bad Gateway");
                return;
            }
            Err(_) => {
                tracing::warn!(upstream = %self.url, timeout = ?self.timeout, "Upstream timed out");
                metrics::record_upstream_error("timeout");
                http_error(sink, StatusCode::BAD_GATEWAY, "Bad Gateway");
                return;
            }
        };

        let (parts, body) = response.into_parts();
        let headers = sink.headers_mut();
        for (name, value) in parts.headers.iter() {
            if is_hop_by_hop(name) {
                continue;
            }
            headers.append(name.clone(), value.clone());
        }
        sink.set_status(parts.status);

        self.relay_body(body, sink, deadline).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_http_url() {
        let handler = ForwardHandler::new("http://127.0.0.1:9000/api?x=1").unwrap();
        assert_eq!(handler.url().as_str(), "http://127.0.0.1:9000/api?x=1");
        assert_eq!(handler.timeout(), DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_accepts_https_url() {
        let handler = ForwardHandler::new("https://example.com/api").unwrap();
        assert_eq!(handler.url().scheme(), "https");
        assert_eq!(handler.target, "https://example.com/api");
    }

    #[test]
    fn test_rejects_unparsable_url() {
        for target in ["", "not a url", "://missing-scheme", "http://"] {
            let err = ForwardHandler::new(target).unwrap_err();
            assert!(matches!(err, BuildError::InvalidUrl { .. }), "{target}: {err}");
        }
    }

    #[test]
    fn test_rejects_url_without_host() {
        for target in ["mailto:ops@example.com", "unix:/run/upstream.sock"] {
            let err = ForwardHandler::new(target).unwrap_err();
            assert!(matches!(err, BuildError::InvalidUrl { .. }), "{target}: {err}");
        }
    }

    #[test]
    fn test_hop_by_hop_headers() {
        for name in [header::CONNECTION, header::TRANSFER_ENCODING, header::TE, header::UPGRADE] {
            assert!(is_hop_by_hop(&name), "{name}");
        }
        for name in [header::CONTENT_TYPE, header::CONTENT_LENGTH, header::SET_COOKIE] {
            assert!(!is_hop_by_hop(&name), "{name}");
        }
    }

    #[test]
    fn test_with_timeout() {
        let handler = ForwardHandler::new("http://example.com")
            .unwrap()
            .with_timeout(Duration::from_millis(250));
        assert_eq!(handler.timeout(), Duration::from_millis(250));
    }
}
