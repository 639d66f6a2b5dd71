//! Terminal handlers that never delegate.

use std::collections::BTreeMap;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderValue, Request, StatusCode};
use serde::Serialize;

use super::{http_error, read_body, Handler, ResponseSink};

/// Responds 200 with a fixed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticHandler {
    message: String,
}

impl StaticHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Handler for StaticHandler {
    async fn serve(&self, _request: Request<Body>, sink: &mut dyn ResponseSink) {
        sink.set_status(StatusCode::OK);
        sink.write(self.message.as_bytes());
    }
}

/// Responds 404 with a fixed body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotFoundHandler;

#[async_trait]
impl Handler for NotFoundHandler {
    async fn serve(&self, _request: Request<Body>, sink: &mut dyn ResponseSink) {
        sink.set_status(StatusCode::NOT_FOUND);
        sink.write(b"Not found");
    }
}

/// Reflects the request back in HTTP/1.x wire form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EchoHandler;

#[async_trait]
impl Handler for EchoHandler {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let (parts, body) = request.into_parts();
        let body = match read_body(body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read request body");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
                return;
            }
        };

        let target = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");

        let mut wire = Vec::with_capacity(256 + body.len());
        wire.extend_from_slice(
            format!("{} {} {:?}\r\n", parts.method, target, parts.version).as_bytes(),
        );

        let host = parts
            .uri
            .authority()
            .map(|a| a.as_str().as_bytes())
            .or_else(|| parts.headers.get(header::HOST).map(HeaderValue::as_bytes));
        if let Some(host) = host {
            wire.extend_from_slice(b"host: ");
            wire.extend_from_slice(host);
            wire.extend_from_slice(b"\r\n");
        }

        for (name, value) in parts.headers.iter() {
            if name == header::HOST {
                continue;
            }
            wire.extend_from_slice(name.as_str().as_bytes());
            wire.extend_from_slice(b": ");
            wire.extend_from_slice(value.as_bytes());
            wire.extend_from_slice(b"\r\n");
        }
        wire.extend_from_slice(b"\r\n");
        wire.extend_from_slice(&body);

        sink.set_status(StatusCode::OK);
        sink.write(&wire);
    }
}

/// Describes the request as a JSON document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebugHandler;

#[derive(Serialize)]
struct DebugDocument<'a> {
    method: &'a str,
    url: String,
    headers: BTreeMap<&'a str, Vec<String>>,
    body: String,
}

#[async_trait]
impl Handler for DebugHandler {
    async fn serve(&self, request: Request<Body>, sink: &mut dyn ResponseSink) {
        let (parts, body) = request.into_parts();
        let body = match read_body(body).await {
            Ok(bytes) => bytes,
            Err(e) => {
                // Nothing is written; the transport decides what the client sees.
                tracing::error!(error = %e, "Failed to read request body");
                return;
            }
        };

        let mut headers: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (name, value) in parts.headers.iter() {
            // Host is part of the request line, not the header set.
            if name == header::HOST {
                continue;
            }
            headers
                .entry(name.as_str())
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        let document = DebugDocument {
            method: parts.method.as_str(),
            url: parts.uri.to_string(),
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        };

        match serde_json::to_vec(&document) {
            Ok(mut encoded) => {
                encoded.push(b'\n');
                sink.headers_mut().insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("application/json"),
                );
                sink.set_status(StatusCode::OK);
                sink.write(&encoded);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode debug response");
                http_error(sink, StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
            }
        }
    }
}
