//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router whose only route is the gateway's root handler
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Run the root handler against a streaming sink and answer as soon as the
//!   response head is committed
//! - Record request metrics
//! - Serve until shutdown, then drain for a bounded grace period

use std::convert::Infallible;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::future::{self, BoxFuture, Either};
use futures_util::{stream, StreamExt};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use super::sink::StreamingResponse;
use crate::handler::Handler;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub root: Arc<dyn Handler>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server that sends every request to `root`.
    pub fn new(config: GatewayConfig, root: Box<dyn Handler>) -> Self {
        let state = AppState {
            root: Arc::from(root),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )));

        Router::new()
            .fallback(dispatch)
            .with_state(state)
            .layer(middleware)
    }

    /// The fully layered router, for serving on a custom transport.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then let in-flight requests
    /// finish for up to the configured grace period.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let stop = shutdown.signalled();
        let grace_period = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let grace = shutdown.grace_elapsed(grace_period);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                stop.await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .into_future();

        tokio::select! {
            result = serve => result?,
            _ = grace => {
                tracing::warn!(grace_period = ?grace_period, "Grace period elapsed, forcing shutdown");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Run the root handler and answer once it commits a response head.
///
/// Whatever the handler still has to do after that keeps running inside the
/// response body, so dropping the body (client gone) cancels it.
async fn dispatch(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (mut sink, head, chunks) = StreamingResponse::channel();
    let root = state.root.clone();
    let serve: BoxFuture<'static, ()> = Box::pin(async move {
        root.serve(request, &mut sink).await;
        sink.finish().await;
    });

    let (head, remaining) = match future::select(serve, head).await {
        Either::Left(((), head)) => (head.await, None),
        Either::Right((head, serve)) => (head, Some(serve)),
    };
    let Ok((status, headers)) = head else {
        tracing::error!(method = %method, path = %path, "Handler dropped the response");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    metrics::record_request(method.as_str(), status.as_u16(), start);
    tracing::debug!(
        peer = ?peer,
        method = %method,
        path = %path,
        status = status.as_u16(),
        elapsed = ?start.elapsed(),
        "Request served"
    );

    let chunks = stream::unfold(chunks, |mut rx| async move {
        rx.recv()
            .await
            .map(|chunk| (Ok::<Bytes, Infallible>(chunk), rx))
    });
    let body = match remaining {
        None => Body::from_stream(chunks),
        Some(serve) => {
            let driver = stream::once(serve)
                .filter_map(|()| future::ready(None::<Result<Bytes, Infallible>>));
            Body::from_stream(stream::select(chunks, driver))
        }
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}
