//! Handler tree and router construction.
//!
//! Descriptors are built depth-first: a decorator's children exist before
//! the decorator does. Errors carry the path of descriptors that led to them.

use std::sync::Arc;
use std::time::Duration;

use crate::config::schema::{GatewayConfig, HandlerConfig, MatcherConfig, RouterKind};
use crate::error::BuildError;
use crate::handler::fanout::strategy_by_name;
use crate::handler::{
    ChaosHandler, DebugHandler, EchoHandler, FanOutHandler, ForwardHandler, Handler,
    NotFoundHandler, RetrierHandler, SeededRandom, StaticHandler,
};
use crate::resilience::policy_by_name;
use crate::routing::{
    HeaderPredicate, MethodPredicate, PathPredicate, PathRouter, PredicateRouter, QueryPredicate,
    RequestPredicate,
};

impl HandlerConfig {
    pub fn build_handler(&self) -> Result<Box<dyn Handler>, BuildError> {
        let handler: Box<dyn Handler> = match self {
            HandlerConfig::Static { message } => Box::new(StaticHandler::new(message.clone())),
            HandlerConfig::Debug {} => Box::new(DebugHandler),
            HandlerConfig::Echo {} => Box::new(EchoHandler),
            HandlerConfig::NotFound {} => Box::new(NotFoundHandler),
            HandlerConfig::Forward { url, timeout_secs } => {
                let mut forward = ForwardHandler::new(url)?;
                if let Some(secs) = timeout_secs {
                    forward = forward.with_timeout(Duration::from_secs(*secs));
                }
                Box::new(forward)
            }
            HandlerConfig::Chaos {
                handler,
                failure_chance,
                seed,
            } => {
                let inner = handler
                    .build_handler()
                    .map_err(|e| e.nested("wrapped handler for chaos"))?;
                let chaos = match seed {
                    Some(seed) => ChaosHandler::with_source(
                        inner,
                        *failure_chance,
                        Arc::new(SeededRandom::new(*seed)),
                    )?,
                    None => ChaosHandler::new(inner, *failure_chance)?,
                };
                Box::new(chaos)
            }
            HandlerConfig::Fanout {
                handlers,
                response_strategy,
            } => {
                let children = handlers
                    .iter()
                    .enumerate()
                    .map(|(i, child)| {
                        child
                            .build_handler()
                            .map_err(|e| e.nested(format!("handler {i} for fanout")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let strategy = strategy_by_name(response_strategy)?;
                Box::new(FanOutHandler::new(children, strategy)?)
            }
            HandlerConfig::Retrier {
                handler,
                retry_policy,
                retries,
                base_delay_ms,
                max_delay_ms,
            } => {
                let policy = policy_by_name(retry_policy)?;
                let inner = handler
                    .build_handler()
                    .map_err(|e| e.nested("handler for retrier"))?;
                Box::new(
                    RetrierHandler::new(inner, policy, *retries)
                        .with_backoff(*base_delay_ms, *max_delay_ms),
                )
            }
        };
        Ok(handler)
    }
}

impl MatcherConfig {
    /// Compose the configured criteria into one predicate.
    pub fn build_predicate(&self) -> Result<RequestPredicate, BuildError> {
        let mut predicate = RequestPredicate::any();
        if let Some(method) = &self.method {
            predicate = predicate.method(MethodPredicate::new(method)?);
        }
        if let Some(path) = &self.path {
            predicate = predicate.path(PathPredicate::new(path));
        }
        if let Some(header) = &self.header {
            predicate = predicate.header(HeaderPredicate::new(&header.name, header.value.clone())?);
        }
        if let Some(query) = &self.query {
            predicate =
                predicate.query(QueryPredicate::new(query.name.clone(), query.value.clone())?);
        }
        Ok(predicate)
    }
}

impl GatewayConfig {
    /// Build the root handler: a router with one binding per route.
    pub fn build_router(&self) -> Result<Box<dyn Handler>, BuildError> {
        match self.router {
            RouterKind::Path => self.build_path_router().map(|r| Box::new(r) as Box<dyn Handler>),
            RouterKind::Predicate => self
                .build_predicate_router()
                .map(|r| Box::new(r) as Box<dyn Handler>),
        }
    }

    pub fn build_path_router(&self) -> Result<PathRouter, BuildError> {
        let mut router = PathRouter::new();
        for (index, route) in self.routes.iter().enumerate() {
            let pattern = route
                .matcher
                .path
                .clone()
                .ok_or(BuildError::MissingPattern { index })?;
            let handler = route.handler.build_handler().map_err(|e| BuildError::Route {
                route: pattern.clone(),
                source: Box::new(e),
            })?;
            router.add_route(pattern, handler)?;
        }
        tracing::debug!(routes = router.len(), "Path router built");
        Ok(router)
    }

    pub fn build_predicate_router(&self) -> Result<PredicateRouter, BuildError> {
        let mut router = PredicateRouter::new();
        for (index, route) in self.routes.iter().enumerate() {
            let name = || route.matcher.path.clone().unwrap_or_else(|| format!("#{index}"));
            let predicate = route.matcher.build_predicate().map_err(|e| BuildError::Route {
                route: name(),
                source: Box::new(e),
            })?;
            let handler = route.handler.build_handler().map_err(|e| BuildError::Route {
                route: name(),
                source: Box::new(e),
            })?;
            router.add_route(predicate, handler);
        }
        tracing::debug!(routes = router.len(), "Predicate router built");
        Ok(router)
    }
}
