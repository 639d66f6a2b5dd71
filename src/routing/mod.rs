//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request
//!     → path_router.rs (pattern table)
//!         → mux.rs (exact / longest subtree / host-qualified resolution)
//!         → bound handler, 301 redirect, or 404
//!     → predicate_router.rs (ordered predicate list)
//!         → predicate.rs (method, path template, header, query; ANDed)
//!         → first matching handler, or nothing written
//! ```
//!
//! # Design Decisions
//! - Routers are handlers themselves, so the transport sees one root handler
//! - Route tables are built at startup and immutable at runtime
//! - No regex in the hot path (segment and prefix comparison only)

pub mod mux;
pub mod path_router;
pub mod predicate;
pub mod predicate_router;

pub use path_router::PathRouter;
pub use predicate::{
    HeaderPredicate, MethodPredicate, PathPredicate, Predicate, QueryPredicate, RequestPredicate,
};
pub use predicate_router::PredicateRouter;
