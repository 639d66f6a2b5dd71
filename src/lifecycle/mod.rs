//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build router → Metrics → Bind listener → Serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then handlers, then listeners
//! - Shutdown has a grace period: forced exit after the deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{run, StartupError};
