//! Middleware layer.
//!
//! Middleware wraps a [`Handler`](crate::Handler) and is the right place for
//! cross-cutting concerns: structured access logs, metrics, request-id
//! injection, and authentication-header inspection.
//!
//! A middleware here is just a decorator: it implements `Handler` itself,
//! hands the inner handler a [`ResponseWriter`](crate::ResponseWriter) of its
//! own, and forwards everything to the real one.
//!
//! Built-in middleware:
//! - [`Logging`]: one structured `tracing` event per request with method,
//!   target, status, size, and latency

pub mod logging;

pub use logging::{Logged, Logging};
