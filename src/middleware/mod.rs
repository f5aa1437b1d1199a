//! Middleware layer.
//!
//! Middleware wraps the routing pipeline and is the place for cross-cutting
//! concerns.
//!
//! Built-in middleware:
//! - [`trace`]: per-request [`Tracker`](crate::tracking::Tracker) exported as
//!   a span, a log event, and request metrics

pub mod trace;
