//! Request-scoped tracking.
//!
//! A [`Tracker`] is created for every request by
//! [`middleware::trace`](crate::middleware::trace), attached to the request,
//! and filled in by whoever handles it:
//!
//! ```text
//! middleware::trace   new + start, attach ──┐
//!        ↓                                  │
//! router              set_endpoint_pattern  │  same record,
//! handler             hijack (upgrades)     │  found via lookup
//! response writer     status/size/headers   │
//!        ↓                                  │
//! middleware::trace   finish, export ◄──────┘
//! ```
//!
//! Handlers reach it through [`Request::tracker`](crate::Request::tracker):
//!
//! ```rust
//! use spoor::{Request, Response};
//!
//! async fn handler(req: Request) -> Response {
//!     if let Some(tracker) = req.tracker() {
//!         tracing::debug!(endpoint = %tracker.endpoint_pattern(), "in handler");
//!     }
//!     Response::text("ok")
//! }
//! ```

mod context;
mod record;

pub use context::{attach, attach_extensions, lookup, set_endpoint_pattern};
pub use record::{NOT_FOUND_PATTERN, Tracker, Tracking, UPGRADED_PATTERN};
