//! Attaching a [`Tracker`] to a request and finding it again.
//!
//! The record travels in the request's [`http::Extensions`], so layers that
//! only see the request (router, response writer, hijack path, handlers) can
//! reach it without the instrumentation layer threading it through their
//! signatures. Extensions are keyed by type; the key here is a private
//! newtype, so no other code can overwrite, forge, or shadow the entry.

use http::Extensions;

use super::record::Tracker;

#[derive(Clone)]
struct TrackingKey(Tracker);

/// Returns `req` carrying `tracker`.
pub fn attach<B>(mut req: http::Request<B>, tracker: Tracker) -> http::Request<B> {
    attach_extensions(req.extensions_mut(), tracker);
    req
}

/// Stores `tracker` in `extensions`, replacing any earlier one.
pub fn attach_extensions(extensions: &mut Extensions, tracker: Tracker) {
    extensions.insert(TrackingKey(tracker));
}

/// The tracker attached to this request, if any.
///
/// `None` is the normal answer outside an instrumented request: tracking
/// disabled, tests, background tasks.
pub fn lookup(extensions: &Extensions) -> Option<Tracker> {
    extensions.get::<TrackingKey>().map(|key| key.0.clone())
}

/// Records the matched route on the attached tracker. No-op without one.
pub fn set_endpoint_pattern(extensions: &Extensions, pattern: impl Into<String>) {
    if let Some(tracker) = lookup(extensions) {
        tracker.set_endpoint_pattern(pattern);
    }
}
