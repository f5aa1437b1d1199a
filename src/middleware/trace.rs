//! Request tracking and export.
//!
//! [`instrument`] creates the request's [`Tracker`], attaches it, runs the
//! inner pipeline inside the tracker's span, then finishes and [`export`]s it.
//! A request dropped mid-flight (client disconnect, timeout) is still
//! finished and exported, with whatever response fields were recorded.
//!
//! # What gets exported
//!
//! Span `http.request` fields:
//!
//! | Field | When |
//! |---|---|
//! | `http.method`, `http.path` | always, at creation |
//! | `http.route`, `http.latency_s` | always |
//! | `http.status_code`, `http.response_size` | normal responses |
//! | `http.hijacked` | upgraded connections |
//!
//! The `request finished` event carries `endpoint`, `status`, `latency_s`,
//! and `response_headers`.
//!
//! Metrics, through whatever [`metrics`] recorder the application installed:
//!
//! - `http_server_requests_total{endpoint, status}`: counter; `status` is
//!   `"hijacked"` for upgraded connections
//! - `http_server_request_duration_seconds{endpoint}`: histogram

use std::future::Future;

use bytes::Bytes;
use http_body_util::Full;
use tracing::field::Empty;
use tracing::{Instrument, info, info_span, warn};

use crate::tracking::{self, Tracker};

pub const REQUESTS_TOTAL: &str = "http_server_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "http_server_request_duration_seconds";

/// Runs `inner` with a fresh tracker attached to `req`.
///
/// The tracker is finished and exported exactly once: when `inner`
/// resolves, or when the returned future is dropped before that.
pub async fn instrument<B, F, Fut>(req: http::Request<B>, inner: F) -> http::Response<Full<Bytes>>
where
    F: FnOnce(http::Request<B>) -> Fut,
    Fut: Future<Output = http::Response<Full<Bytes>>>,
{
    let span = info_span!(
        "http.request",
        http.method = %req.method(),
        http.path = %req.uri().path(),
        http.route = Empty,
        http.status_code = Empty,
        http.response_size = Empty,
        http.latency_s = Empty,
        http.hijacked = Empty,
    );

    let tracker = Tracker::with_span(span.clone());
    tracker.start();

    let guard = ExportOnDrop(tracker.clone());
    let res = inner(tracking::attach(req, tracker))
        .instrument(span)
        .await;

    drop(guard);
    res
}

/// Finishes and exports its tracker when dropped.
struct ExportOnDrop(Tracker);

impl Drop for ExportOnDrop {
    fn drop(&mut self) {
        self.0.finish();
        export(&self.0);
    }
}

/// Publishes a finished tracker to its span, the log, and metrics.
///
/// A hijacked request reports no status code or size: after the upgrade
/// those describe nothing.
pub fn export(tracker: &Tracker) {
    tracker.read(|t| {
        let span = t.span();
        let endpoint = t.endpoint_pattern();
        let latency_s = t.latency_secs();

        span.record("http.route", endpoint);
        span.record("http.latency_s", latency_s);

        let status = if t.is_hijacked() {
            span.record("http.hijacked", true);
            if let Some(err) = t.hijacked_error() {
                warn!(parent: span, "connection upgrade failed: {err}");
            }
            "hijacked".to_owned()
        } else {
            span.record("http.status_code", t.response_status());
            span.record("http.response_size", t.response_size());
            t.response_status().to_string()
        };

        for err in t.write_errors() {
            warn!(parent: span, "response write error: {err}");
        }

        info!(
            parent: span,
            endpoint,
            %status,
            latency_s,
            response_headers = ?t.response_headers(),
            "request finished",
        );

        metrics::counter!(REQUESTS_TOTAL, "endpoint" => endpoint.to_owned(), "status" => status)
            .increment(1);
        metrics::histogram!(REQUEST_DURATION_SECONDS, "endpoint" => endpoint.to_owned())
            .record(latency_s);
    });
}
