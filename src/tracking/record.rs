//! The per-request tracking record and its shared handle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use http::HeaderMap;
use tracing::{Span, debug, warn};

use crate::error::Error;

/// Reported by [`Tracking::endpoint_pattern`] when no route matched.
pub const NOT_FOUND_PATTERN: &str = "404 Not Found";

/// Reported by [`Tracking::endpoint_pattern`] when the connection left HTTP
/// semantics before a route matched.
pub const UPGRADED_PATTERN: &str = "Upgraded Connection";

// ── Tracking ──────────────────────────────────────────────────────────────────

/// Observable facts about one request's lifecycle.
///
/// Never constructed directly: it lives behind a [`Tracker`] and is read
/// through [`Tracker::read`].
#[derive(Debug)]
pub struct Tracking {
    started_at: Option<Instant>,
    span: Span,

    latency_secs: f64,
    response_size: u64,
    response_status: u16,
    response_headers: HeaderMap,
    write_errors: Vec<Error>,
    endpoint_pattern: String,
    hijacked: bool,
    hijacked_error: Option<Error>,
}

impl Tracking {
    fn new(span: Span) -> Self {
        Self {
            started_at: None,
            span,
            latency_secs: 0.0,
            response_size: 0,
            response_status: 200,
            response_headers: HeaderMap::new(),
            write_errors: Vec::new(),
            endpoint_pattern: String::new(),
            hijacked: false,
            hijacked_error: None,
        }
    }

    /// The route template that matched, or a fallback label.
    ///
    /// Evaluated on every call so a late hijack is still reflected:
    /// the matched pattern wins, then [`UPGRADED_PATTERN`] for a hijacked
    /// connection, then [`NOT_FOUND_PATTERN`].
    pub fn endpoint_pattern(&self) -> &str {
        if !self.endpoint_pattern.is_empty() {
            self.endpoint_pattern.as_str()
        } else if self.hijacked {
            UPGRADED_PATTERN
        } else {
            NOT_FOUND_PATTERN
        }
    }

    pub fn span(&self) -> &Span { &self.span }
    pub fn started_at(&self) -> Option<Instant> { self.started_at }

    /// Seconds between [`Tracker::start`] and [`Tracker::finish`].
    pub fn latency_secs(&self) -> f64 { self.latency_secs }

    pub fn response_size(&self) -> u64 { self.response_size }
    pub fn response_status(&self) -> u16 { self.response_status }
    pub fn response_headers(&self) -> &HeaderMap { &self.response_headers }
    pub fn write_errors(&self) -> &[Error] { &self.write_errors }

    /// When set, status and size carry no HTTP meaning.
    pub fn is_hijacked(&self) -> bool { self.hijacked }
    pub fn hijacked_error(&self) -> Option<&Error> { self.hijacked_error.as_ref() }
}

// ── Tracker ───────────────────────────────────────────────────────────────────

/// Shared handle to one request's [`Tracking`] record.
///
/// Cloning the handle shares the record: a mutation through one clone is
/// visible through every other. One record is created per request by the
/// instrumentation layer and dropped with the request.
///
/// Each field has a single writer (the creator for timing, the router for the
/// endpoint pattern, the response writer for response fields), so the lock is
/// never contended; it exists to keep the handle `Send + Sync` for hyper's
/// futures.
#[derive(Clone, Debug)]
pub struct Tracker(Arc<Mutex<Tracking>>);

impl Tracker {
    /// A fresh record: status 200, no span, everything else empty.
    pub fn new() -> Self {
        Self::with_span(Span::none())
    }

    /// A fresh record whose trace context is `span`.
    pub fn with_span(span: Span) -> Self {
        Self(Arc::new(Mutex::new(Tracking::new(span))))
    }

    /// Sets the latency baseline to now. A second call moves the baseline.
    pub fn start(&self) {
        self.lock().started_at = Some(Instant::now());
    }

    /// Stores the elapsed time since [`start`](Tracker::start) as latency.
    ///
    /// Without a prior `start` the latency stays at zero.
    pub fn finish(&self) {
        let mut t = self.lock();
        let started_at = t.started_at;
        match started_at {
            Some(started_at) => t.latency_secs = started_at.elapsed().as_secs_f64(),
            None => warn!("tracker finished without being started"),
        }
    }

    /// See [`Tracking::endpoint_pattern`].
    pub fn endpoint_pattern(&self) -> String {
        self.lock().endpoint_pattern().to_owned()
    }

    /// Records the matched route template. Only the last value is observable.
    pub fn set_endpoint_pattern(&self, pattern: impl Into<String>) {
        let pattern = pattern.into();
        let mut t = self.lock();
        if !t.endpoint_pattern.is_empty() {
            debug!(previous = %t.endpoint_pattern, %pattern, "endpoint pattern overwritten");
        }
        t.endpoint_pattern = pattern;
    }

    pub fn set_response_status(&self, status: u16) {
        self.lock().response_status = status;
    }

    pub fn set_response_size(&self, size: u64) {
        self.lock().response_size = size;
    }

    pub fn set_response_headers(&self, headers: HeaderMap) {
        self.lock().response_headers = headers;
    }

    pub fn push_write_error(&self, err: Error) {
        self.lock().write_errors.push(err);
    }

    /// Marks the connection as taken over by another protocol.
    pub fn hijack(&self, err: Option<Error>) {
        let mut t = self.lock();
        t.hijacked = true;
        t.hijacked_error = err;
    }

    /// Runs `f` against a consistent view of every field.
    pub fn read<R>(&self, f: impl FnOnce(&Tracking) -> R) -> R {
        f(&*self.lock())
    }

    /// `true` when both handles point at the same record.
    pub fn ptr_eq(&self, other: &Tracker) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn lock(&self) -> MutexGuard<'_, Tracking> {
        // Every write is a plain field store, so a panic elsewhere cannot
        // leave the record half-updated.
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Tracker {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn new_record_defaults() {
        let tracker = Tracker::new();
        tracker.read(|t| {
            assert_eq!(t.response_status(), 200);
            assert_eq!(t.response_size(), 0);
            assert!(t.response_headers().is_empty());
            assert!(t.write_errors().is_empty());
            assert!(!t.is_hijacked());
            assert!(t.hijacked_error().is_none());
            assert!(t.started_at().is_none());
            assert_eq!(t.latency_secs(), 0.0);
        });
        assert_eq!(tracker.endpoint_pattern(), NOT_FOUND_PATTERN);
    }

    #[test]
    fn matched_pattern_wins_over_hijack() {
        let tracker = Tracker::new();
        tracker.set_endpoint_pattern("GET /users/:id");
        assert_eq!(tracker.endpoint_pattern(), "GET /users/:id");

        tracker.hijack(None);
        assert_eq!(tracker.endpoint_pattern(), "GET /users/:id");
    }

    #[test]
    fn hijack_without_pattern_reports_upgrade() {
        let tracker = Tracker::new();
        tracker.hijack(Some(Error::NotUpgradable));
        assert_eq!(tracker.endpoint_pattern(), UPGRADED_PATTERN);
        tracker.read(|t| {
            assert!(t.is_hijacked());
            assert!(matches!(t.hijacked_error(), Some(Error::NotUpgradable)));
        });
    }

    #[test]
    fn empty_pattern_falls_back() {
        let tracker = Tracker::new();
        tracker.set_endpoint_pattern("");
        assert_eq!(tracker.endpoint_pattern(), NOT_FOUND_PATTERN);
    }

    #[test]
    fn last_pattern_wins() {
        let tracker = Tracker::new();
        tracker.set_endpoint_pattern("GET /a");
        tracker.set_endpoint_pattern("GET /b");
        assert_eq!(tracker.endpoint_pattern(), "GET /b");
    }

    #[test]
    fn latency_measures_delay() {
        let tracker = Tracker::new();
        tracker.start();
        std::thread::sleep(Duration::from_millis(50));
        tracker.finish();

        let latency = tracker.read(Tracking::latency_secs);
        assert!(latency >= 0.05, "latency {latency} shorter than the delay");
        assert!(latency < 1.0, "latency {latency} far beyond the delay");
    }

    #[test]
    fn immediate_finish_is_non_negative() {
        let tracker = Tracker::new();
        tracker.start();
        tracker.finish();
        assert!(tracker.read(Tracking::latency_secs) >= 0.0);
    }

    #[test]
    fn finish_without_start_leaves_zero_latency() {
        let tracker = Tracker::new();
        tracker.finish();
        assert_eq!(tracker.read(Tracking::latency_secs), 0.0);
    }

    #[test]
    fn write_errors_accumulate_in_order() {
        let tracker = Tracker::new();
        tracker.push_write_error(Error::InvalidHeaderName("a b".into()));
        tracker.push_write_error(Error::InvalidHeaderValue("x-id".into()));
        tracker.read(|t| {
            let errs = t.write_errors();
            assert_eq!(errs.len(), 2);
            assert!(matches!(errs[0], Error::InvalidHeaderName(_)));
            assert!(matches!(errs[1], Error::InvalidHeaderValue(_)));
        });
    }

    #[test]
    fn clones_share_the_record() {
        let tracker = Tracker::new();
        let other = tracker.clone();
        other.set_response_status(503);
        other.set_response_size(12);

        assert!(tracker.ptr_eq(&other));
        assert!(!tracker.ptr_eq(&Tracker::new()));
        tracker.read(|t| {
            assert_eq!(t.response_status(), 503);
            assert_eq!(t.response_size(), 12);
        });
    }
}
