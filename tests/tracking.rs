use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use spoor::middleware::trace;
use spoor::tracking::{self, NOT_FOUND_PATTERN, Tracker, UPGRADED_PATTERN};

fn ok_response() -> http::Response<Full<Bytes>> {
    http::Response::new(Full::new(Bytes::from_static(b"ok")))
}

#[test]
fn fresh_tracker_is_an_unmatched_200() {
    let tracker = Tracker::new();
    assert_eq!(tracker.read(|t| t.response_status()), 200);
    assert_eq!(tracker.endpoint_pattern(), NOT_FOUND_PATTERN);
}

#[test]
fn endpoint_pattern_follows_late_mutations() {
    let tracker = Tracker::new();
    assert_eq!(tracker.endpoint_pattern(), NOT_FOUND_PATTERN);

    tracker.hijack(None);
    assert_eq!(tracker.endpoint_pattern(), UPGRADED_PATTERN);

    tracker.set_endpoint_pattern("GET /users/:id");
    assert_eq!(tracker.endpoint_pattern(), "GET /users/:id");
}

#[test]
fn attached_tracker_is_shared_not_copied() {
    let tracker = Tracker::new();
    let req = tracking::attach(http::Request::new(()), tracker.clone());

    let first = tracking::lookup(req.extensions()).expect("tracker attached");
    first.set_endpoint_pattern("GET /users/:id");

    let second = tracking::lookup(req.extensions()).expect("tracker attached");
    assert!(second.ptr_eq(&tracker));
    assert_eq!(second.endpoint_pattern(), "GET /users/:id");
    assert_eq!(tracker.endpoint_pattern(), "GET /users/:id");
}

#[test]
fn lookup_outside_a_request_is_none() {
    let req = http::Request::new(());
    assert!(tracking::lookup(req.extensions()).is_none());
}

#[tokio::test]
async fn instrument_finishes_after_the_inner_pipeline() {
    let seen = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&seen);

    let res = trace::instrument(http::Request::get("/users/1").body(()).unwrap(), |req| async move {
        tracking::set_endpoint_pattern(req.extensions(), "GET /users/{id}");
        *slot.lock().unwrap() = tracking::lookup(req.extensions());
        tokio::time::sleep(Duration::from_millis(20)).await;
        ok_response()
    })
    .await;

    assert_eq!(res.status(), 200);
    let tracker = seen.lock().unwrap().take().expect("tracker attached");
    assert_eq!(tracker.endpoint_pattern(), "GET /users/{id}");
    let latency = tracker.read(|t| t.latency_secs());
    assert!(latency >= 0.02, "latency {latency} shorter than the handler delay");
}

#[tokio::test]
async fn each_request_gets_its_own_tracker() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    for _ in 0..2 {
        let slot = Arc::clone(&seen);
        trace::instrument(http::Request::new(()), |req| async move {
            if let Some(tracker) = tracking::lookup(req.extensions()) {
                slot.lock().unwrap().push(tracker);
            }
            ok_response()
        })
        .await;
    }

    let trackers = seen.lock().unwrap();
    assert_eq!(trackers.len(), 2);
    assert!(!trackers[0].ptr_eq(&trackers[1]));
}
