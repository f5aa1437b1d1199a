//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap, Method};
use hyper::upgrade::OnUpgrade;

use crate::error::Error;
use crate::tracking::{self, Tracker};

/// An incoming HTTP request with its body fully read.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub(crate) fn new(
        parts: http::request::Parts,
        body: Bytes,
        params: HashMap<String, String>,
    ) -> Self {
        Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body,
            params,
            extensions: parts.extensions,
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as `None`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The request's tracker, or `None` when tracking is disabled.
    pub fn tracker(&self) -> Option<Tracker> {
        tracking::lookup(&self.extensions)
    }

    /// Takes over the connection for another protocol (WebSocket, etc.).
    ///
    /// The tracker, if any, is marked hijacked whether or not the upgrade
    /// handle is available; on failure the error is recorded on it as well.
    /// The handler should answer `101 Switching Protocols` and drive the
    /// returned [`OnUpgrade`] from a spawned task: it resolves only after
    /// that response has been sent.
    ///
    /// # Errors
    ///
    /// [`Error::NotUpgradable`] when hyper attached no upgrade handle (not an
    /// HTTP/1.1 upgrade or CONNECT request, or an HTTP/2 request without
    /// extended CONNECT) or the handle was already taken.
    pub fn hijack(&mut self) -> Result<OnUpgrade, Error> {
        match self.extensions.remove::<OnUpgrade>() {
            Some(on_upgrade) => {
                if let Some(tracker) = self.tracker() {
                    tracker.hijack(None);
                }
                Ok(on_upgrade)
            }
            None => {
                if let Some(tracker) = self.tracker() {
                    tracker.hijack(Some(Error::NotUpgradable));
                }
                Err(Error::NotUpgradable)
            }
        }
    }
}
