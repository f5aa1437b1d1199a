//! Unified error type.

/// The error type returned by spoor's fallible operations.
///
/// Application-level errors (404, 422, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// infrastructure failures (binding a port, accepting a connection) and the
/// response-writing and upgrade failures recorded on a
/// [`Tracker`](crate::tracking::Tracker).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response header name `{0}`")]
    InvalidHeaderName(String),

    #[error("invalid value for response header `{0}`")]
    InvalidHeaderValue(String),

    /// The request carries no connection-upgrade handle: it was not an
    /// HTTP/1.1 upgrade request, or the upgrade was already taken.
    #[error("connection cannot be upgraded")]
    NotUpgradable,
}
