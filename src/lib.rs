//! # spoor
//!
//! A minimal HTTP framework for services behind a reverse proxy, with
//! request tracking built in.
//!
//! Every request gets a [`Tracker`](tracking::Tracker): a per-request record
//! that the router, the handler, and the response writer fill in as the
//! request passes through. When the request finishes, the record is exported
//! as a `tracing` span and event plus `metrics` counters and histograms,
//! labelled by the route template that matched (`GET /users/{id}`) rather
//! than the literal URL. Unmatched requests report `404 Not Found`; upgraded
//! connections report `Upgraded Connection`.
//!
//! - Radix-tree routing via [`matchit`]
//! - hyper HTTP/1.1 and HTTP/2, with connection upgrades
//! - Graceful shutdown on SIGTERM / Ctrl-C
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use spoor::{Request, Response, Router, Server, StatusCode};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/users/{id}", get_user)
//!         .post("/users",     create_user);
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(req: Request) -> Response {
//!     let id = req.param("id").unwrap_or("unknown");
//!     Response::json(format!(r#"{{"id":"{id}"}}"#).into_bytes())
//! }
//!
//! async fn create_user(req: Request) -> Response {
//!     if req.body().is_empty() {
//!         return Response::status(StatusCode::BAD_REQUEST);
//!     }
//!     Response::builder()
//!         .status(StatusCode::CREATED)
//!         .header("location", "/users/99")
//!         .json(br#"{"id":"99"}"#.to_vec())
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;
pub mod tracking;

pub use error::Error;
pub use handler::Handler;
pub use http::{Method, StatusCode};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
