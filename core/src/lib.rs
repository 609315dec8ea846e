//! Minimal HTTP/1.1 client over raw TCP with racing timeouts.
//!
//! # Overview
//! A URL is split into scheme, host, port and path, the request is framed by
//! hand, and the round-trip (dial, write, read until close, parse the status
//! line) runs on a background thread. Up to three timers (overall, read,
//! write) race it; whichever finishes first decides the result.
//!
//! # Design
//! - `url` and `http` are pure: resolution, framing and status parsing never
//!   touch the network and are tested as plain functions.
//! - `transport` holds the only blocking I/O, behind the `Connector` and
//!   `ResponseReader` traits so tests can script peers.
//! - `arbiter` owns the concurrency: one worker, one thread per timer, one
//!   capacity-one channel each, a single `select!` in the caller.
//! - `client` is the user-facing API: set headers and timeouts, then
//!   `get`/`head`/`post`.
//! - Only a literal `200` status is success. No TLS, redirects, chunked
//!   bodies, pooling or retries.

pub mod arbiter;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod url;

pub use arbiter::{Outcome, RequestSpec, TimeoutArbiter};
pub use client::HttpClient;
pub use config::{ClientConfig, ConfigError, ReadStrategy, Timeouts};
pub use error::ClientError;
pub use http::{Headers, Method, Response};
pub use url::{resolve, ResolvedTarget, Scheme};
