//! Request construction API.
//!
//! # Design
//! `HttpClient` holds the state shared by the requests it issues: a header
//! map seeded from `ClientConfig`, three optional timeouts, and the arbiter
//! that runs them. Setters mutate that state; the terminal `get`, `head` and
//! `post` calls snapshot it into a `RequestSpec` and execute it, so one
//! client can issue many requests.
//!
//! The strings returned by `get` and `post` are the full raw response text
//! (status line and headers included). Use `execute` and `Response::body`
//! when only the body is wanted.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use crate::arbiter::{Outcome, RequestSpec, TimeoutArbiter};
use crate::config::{ClientConfig, Timeouts};
use crate::error::{ClientError, Result};
use crate::http::{Headers, Method};
use crate::transport::{Connector, ResponseReader, TcpConnector};

#[derive(Debug)]
pub struct HttpClient<C: Connector = TcpConnector> {
    headers: Headers,
    timeouts: Timeouts,
    arbiter: TimeoutArbiter<C>,
}

impl HttpClient<TcpConnector> {
    pub fn new() -> Self {
        Self::with_config(&ClientConfig::default())
    }

    pub fn with_config(config: &ClientConfig) -> Self {
        Self::with_connector(config, TcpConnector)
    }
}

impl Default for HttpClient<TcpConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connector> HttpClient<C> {
    /// Build a client that dials through `connector` instead of plain TCP.
    pub fn with_connector(config: &ClientConfig, connector: C) -> Self {
        let arbiter = TimeoutArbiter::with_connector(connector)
            .with_reader(config.read_strategy.reader())
            .with_cancel_in_flight(config.cancel_in_flight);
        Self {
            headers: config.default_headers(),
            timeouts: config.timeouts(),
            arbiter,
        }
    }

    /// Swap the response reader chosen by the config.
    #[must_use]
    pub fn with_reader(mut self, reader: Arc<dyn ResponseReader>) -> Self {
        self.arbiter = self.arbiter.with_reader(reader);
        self
    }

    /// Insert or replace a header. `Host` is always overwritten from the URL.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Overall deadline. Zero disables it.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeouts.overall = Some(timeout);
    }

    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.timeouts.read = Some(timeout);
    }

    pub fn set_write_timeout(&mut self, timeout: Duration) {
        self.timeouts.write = Some(timeout);
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Snapshot the client state into a request.
    pub fn request_spec(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> RequestSpec {
        RequestSpec {
            method,
            url: url.to_string(),
            headers: self.headers.clone(),
            body,
            timeouts: self.timeouts,
        }
    }

    pub fn execute(&self, spec: &RequestSpec) -> Outcome {
        self.arbiter.execute(spec)
    }

    pub fn get(&self, url: &str) -> Result<String> {
        let response = self.execute(&self.request_spec(Method::Get, url, None))?;
        Ok(response.raw)
    }

    pub fn head(&self, url: &str) -> Result<()> {
        self.execute(&self.request_spec(Method::Head, url, None))?;
        Ok(())
    }

    /// Send `body` verbatim. No `Content-Length` is added; set it with
    /// `set_header` when the peer needs one.
    pub fn post(&self, url: &str, mut body: impl Read) -> Result<String> {
        let mut bytes = Vec::new();
        body.read_to_end(&mut bytes).map_err(ClientError::Body)?;
        let response = self.execute(&self.request_spec(Method::Post, url, Some(bytes)))?;
        Ok(response.raw)
    }
}
