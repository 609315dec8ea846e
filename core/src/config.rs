//! Client configuration.
//!
//! # Design
//! Everything that would otherwise be process-wide defaults (the headers every
//! request carries, timeouts, transport behavior) lives in one `ClientConfig`
//! value that is passed to `HttpClient::with_config`. It deserializes from
//! JSON with every field optional, so a config file only needs to name what it
//! changes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http::Headers;
use crate::transport::{ContentLengthReader, ReadToClose, ResponseReader};

pub const DEFAULT_USER_AGENT: &str = concat!("rawhttp/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_CONNECTION: &str = "keep-alive";
pub const DEFAULT_ACCEPT: &str = "application/json, application/xml, text/javascript, */*";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

/// How the transport decides a response is complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    /// Read until the peer closes the connection.
    #[default]
    UntilClose,
    /// Stop once `Content-Length` body bytes have arrived.
    ContentLength,
}

impl ReadStrategy {
    pub fn reader(self) -> Arc<dyn ResponseReader> {
        match self {
            ReadStrategy::UntilClose => Arc::new(ReadToClose),
            ReadStrategy::ContentLength => Arc::new(ContentLengthReader),
        }
    }
}

/// The three optional durations raced against a request.
///
/// `None` and zero both mean "no timer".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub overall: Option<Duration>,
    pub read: Option<Duration>,
    pub write: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub user_agent: String,
    /// Advisory only: the default reader still waits for the peer to close.
    pub connection: String,
    pub accept: String,
    /// Extra headers applied to every request, after the three above.
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: Option<u64>,
    pub read_timeout_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    /// Shut the socket down when a timeout wins instead of only abandoning it.
    pub cancel_in_flight: bool,
    pub read_strategy: ReadStrategy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connection: DEFAULT_CONNECTION.to_string(),
            accept: DEFAULT_ACCEPT.to_string(),
            headers: BTreeMap::new(),
            timeout_ms: None,
            read_timeout_ms: None,
            write_timeout_ms: None,
            cancel_in_flight: false,
            read_strategy: ReadStrategy::default(),
        }
    }
}

impl ClientConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// The header map every new request starts from.
    pub fn default_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert("User-Agent".to_string(), self.user_agent.clone());
        headers.insert("Connection".to_string(), self.connection.clone());
        headers.insert("Accept".to_string(), self.accept.clone());
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        headers
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            overall: self.timeout_ms.map(Duration::from_millis),
            read: self.read_timeout_ms.map(Duration::from_millis),
            write: self.write_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_three_standard_headers() {
        let headers = ClientConfig::default().default_headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers["Connection"], "keep-alive");
        assert_eq!(headers["Accept"], DEFAULT_ACCEPT);
        assert!(headers["User-Agent"].starts_with("rawhttp/"));
    }

    #[test]
    fn empty_json_is_the_default() {
        assert_eq!(ClientConfig::from_json_str("{}").unwrap(), ClientConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = ClientConfig::from_json_str(
            r#"{"timeout_ms": 250, "read_strategy": "content_length", "headers": {"X-Trace": "1"}}"#,
        )
        .unwrap();
        assert_eq!(config.timeouts().overall, Some(Duration::from_millis(250)));
        assert_eq!(config.timeouts().read, None);
        assert_eq!(config.read_strategy, ReadStrategy::ContentLength);
        assert_eq!(config.default_headers()["X-Trace"], "1");
        assert_eq!(config.connection, DEFAULT_CONNECTION);
    }

    #[test]
    fn extra_headers_override_builtins() {
        let config = ClientConfig::from_json_str(r#"{"headers": {"Connection": "close"}}"#).unwrap();
        assert_eq!(config.default_headers()["Connection"], "close");
    }

    #[test]
    fn bad_json_is_rejected() {
        assert!(matches!(
            ClientConfig::from_json_str(r#"{"timeout_ms": "soon"}"#),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = ClientConfig::load("/nonexistent/rawhttp.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
