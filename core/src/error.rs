//! Error types for request execution.
//!
//! # Design
//! Every failure is terminal for the request that produced it and is handed
//! back to the caller as the `Err` half of an `Outcome`. Nothing is retried
//! and nothing is logged here; callers decide what is recoverable.
//!
//! `NonOkStatus` keeps the raw response text so callers can still inspect a
//! 404 page or a 201 body even though the request is reported as failed.

use std::io;
use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while resolving, framing, sending or interpreting a request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The URL named a scheme other than `http` or `https`.
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    /// The port section of the URL is not a valid `u16`.
    #[error("invalid port '{input}': {source}")]
    PortParse {
        input: String,
        #[source]
        source: ParseIntError,
    },

    /// The URL has nothing before the port or path separator.
    #[error("url '{0}' has an empty host")]
    EmptyHost(String),

    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to write request: {0}")]
    Write(#[source] io::Error),

    #[error("failed to read response: {0}")]
    Read(#[source] io::Error),

    /// The response has no line terminator or no status code token.
    #[error("malformed response")]
    MalformedResponse,

    /// The peer answered with anything other than a literal `200`.
    #[error("{status_line}")]
    NonOkStatus {
        status_line: String,
        status_code: String,
        raw: String,
    },

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error("read timeout after {0:?}")]
    ReadTimeout(Duration),

    #[error("write timeout after {0:?}")]
    WriteTimeout(Duration),

    /// The caller-supplied body source could not be drained.
    #[error("failed to read request body: {0}")]
    Body(#[source] io::Error),

    #[error("failed to spawn request thread: {0}")]
    Spawn(#[source] io::Error),

    /// The worker went away without delivering an outcome (it panicked).
    #[error("request worker exited without a result")]
    WorkerLost,

    /// The worker found the caller had already stopped waiting.
    #[error("request abandoned by the caller")]
    Cancelled,
}

impl ClientError {
    /// True for the three timer-driven failures.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ClientError::Timeout(_) | ClientError::ReadTimeout(_) | ClientError::WriteTimeout(_)
        )
    }

    /// The raw response text, when one was read before the failure.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            ClientError::NonOkStatus { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
