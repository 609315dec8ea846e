//! Blocking byte-stream transport.
//!
//! # Design
//! The arbiter never talks to `TcpStream` directly. It goes through three
//! seams so tests and alternative strategies can be substituted:
//!
//! - [`Connector`] opens a [`Connection`] to `host:port`.
//! - [`write_request`] issues the single write for a framed request.
//! - [`ResponseReader`] decides when the response is complete. The default,
//!   [`ReadToClose`], reads until the peer closes the connection, so a peer
//!   that honors `Connection: keep-alive` will hold the read open until it
//!   times out on its side. [`ContentLengthReader`] stops as soon as the
//!   declared body length has arrived.
//!
//! A connection is owned by the worker that opened it and is dropped (and so
//! closed) on every exit path.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream};

use crate::error::ClientError;
use crate::http::WireMessage;

const READ_CHUNK: usize = 4096;

/// A bidirectional byte stream.
pub trait Connection: Read + Write + Send {
    /// A handle that can unblock in-flight I/O on this connection from another
    /// thread. Connections that cannot be interrupted return `None`.
    fn cancel_handle(&self) -> Option<CancelHandle> {
        None
    }
}

/// Opens connections.
pub trait Connector: Send + Sync + 'static {
    type Conn: Connection + 'static;

    fn connect(&self, addr: &str) -> io::Result<Self::Conn>;
}

/// Plain TCP.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn connect(&self, addr: &str) -> io::Result<TcpStream> {
        TcpStream::connect(addr)
    }
}

impl Connection for TcpStream {
    fn cancel_handle(&self) -> Option<CancelHandle> {
        let stream = self.try_clone().ok()?;
        Some(CancelHandle::new(move || {
            // Fails with NotConnected when the peer already went away.
            let _ = stream.shutdown(Shutdown::Both);
        }))
    }
}

/// One-shot hook that forces a blocked read or write to return.
pub struct CancelHandle {
    cancel: Box<dyn FnOnce() + Send>,
}

impl CancelHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle").finish_non_exhaustive()
    }
}

/// Open a connection, mapping failure to [`ClientError::Connect`].
pub fn dial<C: Connector>(connector: &C, addr: &str) -> Result<C::Conn, ClientError> {
    connector.connect(addr).map_err(|source| ClientError::Connect {
        addr: addr.to_string(),
        source,
    })
}

/// Write the request with one blocking call.
///
/// A short write is not retried; the peer will see a truncated request.
pub fn write_request<W: Write + ?Sized>(conn: &mut W, wire: &WireMessage) -> Result<usize, ClientError> {
    let written = conn.write(wire.as_bytes()).map_err(ClientError::Write)?;
    if written < wire.len() {
        tracing::warn!(written, expected = wire.len(), "short write, request truncated");
    }
    conn.flush().map_err(ClientError::Write)?;
    Ok(written)
}

/// Decides when a response has been read in full.
pub trait ResponseReader: Send + Sync {
    fn read_response(&self, conn: &mut dyn Read) -> io::Result<Vec<u8>>;
}

/// Reads until the peer closes the connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadToClose;

impl ResponseReader for ReadToClose {
    fn read_response(&self, conn: &mut dyn Read) -> io::Result<Vec<u8>> {
        let mut raw = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        loop {
            match conn.read(&mut buf) {
                Ok(0) => return Ok(raw),
                Ok(n) => raw.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Stops once the header block and `Content-Length` body bytes have arrived.
///
/// Without a `Content-Length` header it behaves like [`ReadToClose`]. A HEAD
/// response declares a length it never sends, so it also waits for close.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContentLengthReader;

impl ResponseReader for ContentLengthReader {
    fn read_response(&self, conn: &mut dyn Read) -> io::Result<Vec<u8>> {
        let mut raw = Vec::new();
        let mut buf = [0u8; READ_CHUNK];
        let mut expected_len: Option<usize> = None;
        loop {
            if let Some(total) = expected_len {
                if raw.len() >= total {
                    raw.truncate(total);
                    return Ok(raw);
                }
            }
            match conn.read(&mut buf) {
                Ok(0) => return Ok(raw),
                Ok(n) => raw.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
            if expected_len.is_none() {
                expected_len = declared_total_len(&raw);
            }
        }
    }
}

/// Header block length plus the declared body length, once the header block
/// is complete and carries a parsable `Content-Length`.
fn declared_total_len(raw: &[u8]) -> Option<usize> {
    let head_end = raw.windows(4).position(|w| w == b"\r\n\r\n")? + 4;
    let head = std::str::from_utf8(&raw[..head_end]).ok()?;
    head.split("\r\n").skip(1).find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case("content-length") {
            return None;
        }
        value.trim().parse::<usize>().ok().map(|len| head_end + len)
    })
}
