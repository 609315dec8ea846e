//! HTTP/1.1 request framing and status-line parsing.
//!
//! # Design
//! Both halves work on plain data. `frame_request` turns a method, path,
//! header map and body into the exact bytes written to the socket, and
//! `parse_response` turns the bytes read back into a `Response` or an error.
//! Neither touches the network, so both are tested without a peer.
//!
//! Framing is literal: no `Content-Length` is computed and no header value is
//! validated. Status interpretation is equally literal: only the token `200`
//! counts as success.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ClientError;

pub const PROTOCOL_VERSION: &str = "HTTP/1.1";

const CRLF: &str = "\r\n";
const SUCCESS_STATUS: &str = "200";

/// Header mapping. Keys are unique and case-sensitive; the ordered map makes
/// framing deterministic.
pub type Headers = BTreeMap<String, String>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The literal bytes of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage(Vec<u8>);

impl WireMessage {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Serialize a request into its wire form.
///
/// The caller must already have placed `Host` in `headers`.
pub fn frame_request(method: Method, path: &str, headers: &Headers, body: Option<&[u8]>) -> WireMessage {
    let mut head = format!("{} {} {}{CRLF}", method.as_str(), path, PROTOCOL_VERSION);
    for (key, value) in headers {
        head.push_str(key);
        head.push_str(": ");
        head.push_str(value);
        head.push_str(CRLF);
    }
    head.push_str(CRLF);

    let mut bytes = head.into_bytes();
    if let Some(body) = body {
        bytes.extend_from_slice(body);
    }
    WireMessage(bytes)
}

/// A response whose status line read `200`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status_code: String,
    pub status_line: String,
    /// Everything read from the socket, status line and headers included.
    /// Decoded lossily: invalid UTF-8 becomes U+FFFD, so binary bodies do not
    /// survive intact.
    pub raw: String,
}

impl Response {
    /// The bytes after the blank line that ends the header block, or an empty
    /// string when there is none.
    pub fn body(&self) -> &str {
        self.raw
            .split_once("\r\n\r\n")
            .map(|(_, body)| body)
            .unwrap_or("")
    }
}

/// Classify a raw response by its status line.
///
/// The bytes are decoded as lossy UTF-8 before anything else; a response is
/// never rejected for its encoding.
pub fn parse_response(raw: &[u8]) -> Result<Response, ClientError> {
    let raw = String::from_utf8_lossy(raw).into_owned();

    let line_end = raw.find(CRLF).ok_or(ClientError::MalformedResponse)?;
    let status_line = &raw[..line_end];
    let status_code = status_line
        .split(' ')
        .nth(1)
        .ok_or(ClientError::MalformedResponse)?
        .to_string();
    let status_line = status_line.to_string();

    if status_code != SUCCESS_STATUS {
        return Err(ClientError::NonOkStatus {
            status_line,
            status_code,
            raw,
        });
    }

    Ok(Response {
        status_code,
        status_line,
        raw,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_only(host: &str) -> Headers {
        Headers::from([("Host".to_string(), host.to_string())])
    }

    #[test]
    fn get_frames_request_line_headers_and_blank_line() {
        let wire = frame_request(Method::Get, "/a/b", &host_only("x"), None);
        assert_eq!(wire.as_bytes(), b"GET /a/b HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn first_line_reparses() {
        let wire = frame_request(Method::Get, "/p", &host_only("x"), None);
        let text = std::str::from_utf8(wire.as_bytes()).unwrap();
        let first = text.split("\r\n").next().unwrap();
        let parts: Vec<&str> = first.split(' ').collect();
        assert_eq!(parts, ["GET", "/p", "HTTP/1.1"]);
    }

    #[test]
    fn headers_are_framed_in_key_order() {
        let mut headers = host_only("x");
        headers.insert("Accept".to_string(), "*/*".to_string());
        headers.insert("User-Agent".to_string(), "t".to_string());
        let wire = frame_request(Method::Head, "/", &headers, None);
        assert_eq!(
            wire.as_bytes(),
            b"HEAD / HTTP/1.1\r\nAccept: */*\r\nHost: x\r\nUser-Agent: t\r\n\r\n"
        );
    }

    #[test]
    fn body_is_appended_verbatim_without_content_length() {
        let wire = frame_request(Method::Post, "/echo", &host_only("x"), Some(&b"{\"a\":1}"[..]));
        let text = std::str::from_utf8(wire.as_bytes()).unwrap();
        assert!(text.ends_with("\r\n\r\n{\"a\":1}"));
        assert!(!text.contains("Content-Length"));
    }

    #[test]
    fn ok_response() {
        let resp = parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello").unwrap();
        assert_eq!(resp.status_code, "200");
        assert_eq!(resp.status_line, "HTTP/1.1 200 OK");
        assert_eq!(resp.body(), "hello");
    }

    #[test]
    fn not_found_is_a_failure_with_code() {
        let err = parse_response(b"HTTP/1.1 404 Not Found\r\n\r\nmissing").unwrap_err();
        match err {
            ClientError::NonOkStatus {
                status_code,
                status_line,
                raw,
            } => {
                assert_eq!(status_code, "404");
                assert_eq!(status_line, "HTTP/1.1 404 Not Found");
                assert!(raw.ends_with("missing"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_success_codes_are_still_failures() {
        for raw in [&b"HTTP/1.1 201 Created\r\n\r\n"[..], &b"HTTP/1.1 204 No Content\r\n\r\n"[..]] {
            assert!(matches!(parse_response(raw), Err(ClientError::NonOkStatus { .. })));
        }
    }

    #[test]
    fn no_line_terminator_is_malformed() {
        assert!(matches!(parse_response(b"HTTP/1.1 200 OK"), Err(ClientError::MalformedResponse)));
        assert!(matches!(parse_response(b""), Err(ClientError::MalformedResponse)));
    }

    #[test]
    fn single_token_status_line_is_malformed() {
        assert!(matches!(parse_response(b"garbage\r\n\r\n"), Err(ClientError::MalformedResponse)));
    }

    #[test]
    fn body_is_empty_without_blank_line() {
        let resp = parse_response(b"HTTP/1.0 200 OK\r\n").unwrap();
        assert_eq!(resp.body(), "");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        let resp = parse_response(b"HTTP/1.1 200 OK\r\n\r\n\xff\xfeok").unwrap();
        assert_eq!(resp.body(), "\u{fffd}\u{fffd}ok");
    }
}
