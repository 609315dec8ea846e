//! URL decomposition into scheme, host, port and path.
//!
//! Only the four pieces the transport needs are extracted. There is no
//! percent-decoding, userinfo or query handling: everything from the first
//! `/` after the authority is passed through to the request line untouched.

use std::fmt;

use crate::error::ClientError;

const SCHEME_SEPARATOR: &str = "://";

/// URL scheme. `Https` only selects the default port; no TLS is performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decomposed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: String,
}

impl ResolvedTarget {
    /// `host:port`, the form handed to the connector.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Split `url` into a [`ResolvedTarget`].
///
/// A missing scheme means `http`. An explicit port overrides the scheme
/// default; a missing path becomes `/`.
pub fn resolve(url: &str) -> Result<ResolvedTarget, ClientError> {
    let (scheme, rest) = match url.split_once(SCHEME_SEPARATOR) {
        Some(("http", rest)) => (Scheme::Http, rest),
        Some(("https", rest)) => (Scheme::Https, rest),
        Some((other, _)) => return Err(ClientError::UnsupportedScheme(other.to_string())),
        None => (Scheme::Http, url),
    };

    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };

    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => {
            let port = port.parse::<u16>().map_err(|source| ClientError::PortParse {
                input: port.to_string(),
                source,
            })?;
            (host, port)
        }
        None => (authority, scheme.default_port()),
    };

    if host.is_empty() {
        return Err(ClientError::EmptyHost(url.to_string()));
    }

    Ok(ResolvedTarget {
        scheme,
        host: host.to_string(),
        port,
        path: path.to_string(),
    })
}
