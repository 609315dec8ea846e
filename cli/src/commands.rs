use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use rawhttp_core::{ClientError, HttpClient};

use crate::args::RequestOptions;

const DEMO_BODY: &str = r#"{"name":"rawhttp"}"#;
const DEMO_TIMEOUT: Duration = Duration::from_secs(10);

pub fn get(options: &RequestOptions, url: &str) -> anyhow::Result<()> {
    let client = options.client()?;
    print_outcome(client.get(url))
}

pub fn head(options: &RequestOptions, url: &str) -> anyhow::Result<()> {
    let client = options.client()?;
    client.head(url)?;
    tracing::info!(url, "HEAD ok");
    Ok(())
}

pub fn post(options: &RequestOptions, url: &str, data: Option<&str>, file: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let body = match (data, file) {
        (Some(data), _) => data.as_bytes().to_vec(),
        (None, Some(path)) => {
            let mut bytes = Vec::new();
            File::open(path)
                .and_then(|mut f| f.read_to_end(&mut bytes))
                .with_context(|| format!("reading {}", path.display()))?;
            bytes
        }
        (None, None) => Vec::new(),
    };

    let mut client = options.client()?;
    if json {
        client.set_header("Content-Type", "application/json");
    }
    with_content_length(&mut client, body.len());
    print_outcome(client.post(url, body.as_slice()))
}

/// POST, GET, HEAD, then a GET under a timeout, each with a fresh client.
pub fn demo(options: &RequestOptions, url: &str) -> anyhow::Result<()> {
    let mut failed = 0;

    let mut client = options.client()?;
    client.set_header("Content-Type", "application/json");
    with_content_length(&mut client, DEMO_BODY.len());
    failed += report("POST", client.post(url, DEMO_BODY.as_bytes()).map(|raw| raw.len()));

    let client = options.client()?;
    failed += report("GET", client.get(url).map(|raw| raw.len()));

    let client = options.client()?;
    failed += report("HEAD", client.head(url).map(|()| 0));

    let mut client = options.client()?;
    client.set_timeout(options.overall_timeout().unwrap_or(DEMO_TIMEOUT));
    failed += report("GET with timeout", client.get(url).map(|raw| raw.len()));

    if failed > 0 {
        bail!("{failed} of 4 demo requests failed");
    }
    Ok(())
}

/// The core never adds `Content-Length`; do it here unless the user did.
fn with_content_length(client: &mut HttpClient, len: usize) {
    let user_set = client
        .headers()
        .keys()
        .any(|key| key.eq_ignore_ascii_case("Content-Length"));
    if !user_set {
        client.set_header("Content-Length", len.to_string());
    }
}

fn report(step: &str, result: Result<usize, ClientError>) -> usize {
    match result {
        Ok(bytes) => {
            tracing::info!(step, bytes, "ok");
            0
        }
        Err(err) => {
            tracing::error!(step, error = %err, "failed");
            1
        }
    }
}

/// Print whatever raw response text exists, then surface the error.
fn print_outcome(result: Result<String, ClientError>) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    match result {
        Ok(raw) => {
            stdout.write_all(raw.as_bytes())?;
            writeln!(stdout)?;
            Ok(())
        }
        Err(err) => {
            if let Some(raw) = err.raw_response() {
                stdout.write_all(raw.as_bytes())?;
                writeln!(stdout)?;
            }
            Err(err.into())
        }
    }
}
