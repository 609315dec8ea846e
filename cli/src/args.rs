use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use rawhttp_core::{ClientConfig, HttpClient, ReadStrategy};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "rawhttp", version, about = "Issue HTTP/1.1 requests over raw TCP", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub options: RequestOptions,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// GET a URL and print the raw response
    Get { url: String },

    /// HEAD a URL; only the exit status reports the outcome
    Head { url: String },

    /// POST a body and print the raw response
    Post {
        url: String,

        /// Literal request body
        #[arg(short, long, conflicts_with = "file")]
        data: Option<String>,

        /// Read the request body from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Send `Content-Type: application/json`
        #[arg(long)]
        json: bool,
    },

    /// Run POST, GET, HEAD and a timed GET against one URL
    Demo { url: String },
}

#[derive(Args, Debug, Default)]
pub struct RequestOptions {
    /// Extra header as "Key: Value" (repeatable)
    #[arg(short = 'H', long = "header", value_parser = parse_header, global = true)]
    pub headers: Vec<(String, String)>,

    /// Overall timeout in milliseconds (0 disables)
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Read timeout in milliseconds (0 disables)
    #[arg(long, global = true)]
    pub read_timeout_ms: Option<u64>,

    /// Write timeout in milliseconds (0 disables)
    #[arg(long, global = true)]
    pub write_timeout_ms: Option<u64>,

    /// JSON client config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Shut the socket down when a timeout fires
    #[arg(long, global = true)]
    pub cancel_in_flight: bool,

    /// Stop reading once Content-Length bytes arrive instead of waiting for close
    #[arg(long, global = true)]
    pub content_length: bool,
}

impl Cli {
    pub fn log_level(&self) -> Level {
        if self.quiet {
            return Level::ERROR;
        }
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

impl RequestOptions {
    /// The config file (if any) with command-line flags applied on top.
    pub fn client_config(&self) -> anyhow::Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => ClientConfig::default(),
        };
        if self.timeout_ms.is_some() {
            config.timeout_ms = self.timeout_ms;
        }
        if self.read_timeout_ms.is_some() {
            config.read_timeout_ms = self.read_timeout_ms;
        }
        if self.write_timeout_ms.is_some() {
            config.write_timeout_ms = self.write_timeout_ms;
        }
        if self.cancel_in_flight {
            config.cancel_in_flight = true;
        }
        if self.content_length {
            config.read_strategy = ReadStrategy::ContentLength;
        }
        config
            .headers
            .extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(config)
    }

    pub fn client(&self) -> anyhow::Result<HttpClient> {
        Ok(HttpClient::with_config(&self.client_config()?))
    }

    pub fn overall_timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Key: Value\", got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty header name in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
