//! Single-shot HTTP fetcher.

use bytes::Bytes;
use reqwest::{redirect::Policy, Client};
use std::error::Error as StdError;
use std::time::Duration;
use subrecon_core::Host;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Overall budget per request, including the TLS handshake and body read.
    pub timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub keepalive_ms: u64,
    pub redirects: usize,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        FetchOptions {
            timeout_ms: 10_000,
            connect_timeout_ms: 15_000,
            keepalive_ms: 15_000,
            redirects: 10,
            user_agent: format!("subrecon/{}", subrecon_core::version()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("failed to read body: {0}")]
    Body(String),
    #[error("scan deadline reached before fetch completed")]
    Deadline,
    #[error("fetch task aborted")]
    Aborted,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_connect() {
            FetchError::Connect(error_chain(&e))
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(error_chain(&e))
        } else {
            FetchError::Request(error_chain(&e))
        }
    }
}

// reqwest's top-level message hides the DNS/TLS cause.
fn error_chain(e: &dyn StdError) -> String {
    let mut msg = e.to_string();
    let mut src = e.source();
    while let Some(s) = src {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        src = s.source();
    }
    msg
}

/// Outcome of one GET against one host. Exactly one is produced per host.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub host: Host,
    pub body: Bytes,
    pub status: Option<u16>,
    pub error: Option<FetchError>,
}

impl FetchResult {
    pub fn failed(host: Host, error: FetchError) -> Self {
        FetchResult { host, body: Bytes::new(), status: None, error: Some(error) }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Build the client shared by all fetches of a scan. Certificate validation
/// is off: abandoned hosts routinely serve expired or self-signed certs.
pub fn build_client(opts: &FetchOptions) -> reqwest::Result<Client> {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .redirect(Policy::limited(opts.redirects))
        .timeout(Duration::from_millis(opts.timeout_ms))
        .connect_timeout(Duration::from_millis(opts.connect_timeout_ms))
        .tcp_keepalive(Duration::from_millis(opts.keepalive_ms))
        .user_agent(opts.user_agent.clone())
        .brotli(true)
        .gzip(true)
        .deflate(true)
        .build()
}

/// GET `host` once and read the whole body. Never panics; any failure is
/// carried in the returned result.
pub async fn fetch(client: &Client, host: Host) -> FetchResult {
    match fetch_body(client, host.as_str()).await {
        Ok((status, body)) => {
            debug!(host = %host, status, bytes = body.len(), "fetched");
            FetchResult { host, body, status: Some(status), error: None }
        }
        Err(e) => {
            debug!(host = %host, error = %e, "fetch failed");
            FetchResult::failed(host, e)
        }
    }
}

async fn fetch_body(client: &Client, url: &str) -> Result<(u16, Bytes), FetchError> {
    let resp = client.get(url).send().await?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await?;
    Ok((status, body))
}
