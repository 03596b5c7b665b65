//! HTTP transport through a single proxy endpoint
//!
//! This module handles the wire-level request for the fetch engine:
//! - Building one HTTP client per proxy address with the connect/read timeouts
//! - Browser-like request headers with a caller-chosen user agent
//! - Classifying failures into recoverable (proxy-scoped) and terminal ones

use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{redirect::Policy, Client, Proxy};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;

/// Maximum redirect hops before a request counts as a redirect loop
const MAX_REDIRECTS: usize = 10;

/// A single logical GET request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    /// Endpoint URL (may already carry query parameters)
    pub url: String,

    /// Additional query parameters, appended in order
    pub query: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
        }
    }

    /// Appends a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)?;
        let mut separator = if self.url.contains('?') { '&' } else { '?' };
        for (key, value) in &self.query {
            write!(f, "{}{}={}", separator, key, value)?;
            separator = '&';
        }
        Ok(())
    }
}

/// Raw response handed back by a transport
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code
    pub status: u16,

    /// Body decoded as UTF-8
    pub body: String,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("too many redirects: {0}")]
    Redirect(String),

    #[error("undecodable body: {0}")]
    Body(String),

    #[error("request error: {0}")]
    Request(String),
}

impl TransportError {
    /// Returns true for failures attributed to the proxy rather than the request
    ///
    /// Timeouts, proxy/connect errors, error statuses and redirect loops are
    /// retried through a different proxy; anything else ends the logical fetch.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout(_) | Self::Proxy(_) | Self::Status(_) | Self::Redirect(_)
        )
    }
}

/// Issues one HTTP request through one proxy
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        proxy: &str,
        request: &RequestSpec,
        user_agent: &str,
    ) -> Result<TransportResponse, TransportError>;

    /// Drops any per-proxy resources held for an evicted address
    fn forget(&self, _proxy: &str) {}
}

/// reqwest-backed transport routing each request through `http://{proxy}`
pub struct ReqwestTransport {
    connect_timeout: Duration,
    read_timeout: Duration,
    clients: Mutex<HashMap<String, Client>>,
}

impl ReqwestTransport {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached client for a proxy, building it on first use
    fn client_for(&self, proxy: &str) -> Result<Client, TransportError> {
        let mut clients = self
            .clients
            .lock()
            .map_err(|e| TransportError::Request(format!("client cache poisoned: {}", e)))?;

        if let Some(client) = clients.get(proxy) {
            return Ok(client.clone());
        }

        let client = build_proxied_client(proxy, self.connect_timeout, self.read_timeout)
            .map_err(|e| TransportError::Request(format!("invalid proxy {}: {}", proxy, e)))?;
        clients.insert(proxy.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        proxy: &str,
        request: &RequestSpec,
        user_agent: &str,
    ) -> Result<TransportResponse, TransportError> {
        let client = self.client_for(proxy)?;

        let response = client
            .get(&request.url)
            .query(&request.query)
            .header(USER_AGENT, user_agent)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(classify_error)?;
        let body =
            String::from_utf8(bytes.to_vec()).map_err(|e| TransportError::Body(e.to_string()))?;

        Ok(TransportResponse { status, body })
    }

    fn forget(&self, proxy: &str) {
        if let Ok(mut clients) = self.clients.lock() {
            clients.remove(proxy);
        }
    }
}

/// Builds an HTTP client routed through a proxy address
///
/// Both http and https targets go through `http://{proxy}`.
pub fn build_proxied_client(
    proxy: &str,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .proxy(Proxy::all(format!("http://{}", proxy))?)
        .connect_timeout(connect_timeout)
        .timeout(connect_timeout + read_timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a reqwest error onto the transport taxonomy
fn classify_error(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else if e.is_redirect() {
        TransportError::Redirect(e.to_string())
    } else if e.is_connect() {
        // Through a proxy, a refused or reset connection is the proxy's fault
        TransportError::Proxy(e.to_string())
    } else if e.is_body() || e.is_decode() {
        TransportError::Body(e.to_string())
    } else {
        TransportError::Request(e.to_string())
    }
}
