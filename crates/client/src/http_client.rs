//! HTTP Client Factory
//!
//! Builds the shared `reqwest::Client` used by [`crate::HttpScanBackend`].

use std::time::Duration;

use scanlens_core::{CoreError, CoreResult};

/// Connection settings for the scanning service.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Service root, e.g. `http://localhost:8000`
    pub base_url: String,
    /// Whole-request timeout for ordinary calls. Summary streams are exempt.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    /// `http://`, `https://` or `socks5://` proxy; `None` ignores env proxies
    pub proxy_url: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            proxy_url: None,
        }
    }
}

/// Build a `reqwest::Client` with the resolved proxy configuration.
///
/// - `Some(proxy)` -> route all traffic through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
///
/// Only the connect timeout is set client-wide; a client-wide request timeout
/// would cut long-lived summary streams.
pub fn build_http_client(options: &ClientOptions) -> CoreResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(options.connect_timeout);
    match options.proxy_url.as_deref() {
        Some(url) => {
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| CoreError::config(format!("invalid proxy URL {}: {}", url, e)))?;
            builder = builder.proxy(proxy);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder
        .build()
        .map_err(|e| CoreError::internal(format!("failed to build HTTP client: {}", e)))
}
