//! Settings Models
//!
//! Scanner configuration and settings data structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use scanlens_client::ClientOptions;

use crate::models::upload_mode::UploadMode;

/// Environment variable that overrides `api_base_url` at load time.
pub const API_URL_ENV: &str = "SCANLENS_API_URL";

/// Largest file the scanning service accepts (650 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 650 * 1024 * 1024;

/// Scanner configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Root URL of the scanning service
    pub api_base_url: String,
    /// Timeout for ordinary requests, in seconds
    pub request_timeout_secs: u64,
    /// Timeout for establishing connections, in seconds
    pub connect_timeout_secs: u64,
    /// Optional `http://`, `https://` or `socks5://` proxy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    /// Mode new sessions start in
    #[serde(default)]
    pub default_upload_mode: UploadMode,
    /// Uploads above this size are rejected locally
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    /// `tracing` filter directive used when RUST_LOG is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            proxy_url: None,
            default_upload_mode: UploadMode::Full,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            log_filter: default_log_filter(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    /// `Some(None)` clears the proxy
    pub proxy_url: Option<Option<String>>,
    pub default_upload_mode: Option<UploadMode>,
    pub max_upload_bytes: Option<u64>,
    pub log_filter: Option<String>,
}

impl ScannerConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(url) = update.api_base_url {
            self.api_base_url = url;
        }
        if let Some(secs) = update.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = update.connect_timeout_secs {
            self.connect_timeout_secs = secs;
        }
        if let Some(proxy) = update.proxy_url {
            self.proxy_url = proxy;
        }
        if let Some(mode) = update.default_upload_mode {
            self.default_upload_mode = mode;
        }
        if let Some(max) = update.max_upload_bytes {
            self.max_upload_bytes = max;
        }
        if let Some(filter) = update.log_filter {
            self.log_filter = filter;
        }
    }

    /// Replace `api_base_url` with `SCANLENS_API_URL` when it is set.
    pub fn apply_env_override(&mut self) {
        self.apply_api_url_override(std::env::var(API_URL_ENV).ok());
    }

    fn apply_api_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!(
                "Invalid api_base_url: {}. Must start with 'http://' or 'https://'",
                self.api_base_url
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be at least 1 second".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be at least 1 second".to_string());
        }

        if let Some(proxy) = &self.proxy_url {
            if !["http://", "https://", "socks5://", "socks5h://"]
                .iter()
                .any(|scheme| proxy.starts_with(scheme))
            {
                return Err(format!("Unsupported proxy URL: {}", proxy));
            }
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be positive".to_string());
        }

        Ok(())
    }

    /// Connection settings for the HTTP backend
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api_base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            proxy_url: self.proxy_url.clone(),
        }
    }
}
