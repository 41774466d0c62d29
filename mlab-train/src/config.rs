//! Configuration for the reporting transport.

use crate::error::TrainError;
use serde::{Deserialize, Serialize};

/// Collector endpoint configuration for [`HttpSink`](crate::sink::HttpSink).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Collector endpoint that receives result uploads.
    pub api_url: String,
    /// Token passed verbatim in the `Authorization` header.
    pub user_token: String,
    /// Request timeout for the upload (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Whether to verify the collector's TLS certificate. The collector is
    /// commonly deployed with a self-signed certificate, so this is off by
    /// default.
    #[serde(default)]
    pub verify_tls: bool,
}

fn default_timeout_secs() -> u64 {
    120
}

impl ReportConfig {
    pub fn new(api_url: impl Into<String>, user_token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            user_token: user_token.into(),
            timeout_secs: default_timeout_secs(),
            verify_tls: false,
        }
    }

    /// Resolve the endpoint and token from `MLAB_API_URL` / `MLAB_USER_TOKEN`.
    ///
    /// Used by wrapping job processes that receive credentials through the
    /// environment rather than a config file.
    pub fn from_env() -> Result<Self, TrainError> {
        let api_url = std::env::var("MLAB_API_URL")
            .map_err(|_| TrainError::config("MLAB_API_URL is not set"))?;
        let user_token = std::env::var("MLAB_USER_TOKEN")
            .map_err(|_| TrainError::config("MLAB_USER_TOKEN is not set"))?;
        Ok(Self::new(api_url, user_token))
    }
}
