//! HTTP client configuration

use serde::{Deserialize, Serialize};

use super::DEFAULT_USER_AGENT;

/// Settings for [`ScrapeClient`](crate::http::ScrapeClient)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// User agent string
    pub user_agent: String,
    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,
    /// Connection timeout (seconds)
    pub connect_timeout_secs: u64,
    /// Maximum redirects to follow
    pub max_redirects: usize,
    /// Maximum response body size (bytes)
    pub max_content_size: usize,
    /// Accept gzip and brotli encoded responses
    pub gzip: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_redirects: 10,
            max_content_size: 10 * 1024 * 1024,
            gzip: true,
        }
    }
}
