//! HTTP client configuration

use pixload_config::domains::http::HttpConfig as ConfigHttpConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Connection establishment timeout
    pub connect_timeout: Duration,

    /// Maximum idle connections kept per host
    pub max_idle_per_host: usize,

    /// Idle connection eviction timeout
    pub idle_timeout: Duration,

    /// User agent string
    pub user_agent: String,

    /// Whether to verify TLS certificates
    pub verify_tls: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        ConfigHttpConfig::default().into()
    }
}

impl From<ConfigHttpConfig> for HttpConfig {
    fn from(config: ConfigHttpConfig) -> Self {
        Self {
            timeout: config.timeout,
            connect_timeout: config.connect_timeout,
            max_idle_per_host: config.max_idle_per_host,
            idle_timeout: config.idle_timeout,
            user_agent: config.user_agent,
            verify_tls: config.verify_tls,
        }
    }
}
