//! Transport settings for calls against the payment service

use crate::error::ConfigResult;
use crate::validation::{validate_positive, validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the load generator talks to the target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Upper bound for a single call; exceeding it yields a no-response outcome
    #[serde(with = "crate::domains::utils::serde_duration_secs")]
    pub timeout: Duration,

    #[serde(with = "crate::domains::utils::serde_duration_secs")]
    pub connect_timeout: Duration,

    pub user_agent: String,

    /// Accept self-signed certificates on staging targets when false
    pub verify_tls: bool,

    /// Keep-alive connections retained per host; should cover the largest worker pool
    pub max_idle_per_host: usize,

    #[serde(with = "crate::domains::utils::serde_duration_secs")]
    pub idle_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: format!("pixload/{}", env!("CARGO_PKG_VERSION")),
            verify_tls: true,
            max_idle_per_host: 512,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

impl Validatable for HttpConfig {
    fn validate(&self) -> ConfigResult<()> {
        let domain = self.domain_name();
        validate_positive(self.timeout.as_millis(), "timeout", domain)?;
        validate_positive(self.connect_timeout.as_millis(), "connect_timeout", domain)?;
        validate_positive(self.idle_timeout.as_millis(), "idle_timeout", domain)?;
        validate_positive(self.max_idle_per_host, "max_idle_per_host", domain)?;
        validate_required_string(&self.user_agent, "user_agent", domain)
    }

    fn domain_name(&self) -> &'static str {
        "http"
    }
}
