//! Configuration loading and environment variable handling

use crate::domains::PixloadConfig;
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "PIXLOAD".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<PixloadConfig> {
        let path = path.as_ref();
        tracing::debug!("Loading configuration from {}", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut config: PixloadConfig = serde_yaml::from_str(&content)?;

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from defaults plus environment variables
    pub fn from_env(&self) -> ConfigResult<PixloadConfig> {
        let mut config = PixloadConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<PixloadConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut PixloadConfig) -> ConfigResult<()> {
        self.apply_target_overrides(&mut config.target);
        self.apply_http_overrides(&mut config.http)?;
        self.apply_transfer_overrides(&mut config.transfer)?;
        self.apply_sampling_overrides(&mut config.sampling)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply target config overrides
    fn apply_target_overrides(&self, config: &mut crate::domains::target::TargetConfig) {
        if let Ok(base_url) = self.get_env_var("BASE_URL") {
            config.base_url = base_url;
        }

        if let Ok(scenario_name) = self.get_env_var("SCENARIO_NAME") {
            config.scenario_name = scenario_name;
        }

        if let Ok(run_id) = self.get_env_var("RUN_ID") {
            config.run_id = Some(run_id);
        }
    }

    /// Apply HTTP config overrides
    fn apply_http_overrides(&self, config: &mut crate::domains::http::HttpConfig) -> ConfigResult<()> {
        if let Ok(timeout) = self.get_env_var("HTTP_TIMEOUT") {
            // Same forms as the file: whole seconds or a humantime string
            config.timeout = match timeout.trim().parse::<u64>() {
                Ok(seconds) => Duration::from_secs(seconds),
                Err(_) => humantime_serde::re::humantime::parse_duration(timeout.trim())
                    .map_err(|e| ConfigError::EnvError(format!("Invalid HTTP_TIMEOUT: {}", e)))?,
            };
        }

        if let Ok(user_agent) = self.get_env_var("HTTP_USER_AGENT") {
            config.user_agent = user_agent;
        }

        Ok(())
    }

    /// Apply transfer config overrides
    fn apply_transfer_overrides(
        &self,
        config: &mut crate::domains::transfer::TransferConfig,
    ) -> ConfigResult<()> {
        if let Ok(amount) = self.get_env_var("TRANSFER_AMOUNT") {
            config.amount = amount;
        }

        if let Ok(balance) = self.get_env_var("INITIAL_BALANCE") {
            config.initial_balance = balance;
        }

        if let Ok(skew) = self.get_env_var("WEBHOOK_TIMESTAMP_SKEW_MS") {
            let millis: u64 = skew.parse().map_err(|e| {
                ConfigError::EnvError(format!("Invalid WEBHOOK_TIMESTAMP_SKEW_MS: {}", e))
            })?;
            config.webhook_skew = Duration::from_millis(millis);
        }

        Ok(())
    }

    /// Apply sampling config overrides
    fn apply_sampling_overrides(
        &self,
        config: &mut crate::domains::sampling::SamplingConfig,
    ) -> ConfigResult<()> {
        if let Ok(percent) = self.get_env_var("FAIL_SAMPLE_PCT") {
            config.percent = percent
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid FAIL_SAMPLE_PCT: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(
        &self,
        config: &mut crate::domains::logging::LoggingConfig,
    ) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        if let Ok(directives) = self.get_env_var("LOG_DIRECTIVES") {
            config.directives = directives
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
