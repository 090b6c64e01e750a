//! Domain-specific configuration modules

pub mod http;
pub mod load;
pub mod logging;
pub mod sampling;
pub mod target;
pub mod thresholds;
pub mod transfer;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main pixload configuration combining all domains
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PixloadConfig {
    /// Service under test and run identity
    #[serde(default)]
    pub target: target::TargetConfig,

    /// HTTP transport configuration
    #[serde(default)]
    pub http: http::HttpConfig,

    /// Transfer amounts and webhook timing
    #[serde(default)]
    pub transfer: transfer::TransferConfig,

    /// Diagnostic failure sampling
    #[serde(default)]
    pub sampling: sampling::SamplingConfig,

    /// Load shapes for the baseline and stress scenarios
    #[serde(default)]
    pub load: load::LoadConfig,

    /// Pass/fail thresholds evaluated at the end of a run
    #[serde(default = "thresholds::default_thresholds")]
    pub thresholds: Vec<thresholds::ThresholdRule>,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl Default for PixloadConfig {
    fn default() -> Self {
        Self {
            target: target::TargetConfig::default(),
            http: http::HttpConfig::default(),
            transfer: transfer::TransferConfig::default(),
            sampling: sampling::SamplingConfig::default(),
            load: load::LoadConfig::default(),
            thresholds: thresholds::default_thresholds(),
            logging: logging::LoggingConfig::default(),
        }
    }
}

impl PixloadConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.target.validate()?;
        self.http.validate()?;
        self.transfer.validate()?;
        self.sampling.validate()?;
        self.load.validate()?;
        self.logging.validate()?;

        for rule in &self.thresholds {
            rule.validate()?;
        }

        Ok(())
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let config = PixloadConfig::default();
        serde_yaml::to_string(&config)
            .unwrap_or_else(|_| "# Failed to generate sample config".to_string())
    }
}
