//! Diagnostic failure sampling

use crate::error::ConfigResult;
use crate::validation::{validate_percent, Validatable};
use serde::{Deserialize, Serialize};

/// Controls how many failed confirmations are written to the log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Probability, in percent, that a failure is logged
    #[serde(default = "default_percent")]
    pub percent: f64,

    /// Hard cap on logged failures for the whole run
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            percent: default_percent(),
            capacity: default_capacity(),
        }
    }
}

impl Validatable for SamplingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_percent(self.percent, "percent", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "sampling"
    }
}

fn default_percent() -> f64 {
    5.0
}

fn default_capacity() -> usize {
    500
}
