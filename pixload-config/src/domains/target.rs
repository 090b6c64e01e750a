//! Service under test and run identity

use crate::error::ConfigResult;
use crate::validation::{validate_required_string, validate_url, Validatable};
use serde::{Deserialize, Serialize};

/// Where traffic goes and how it is labelled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Base URL of the payment service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Scenario label sent on every request as `X-Scenario`
    #[serde(default = "default_scenario_name")]
    pub scenario_name: String,

    /// Run label sent on every request as `X-Run-Id`; minted at startup when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            scenario_name: default_scenario_name(),
            run_id: None,
        }
    }
}

impl Validatable for TargetConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_url(&self.base_url, "base_url", self.domain_name())?;
        validate_required_string(&self.scenario_name, "scenario_name", self.domain_name())?;

        if let Some(ref run_id) = self.run_id {
            validate_required_string(run_id, "run_id", self.domain_name())?;
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "target"
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_scenario_name() -> String {
    "unspecified".to_string()
}
