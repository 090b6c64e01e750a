//! Transfer values and webhook timing

use crate::error::ConfigResult;
use crate::validation::{validate_decimal_amount, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Values used by setup and by every iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Amount moved by each iteration's transfer, as a decimal string
    #[serde(default = "default_amount")]
    pub amount: String,

    /// Balance deposited into the source account during setup, as a decimal string
    #[serde(default = "default_initial_balance")]
    pub initial_balance: String,

    /// How far in the past webhook `occurredAt` timestamps are placed
    #[serde(
        with = "crate::domains::utils::serde_duration_millis",
        default = "default_webhook_skew"
    )]
    pub webhook_skew: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            amount: default_amount(),
            initial_balance: default_initial_balance(),
            webhook_skew: default_webhook_skew(),
        }
    }
}

impl Validatable for TransferConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_decimal_amount(&self.amount, "amount", self.domain_name())?;
        validate_decimal_amount(&self.initial_balance, "initial_balance", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "transfer"
    }
}

fn default_amount() -> String {
    "5.00".to_string()
}

fn default_initial_balance() -> String {
    "200000.00".to_string()
}

fn default_webhook_skew() -> Duration {
    Duration::from_millis(750)
}
