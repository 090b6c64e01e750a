//! One-time scenario setup

use crate::api::{ApiCall, Endpoint, TargetApi};
use crate::error::SetupError;
use pixload_http::ApiResponse;
use serde::Serialize;
use serde_json::json;
use tracing::info;

/// Accounts and destination key shared read-only by every iteration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioContext {
    pub source_account_id: String,
    pub destination_account_id: String,
    pub destination_key: String,
}

/// Creates two wallets, registers a random key on the second and funds the first
#[derive(Debug, Clone)]
pub struct ScenarioBootstrapper {
    api: TargetApi,
    initial_balance: String,
}

impl ScenarioBootstrapper {
    pub fn new(api: TargetApi, initial_balance: impl Into<String>) -> Self {
        Self {
            api,
            initial_balance: initial_balance.into(),
        }
    }

    pub async fn setup(&self) -> Result<ScenarioContext, SetupError> {
        let source_account_id = self.create_wallet().await?;
        let destination_account_id = self.create_wallet().await?;
        let destination_key = self.create_random_key(&destination_account_id).await?;
        self.deposit(&source_account_id).await?;

        info!(
            source = %source_account_id,
            destination = %destination_account_id,
            key = %destination_key,
            "Scenario setup complete, funded source with {}",
            self.initial_balance
        );

        Ok(ScenarioContext {
            source_account_id,
            destination_account_id,
            destination_key,
        })
    }

    async fn create_wallet(&self) -> Result<String, SetupError> {
        const CALL: &str = "create wallet";
        let response = self
            .call(CALL, 201, ApiCall::post(Endpoint::WalletCreate, "/wallets"))
            .await?;
        required_field(CALL, &response, "id")
    }

    async fn create_random_key(&self, wallet_id: &str) -> Result<String, SetupError> {
        const CALL: &str = "register pix key";
        let call = ApiCall::post(Endpoint::PixKeyCreate, format!("/wallets/{}/pix-keys", wallet_id))
            .json(json!({"type": "RANDOM", "value": ""}));
        let response = self.call(CALL, 201, call).await?;
        required_field(CALL, &response, "value")
    }

    async fn deposit(&self, wallet_id: &str) -> Result<(), SetupError> {
        const CALL: &str = "fund wallet";
        let call = ApiCall::post(Endpoint::WalletDeposit, format!("/wallets/{}/deposit", wallet_id))
            .idempotency_key(self.api.ids().next_id())
            .json(json!({"amount": self.initial_balance}));
        self.call(CALL, 200, call).await?;
        Ok(())
    }

    async fn call(&self, name: &'static str, expected: u16, call: ApiCall) -> Result<ApiResponse, SetupError> {
        let response = self
            .api
            .send(call)
            .await
            .map_err(|source| SetupError::Transport { call: name, source })?;

        let passed = response.status == expected;
        self.api
            .metrics()
            .check(&format!("{} {}", name, expected), passed);

        if !passed {
            return Err(SetupError::UnexpectedStatus {
                call: name,
                expected,
                actual: response.status,
            });
        }
        Ok(response)
    }
}

fn required_field(call: &'static str, response: &ApiResponse, field: &'static str) -> Result<String, SetupError> {
    response
        .str_field(field)
        .ok_or(SetupError::MissingField { call, field })
}
