//! Transfer creation

use crate::api::{ApiCall, Endpoint, TargetApi};
use crate::bootstrap::ScenarioContext;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

pub const CHECK_TRANSFER_CREATED: &str = "transfer created 201";

/// One creation attempt; a new key and trace id every time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRequest {
    pub idempotency_key: String,
    pub trace_id: String,
    pub source_account_id: String,
    pub destination_key: String,
    /// Decimal string, sent verbatim
    pub amount: String,
}

impl TransferRequest {
    pub fn body(&self) -> JsonValue {
        json!({
            "fromWalletId": self.source_account_id,
            "toPixKey": self.destination_key,
            "amount": self.amount,
        })
    }
}

/// A transfer the service accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub end_to_end_id: String,
    /// Status reported by the service, when it reported one
    pub status: Option<String>,
    pub idempotency_key: String,
}

/// Why an attempt produced no transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferFailure {
    UnexpectedStatus(u16),
    MissingEndToEndId,
    Transport { timeout: bool, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Created(TransferResult),
    Failed(TransferFailure),
}

impl TransferOutcome {
    pub fn created(self) -> Option<TransferResult> {
        match self {
            TransferOutcome::Created(result) => Some(result),
            TransferOutcome::Failed(_) => None,
        }
    }
}

/// Builds and sends `POST /pix/transfers`
#[derive(Debug, Clone)]
pub struct TransferRequestBuilder {
    api: TargetApi,
}

impl TransferRequestBuilder {
    pub fn new(api: TargetApi) -> Self {
        Self { api }
    }

    pub fn build(&self, ctx: &ScenarioContext, amount: &str) -> TransferRequest {
        let ids = self.api.ids();
        TransferRequest {
            idempotency_key: ids.next_id(),
            trace_id: ids.next_id(),
            source_account_id: ctx.source_account_id.clone(),
            destination_key: ctx.destination_key.clone(),
            amount: amount.to_string(),
        }
    }

    /// Create a transfer; failures are returned, never raised
    pub async fn create_transfer(&self, ctx: &ScenarioContext, amount: &str) -> TransferOutcome {
        let request = self.build(ctx, amount);
        let call = ApiCall::post(Endpoint::TransferCreate, "/pix/transfers")
            .json(request.body())
            .trace_id(request.trace_id.as_str())
            .idempotency_key(request.idempotency_key.as_str());

        let response = match self.api.send(call).await {
            Ok(response) => response,
            Err(e) => {
                self.api.metrics().check(CHECK_TRANSFER_CREATED, false);
                debug!(idempotency_key = %request.idempotency_key, "transfer creation failed: {}", e);
                return TransferOutcome::Failed(TransferFailure::Transport {
                    timeout: e.is_timeout(),
                    message: e.to_string(),
                });
            }
        };

        let created = response.status == 201;
        self.api.metrics().check(CHECK_TRANSFER_CREATED, created);
        if !created {
            debug!(
                idempotency_key = %request.idempotency_key,
                "transfer creation returned {}", response.status
            );
            return TransferOutcome::Failed(TransferFailure::UnexpectedStatus(response.status));
        }

        let Some(end_to_end_id) = response.str_field("endToEndId") else {
            return TransferOutcome::Failed(TransferFailure::MissingEndToEndId);
        };

        TransferOutcome::Created(TransferResult {
            end_to_end_id,
            status: response.str_field("status"),
            idempotency_key: request.idempotency_key,
        })
    }
}
