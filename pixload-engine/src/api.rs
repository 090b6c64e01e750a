//! Instrumented access to the payment service
//!
//! Every call made by the engine goes through [`TargetApi`], which stamps
//! the correlation headers and records the request metrics (`http_reqs`,
//! `http_req_duration`, `http_req_failed`) tagged with the endpoint.

use crate::ids::IdGenerator;
use crate::metrics::{names, MetricValue, MetricsSink};
use pixload_http::{ApiRequest, ApiResponse, HttpClient, HttpError};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

pub const HEADER_SCENARIO: &str = "X-Scenario";
pub const HEADER_RUN_ID: &str = "X-Run-Id";
pub const HEADER_TRACE_ID: &str = "X-Trace-Id";
pub const HEADER_IDEMPOTENCY_KEY: &str = "Idempotency-Key";

/// Logical endpoint, used as the `endpoint` metric tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    WalletCreate,
    PixKeyCreate,
    WalletDeposit,
    TransferCreate,
    TransferConfirm,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::WalletCreate => "wallet_create",
            Endpoint::PixKeyCreate => "pix_key_create",
            Endpoint::WalletDeposit => "wallet_deposit",
            Endpoint::TransferCreate => "transfer_create",
            Endpoint::TransferConfirm => "transfer_confirm",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scenario name and run id carried on every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    pub scenario: String,
    pub run_id: String,
}

impl Correlation {
    pub fn new(scenario: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            run_id: run_id.into(),
        }
    }

    pub fn headers(&self, trace_id: &str) -> [(&'static str, String); 4] {
        [
            ("Content-Type", "application/json".to_string()),
            (HEADER_SCENARIO, self.scenario.clone()),
            (HEADER_RUN_ID, self.run_id.clone()),
            (HEADER_TRACE_ID, trace_id.to_string()),
        ]
    }
}

/// One outbound call
#[derive(Debug, Clone)]
pub struct ApiCall {
    pub endpoint: Endpoint,
    pub path: String,
    pub body: Option<JsonValue>,
    pub trace_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl ApiCall {
    pub fn post(endpoint: Endpoint, path: impl Into<String>) -> Self {
        Self {
            endpoint,
            path: path.into(),
            body: None,
            trace_id: None,
            idempotency_key: None,
        }
    }

    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Transport plus metrics, shared by every worker
#[derive(Clone)]
pub struct TargetApi {
    client: Arc<dyn HttpClient>,
    metrics: Arc<dyn MetricsSink>,
    ids: Arc<dyn IdGenerator>,
    correlation: Correlation,
}

impl fmt::Debug for TargetApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetApi")
            .field("correlation", &self.correlation)
            .field("ids", &self.ids)
            .finish_non_exhaustive()
    }
}

impl TargetApi {
    pub fn new(
        client: Arc<dyn HttpClient>,
        metrics: Arc<dyn MetricsSink>,
        ids: Arc<dyn IdGenerator>,
        correlation: Correlation,
    ) -> Self {
        Self {
            client,
            metrics,
            ids,
            correlation,
        }
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub fn metrics(&self) -> &dyn MetricsSink {
        self.metrics.as_ref()
    }

    pub fn correlation(&self) -> &Correlation {
        &self.correlation
    }

    /// Send a call; any status is returned, only transport failures are errors
    pub async fn send(&self, call: ApiCall) -> Result<ApiResponse, HttpError> {
        let trace_id = call.trace_id.unwrap_or_else(|| self.ids.next_id());

        let mut request = ApiRequest::post(call.path).with_headers(self.correlation.headers(&trace_id));
        if let Some(key) = call.idempotency_key {
            request = request.with_header(HEADER_IDEMPOTENCY_KEY, key);
        }
        if let Some(body) = call.body {
            request = request.with_json(body);
        }

        let result = self.client.send(request).await;
        self.record(call.endpoint, &result);

        match &result {
            Ok(response) => debug!(
                endpoint = %call.endpoint,
                status = response.status,
                trace_id = %trace_id,
                "request completed in {:?}",
                response.elapsed
            ),
            Err(e) => debug!(endpoint = %call.endpoint, trace_id = %trace_id, "request failed: {}", e),
        }

        result
    }

    fn record(&self, endpoint: Endpoint, result: &Result<ApiResponse, HttpError>) {
        let status = match result {
            Ok(response) => response.status.to_string(),
            Err(_) => "0".to_string(),
        };
        let tags = [("endpoint", endpoint.as_str()), ("status", status.as_str())];

        self.metrics.increment(names::HTTP_REQS, &tags);
        match result {
            Ok(response) => {
                self.metrics.record(
                    names::HTTP_REQ_DURATION,
                    MetricValue::Trend(response.elapsed.as_secs_f64() * 1000.0),
                    &tags,
                );
                let failed = !(200..400).contains(&response.status);
                self.metrics.record(names::HTTP_REQ_FAILED, MetricValue::Rate(failed), &tags);
            }
            Err(_) => {
                self.metrics.record(names::HTTP_REQ_FAILED, MetricValue::Rate(true), &tags);
            }
        }
    }
}
