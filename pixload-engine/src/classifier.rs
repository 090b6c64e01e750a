//! Classification of webhook confirmation responses

use crate::metrics::{names, MetricValue, MetricsSink};
use crate::sampler::{Sample, SampleLimiter};
use pixload_http::HttpError;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::Arc;

/// Error code used when the body carries none
pub const NO_ERROR_CODE: &str = "none";

/// Outcome of one confirmation call; exactly one per call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeCategory {
    /// Status 200
    Success,
    /// Status 404
    ClientErrorNotFound,
    /// Any other 4xx
    ClientErrorOther,
    /// 5xx and above
    ServerError,
    /// No status at all: timeout or transport failure
    NoResponse,
    /// 1xx, 3xx and 2xx other than 200
    Unclassified,
}

impl OutcomeCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            200 => OutcomeCategory::Success,
            404 => OutcomeCategory::ClientErrorNotFound,
            400..=499 => OutcomeCategory::ClientErrorOther,
            s if s >= 500 => OutcomeCategory::ServerError,
            _ => OutcomeCategory::Unclassified,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OutcomeCategory::Success)
    }

    fn counter_name(&self) -> &'static str {
        match self {
            OutcomeCategory::Success => names::WEBHOOK_SUCCESS_COUNT,
            OutcomeCategory::ClientErrorNotFound => names::WEBHOOK_404_COUNT,
            OutcomeCategory::ClientErrorOther => names::WEBHOOK_OTHER_4XX_COUNT,
            OutcomeCategory::ServerError => names::WEBHOOK_5XX_COUNT,
            OutcomeCategory::NoResponse => names::WEBHOOK_NO_RESPONSE_COUNT,
            OutcomeCategory::Unclassified => names::WEBHOOK_UNCLASSIFIED_COUNT,
        }
    }
}

impl fmt::Display for OutcomeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutcomeCategory::Success => "success",
            OutcomeCategory::ClientErrorNotFound => "client_error_not_found",
            OutcomeCategory::ClientErrorOther => "client_error_other",
            OutcomeCategory::ServerError => "server_error",
            OutcomeCategory::NoResponse => "no_response",
            OutcomeCategory::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// Category of a response plus the diagnostic sample it produced, if any
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: OutcomeCategory,
    pub sample: Option<Sample>,
}

/// Maps confirmation responses to categories and records the result
#[derive(Clone)]
pub struct OutcomeClassifier {
    metrics: Arc<dyn MetricsSink>,
    sampler: Arc<SampleLimiter>,
}

impl fmt::Debug for OutcomeClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutcomeClassifier")
            .field("sampler", &self.sampler)
            .finish_non_exhaustive()
    }
}

impl OutcomeClassifier {
    pub fn new(metrics: Arc<dyn MetricsSink>, sampler: Arc<SampleLimiter>) -> Self {
        Self { metrics, sampler }
    }

    pub fn sampler(&self) -> &SampleLimiter {
        &self.sampler
    }

    /// Classify a response; `body` is the parsed body or `{}`
    pub fn classify(&self, status: u16, body: &JsonValue, end_to_end_id: &str) -> Classification {
        let category = OutcomeCategory::from_status(status);
        let error_code = error_code(body);
        let message = body.get("message").and_then(JsonValue::as_str).unwrap_or("");

        let sample = self.record(category, status, &error_code, message, end_to_end_id);
        Classification { category, sample }
    }

    /// Classify a call that never produced a status
    pub fn classify_transport_failure(&self, error: &HttpError, end_to_end_id: &str) -> Classification {
        let error_code = if error.is_timeout() { "timeout" } else { "transport" };
        let message = error.to_string();

        let sample = self.record(OutcomeCategory::NoResponse, 0, error_code, &message, end_to_end_id);
        Classification {
            category: OutcomeCategory::NoResponse,
            sample,
        }
    }

    fn record(
        &self,
        category: OutcomeCategory,
        status: u16,
        error_code: &str,
        message: &str,
        end_to_end_id: &str,
    ) -> Option<Sample> {
        self.metrics.record(
            names::WEBHOOK_4XX_RATE,
            MetricValue::Rate(matches!(
                category,
                OutcomeCategory::ClientErrorNotFound | OutcomeCategory::ClientErrorOther
            )),
            &[],
        );
        self.metrics.record(
            names::WEBHOOK_5XX_RATE,
            MetricValue::Rate(category == OutcomeCategory::ServerError),
            &[],
        );
        self.metrics.increment(category.counter_name(), &[]);

        if category.is_success() {
            return None;
        }

        let status_tag = status.to_string();
        self.metrics.increment(
            names::WEBHOOK_ERROR_CODE_COUNT,
            &[("error_code", error_code), ("status", status_tag.as_str())],
        );
        self.sampler.offer(status, end_to_end_id, error_code, message)
    }
}

/// `code` as sent; empty, zero, false, null or missing map to [`NO_ERROR_CODE`]
fn error_code(body: &JsonValue) -> String {
    match body.get("code") {
        Some(JsonValue::String(code)) if !code.is_empty() => code.clone(),
        Some(JsonValue::Number(code)) if code.as_f64() != Some(0.0) => code.to_string(),
        Some(JsonValue::Bool(true)) => "true".to_string(),
        _ => NO_ERROR_CODE.to_string(),
    }
}
