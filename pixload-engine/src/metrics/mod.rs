//! Metrics recording
//!
//! The engine only ever writes metrics through [`MetricsSink`]; it never
//! reads a value back to make a decision. [`InMemoryMetrics`] is the sink
//! used for a run and the source for threshold evaluation and the report.

mod memory;
mod thresholds;

pub use memory::{InMemoryMetrics, MetricSummary, MetricsSnapshot, SeriesSummary, TrendStats};
pub use thresholds::{evaluate_thresholds, Observation, ThresholdOutcome};

use serde::{Deserialize, Serialize};

/// A single sample handed to a sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MetricValue {
    /// Add to a monotonically increasing counter
    Counter(u64),
    /// One hit (`true`) or miss (`false`) of a ratio
    Rate(bool),
    /// One observation of a distribution, in milliseconds for timings
    Trend(f64),
}

/// Destination for metric samples
pub trait MetricsSink: Send + Sync {
    fn record(&self, name: &str, value: MetricValue, tags: &[(&str, &str)]);

    fn increment(&self, name: &str, tags: &[(&str, &str)]) {
        self.record(name, MetricValue::Counter(1), tags);
    }

    /// Record a named boolean assertion on the `checks` rate
    fn check(&self, check: &str, passed: bool) {
        self.record(names::CHECKS, MetricValue::Rate(passed), &[("check", check)]);
    }
}

/// Metric names shared by the engine, report and default thresholds
pub mod names {
    pub const HTTP_REQS: &str = "http_reqs";
    pub const HTTP_REQ_DURATION: &str = "http_req_duration";
    pub const HTTP_REQ_FAILED: &str = "http_req_failed";

    pub const ITERATIONS: &str = "iterations";
    pub const DROPPED_ITERATIONS: &str = "dropped_iterations";
    pub const TIME_TO_CONFIRM: &str = "time_to_confirm";
    pub const CHECKS: &str = "checks";

    pub const WEBHOOK_4XX_RATE: &str = "webhook_4xx_rate";
    pub const WEBHOOK_5XX_RATE: &str = "webhook_5xx_rate";
    pub const WEBHOOK_SUCCESS_COUNT: &str = "webhook_success_count";
    pub const WEBHOOK_404_COUNT: &str = "webhook_404_count";
    pub const WEBHOOK_OTHER_4XX_COUNT: &str = "webhook_other_4xx_count";
    pub const WEBHOOK_5XX_COUNT: &str = "webhook_5xx_count";
    pub const WEBHOOK_UNCLASSIFIED_COUNT: &str = "webhook_unclassified_count";
    pub const WEBHOOK_NO_RESPONSE_COUNT: &str = "webhook_no_response_count";
    pub const WEBHOOK_ERROR_CODE_COUNT: &str = "webhook_error_code_count";
}
