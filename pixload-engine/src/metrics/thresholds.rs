//! Pass/fail evaluation of threshold rules against recorded metrics

use super::memory::{InMemoryMetrics, Series, TrendStats};
use pixload_config::{Aggregate, ThresholdRule};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a rule saw when it was evaluated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Observation {
    Value(f64),
    /// Nothing recorded for the metric and tags
    NoData,
    /// The aggregate does not apply to the metric's kind
    Unsupported,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Value(v) => write!(f, "{:.4}", v),
            Observation::NoData => f.write_str("no data"),
            Observation::Unsupported => f.write_str("unsupported aggregate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    /// `metric{tag:value}`
    pub label: String,
    pub condition: String,
    pub observed: Observation,
    pub passed: bool,
}

fn observe(metrics: &InMemoryMetrics, rule: &ThresholdRule) -> Observation {
    let filter: Vec<(&str, &str)> = rule
        .tags
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let Some(series) = metrics.merged(&rule.metric, &filter) else {
        return Observation::NoData;
    };

    let value = match (series, rule.condition.aggregate) {
        (Series::Counter(count), Aggregate::Count) => count as f64,
        (Series::Rate { total: 0, .. }, _) => return Observation::NoData,
        (Series::Rate { hits, total }, Aggregate::Rate) => hits as f64 / total as f64,
        (Series::Rate { hits, .. }, Aggregate::Count) => hits as f64,
        (Series::Trend(values), aggregate) => {
            if values.is_empty() {
                return Observation::NoData;
            }
            let stats = TrendStats::from_values(&values);
            match aggregate {
                Aggregate::Count => stats.count as f64,
                Aggregate::Avg => stats.avg,
                Aggregate::Min => stats.min,
                Aggregate::Max => stats.max,
                Aggregate::Med => stats.med,
                Aggregate::Percentile(p) => stats.percentile(p),
                Aggregate::Rate => return Observation::Unsupported,
            }
        }
        _ => return Observation::Unsupported,
    };

    Observation::Value(value)
}

/// Evaluate every rule; a rule without data passes
pub fn evaluate_thresholds(metrics: &InMemoryMetrics, rules: &[ThresholdRule]) -> Vec<ThresholdOutcome> {
    rules
        .iter()
        .map(|rule| {
            let observed = observe(metrics, rule);
            let passed = match observed {
                Observation::Value(v) => rule.condition.passes(v),
                Observation::NoData => true,
                Observation::Unsupported => false,
            };
            ThresholdOutcome {
                label: rule.label(),
                condition: rule.condition.to_string(),
                observed,
                passed,
            }
        })
        .collect()
}
