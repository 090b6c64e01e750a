//! Pass/fail thresholds over recorded metrics
//!
//! A rule names a metric, an optional tag filter and a condition such as
//! `rate<0.005` or `p(95)<300`. Conditions are parsed when the configuration
//! is loaded so a typo fails the run before any traffic is generated.

use crate::error::{ConfigError, ConfigResult};
use crate::validation::{validate_required_string, Validatable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One threshold rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Metric name, e.g. `http_req_duration`
    pub metric: String,

    /// Only series carrying all of these tags are considered
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    /// Condition the aggregated value must satisfy
    pub condition: ThresholdCondition,
}

impl ThresholdRule {
    pub fn new(metric: impl Into<String>, condition: ThresholdCondition) -> Self {
        Self {
            metric: metric.into(),
            tags: BTreeMap::new(),
            condition,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Label in the `metric{tag:value}` form used in reports
    pub fn label(&self) -> String {
        if self.tags.is_empty() {
            return self.metric.clone();
        }
        let tags: Vec<String> = self
            .tags
            .iter()
            .map(|(key, value)| format!("{}:{}", key, value))
            .collect();
        format!("{}{{{}}}", self.metric, tags.join(","))
    }
}

impl Validatable for ThresholdRule {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(&self.metric, "metric", self.domain_name())
    }

    fn domain_name(&self) -> &'static str {
        "thresholds"
    }
}

/// Aggregation applied to a metric before comparison
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregate {
    /// Fraction of true samples of a rate metric
    Rate,
    /// Sum of a counter
    Count,
    Avg,
    Min,
    Max,
    Med,
    /// Percentile of a trend, 0..=100
    Percentile(f64),
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
}

impl Comparison {
    pub fn holds(self, observed: f64, bound: f64) -> bool {
        match self {
            Comparison::Lt => observed < bound,
            Comparison::Le => observed <= bound,
            Comparison::Gt => observed > bound,
            Comparison::Ge => observed >= bound,
            Comparison::Eq => observed == bound,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
        }
    }
}

/// Parsed threshold condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThresholdCondition {
    pub aggregate: Aggregate,
    pub comparison: Comparison,
    pub bound: f64,
}

impl ThresholdCondition {
    pub fn passes(&self, observed: f64) -> bool {
        self.comparison.holds(observed, self.bound)
    }
}

impl FromStr for ThresholdCondition {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = |reason: &str| ConfigError::ThresholdSyntax {
            condition: s.to_string(),
            reason: reason.to_string(),
        };

        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let split_at = compact
            .find(['<', '>', '='])
            .ok_or_else(|| syntax("missing comparison operator"))?;
        let (aggregate, rest) = compact.split_at(split_at);

        // Two-character operators first
        let (comparison, bound) = if let Some(bound) = rest.strip_prefix("<=") {
            (Comparison::Le, bound)
        } else if let Some(bound) = rest.strip_prefix(">=") {
            (Comparison::Ge, bound)
        } else if let Some(bound) = rest.strip_prefix("==") {
            (Comparison::Eq, bound)
        } else if let Some(bound) = rest.strip_prefix('<') {
            (Comparison::Lt, bound)
        } else if let Some(bound) = rest.strip_prefix('>') {
            (Comparison::Gt, bound)
        } else {
            return Err(syntax("unknown comparison operator"));
        };

        let bound: f64 = bound.parse().map_err(|_| syntax("bound is not a number"))?;
        if !bound.is_finite() {
            return Err(syntax("bound must be finite"));
        }

        let aggregate = match aggregate {
            "rate" => Aggregate::Rate,
            "count" => Aggregate::Count,
            "avg" => Aggregate::Avg,
            "min" => Aggregate::Min,
            "max" => Aggregate::Max,
            "med" => Aggregate::Med,
            other => {
                let percentile = other
                    .strip_prefix("p(")
                    .and_then(|rest| rest.strip_suffix(')'))
                    .ok_or_else(|| syntax("unknown aggregate"))?;
                let percentile: f64 = percentile
                    .parse()
                    .map_err(|_| syntax("percentile is not a number"))?;
                if !(0.0..=100.0).contains(&percentile) {
                    return Err(syntax("percentile must be between 0 and 100"));
                }
                Aggregate::Percentile(percentile)
            }
        };

        Ok(Self {
            aggregate,
            comparison,
            bound,
        })
    }
}

impl fmt::Display for ThresholdCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.aggregate {
            Aggregate::Rate => write!(f, "rate")?,
            Aggregate::Count => write!(f, "count")?,
            Aggregate::Avg => write!(f, "avg")?,
            Aggregate::Min => write!(f, "min")?,
            Aggregate::Max => write!(f, "max")?,
            Aggregate::Med => write!(f, "med")?,
            Aggregate::Percentile(p) => write!(f, "p({})", p)?,
        }
        write!(f, "{}{}", self.comparison.as_str(), self.bound)
    }
}

impl TryFrom<String> for ThresholdCondition {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ThresholdCondition> for String {
    fn from(condition: ThresholdCondition) -> Self {
        condition.to_string()
    }
}

fn rule(metric: &str, aggregate: Aggregate, bound: f64) -> ThresholdRule {
    ThresholdRule::new(
        metric,
        ThresholdCondition {
            aggregate,
            comparison: Comparison::Lt,
            bound,
        },
    )
}

/// Default pass/fail criteria applied to both scenarios
pub fn default_thresholds() -> Vec<ThresholdRule> {
    vec![
        rule("http_req_failed", Aggregate::Rate, 0.005),
        rule("http_req_duration", Aggregate::Percentile(95.0), 300.0)
            .with_tag("endpoint", "transfer_create"),
        rule("time_to_confirm", Aggregate::Percentile(95.0), 2000.0),
        // server-side failures on the webhook only
        rule("webhook_5xx_rate", Aggregate::Rate, 0.002),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conditions() {
        let c: ThresholdCondition = "rate<0.005".parse().unwrap();
        assert_eq!(c.aggregate, Aggregate::Rate);
        assert_eq!(c.comparison, Comparison::Lt);
        assert_eq!(c.bound, 0.005);

        let c: ThresholdCondition = "p(95) < 300".parse().unwrap();
        assert_eq!(c.aggregate, Aggregate::Percentile(95.0));
        assert!(c.passes(299.9));
        assert!(!c.passes(300.0));

        let c: ThresholdCondition = "count>=10".parse().unwrap();
        assert_eq!(c.comparison, Comparison::Ge);
        assert!(c.passes(10.0));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("rate".parse::<ThresholdCondition>().is_err());
        assert!("p(101)<3".parse::<ThresholdCondition>().is_err());
        assert!("median<3".parse::<ThresholdCondition>().is_err());
        assert!("avg<abc".parse::<ThresholdCondition>().is_err());
        assert!("avg=<3".parse::<ThresholdCondition>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_yaml() {
        let rules = default_thresholds();
        let yaml = serde_yaml::to_string(&rules).unwrap();
        assert!(yaml.contains("p(95)<300"));
        let parsed: Vec<ThresholdRule> = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_rule_label() {
        let rules = default_thresholds();
        assert_eq!(rules[0].label(), "http_req_failed");
        assert_eq!(rules[1].label(), "http_req_duration{endpoint:transfer_create}");
    }
}
