//! In-process metrics store

use super::{MetricValue, MetricsSink};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

type Tags = BTreeMap<String, String>;

#[derive(Debug, Clone)]
pub(super) enum Series {
    Counter(u64),
    Rate { hits: u64, total: u64 },
    Trend(Vec<f64>),
}

impl Series {
    fn from_value(value: MetricValue) -> Self {
        match value {
            MetricValue::Counter(n) => Series::Counter(n),
            MetricValue::Rate(hit) => Series::Rate {
                hits: u64::from(hit),
                total: 1,
            },
            MetricValue::Trend(v) => Series::Trend(vec![v]),
        }
    }

    /// Apply a sample; false when the sample kind does not match the series
    fn apply(&mut self, value: MetricValue) -> bool {
        match (self, value) {
            (Series::Counter(count), MetricValue::Counter(n)) => *count += n,
            (Series::Rate { hits, total }, MetricValue::Rate(hit)) => {
                *hits += u64::from(hit);
                *total += 1;
            }
            (Series::Trend(values), MetricValue::Trend(v)) => values.push(v),
            _ => return false,
        }
        true
    }

    fn merge(&mut self, other: &Series) {
        match (self, other) {
            (Series::Counter(a), Series::Counter(b)) => *a += b,
            (Series::Rate { hits, total }, Series::Rate { hits: h, total: t }) => {
                *hits += h;
                *total += t;
            }
            (Series::Trend(a), Series::Trend(b)) => a.extend_from_slice(b),
            _ => {}
        }
    }

    fn summarize(&self) -> MetricSummary {
        match self {
            Series::Counter(count) => MetricSummary::Counter { count: *count },
            Series::Rate { hits, total } => MetricSummary::Rate {
                hits: *hits,
                total: *total,
                rate: ratio(*hits, *total),
            },
            Series::Trend(values) => MetricSummary::Trend(TrendStats::from_values(values)),
        }
    }
}

fn ratio(hits: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

fn matches(tags: &Tags, filter: &[(&str, &str)]) -> bool {
    filter
        .iter()
        .all(|(key, value)| tags.get(*key).is_some_and(|v| v == value))
}

/// Summary statistics of a trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub med: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    #[serde(skip)]
    sorted: Vec<f64>,
}

impl TrendStats {
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        sorted.sort_unstable_by(f64::total_cmp);

        let count = sorted.len();
        let avg = if count == 0 {
            0.0
        } else {
            sorted.iter().sum::<f64>() / count as f64
        };

        Self {
            count,
            min: sorted.first().copied().unwrap_or(0.0),
            max: sorted.last().copied().unwrap_or(0.0),
            avg,
            med: interpolate(&sorted, 50.0),
            p90: interpolate(&sorted, 90.0),
            p95: interpolate(&sorted, 95.0),
            p99: interpolate(&sorted, 99.0),
            sorted,
        }
    }

    /// Percentile in 0..=100 with linear interpolation between ranks
    pub fn percentile(&self, p: f64) -> f64 {
        interpolate(&self.sorted, p)
    }
}

fn interpolate(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lower = rank.floor() as usize;
            let upper = rank.ceil() as usize;
            let weight = rank - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

/// Aggregated view of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MetricSummary {
    Counter { count: u64 },
    Rate { hits: u64, total: u64, rate: f64 },
    Trend(TrendStats),
}

/// One tagged series in a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub summary: MetricSummary,
}

/// Point-in-time copy of every metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Per metric name, merged across all tag sets
    pub totals: BTreeMap<String, MetricSummary>,
    pub series: Vec<SeriesSummary>,
}

impl MetricsSnapshot {
    pub fn total(&self, name: &str) -> Option<&MetricSummary> {
        self.totals.get(name)
    }

    pub fn series_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a SeriesSummary> + 'a {
        self.series.iter().filter(move |s| s.name == name)
    }
}

/// Mutex-guarded map of tagged series
///
/// Queries take a tag filter and aggregate every series of the metric whose
/// tags contain all filter pairs, so `http_req_failed` with no filter covers
/// every endpoint.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    series: Mutex<HashMap<String, BTreeMap<Tags, Series>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(super) fn merged(&self, name: &str, filter: &[(&str, &str)]) -> Option<Series> {
        let series = self.series.lock();
        let mut merged: Option<Series> = None;
        for (_, s) in series.get(name)?.iter().filter(|(tags, _)| matches(tags, filter)) {
            match merged.as_mut() {
                Some(m) => m.merge(s),
                None => merged = Some(s.clone()),
            }
        }
        merged
    }

    /// Counter sum; zero when nothing was recorded
    pub fn counter(&self, name: &str, filter: &[(&str, &str)]) -> u64 {
        match self.merged(name, filter) {
            Some(Series::Counter(count)) => count,
            _ => 0,
        }
    }

    /// Hits and total samples of a rate
    pub fn rate_counts(&self, name: &str, filter: &[(&str, &str)]) -> (u64, u64) {
        match self.merged(name, filter) {
            Some(Series::Rate { hits, total }) => (hits, total),
            _ => (0, 0),
        }
    }

    /// Fraction of hits; `None` without samples
    pub fn rate(&self, name: &str, filter: &[(&str, &str)]) -> Option<f64> {
        match self.rate_counts(name, filter) {
            (_, 0) => None,
            (hits, total) => Some(ratio(hits, total)),
        }
    }

    pub fn trend(&self, name: &str, filter: &[(&str, &str)]) -> Option<TrendStats> {
        match self.merged(name, filter) {
            Some(Series::Trend(values)) if !values.is_empty() => Some(TrendStats::from_values(&values)),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let series = self.series.lock();
        let mut snapshot = MetricsSnapshot::default();

        let mut names: Vec<&String> = series.keys().collect();
        names.sort();

        for name in names {
            let mut total: Option<Series> = None;
            for (tags, s) in &series[name] {
                snapshot.series.push(SeriesSummary {
                    name: name.clone(),
                    tags: tags.clone(),
                    summary: s.summarize(),
                });
                match total.as_mut() {
                    Some(t) => t.merge(s),
                    None => total = Some(s.clone()),
                }
            }
            if let Some(total) = total {
                snapshot.totals.insert(name.clone(), total.summarize());
            }
        }

        snapshot
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record(&self, name: &str, value: MetricValue, tags: &[(&str, &str)]) {
        let tags: Tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut series = self.series.lock();
        let by_tags = series.entry(name.to_string()).or_default();

        match by_tags.get_mut(&tags) {
            Some(existing) => {
                if !existing.apply(value) {
                    warn!("Ignoring {:?} sample for metric {} of a different kind", value, name);
                }
            }
            None => {
                by_tags.insert(tags, Series::from_value(value));
            }
        }
    }
}
