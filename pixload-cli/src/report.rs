//! End-of-run summary

use anyhow::{Context, Result};
use colored::*;
use pixload_engine::metrics::{names, MetricSummary, SeriesSummary, TrendStats};
use pixload_engine::RunReport;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

const WEBHOOK_COUNTERS: [(&str, &str); 6] = [
    (names::WEBHOOK_SUCCESS_COUNT, "success"),
    (names::WEBHOOK_404_COUNT, "404"),
    (names::WEBHOOK_OTHER_4XX_COUNT, "other 4xx"),
    (names::WEBHOOK_5XX_COUNT, "5xx"),
    (names::WEBHOOK_UNCLASSIFIED_COUNT, "unclassified"),
    (names::WEBHOOK_NO_RESPONSE_COUNT, "no response"),
];

pub fn render(report: &RunReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_report(&mut out, report);
    out
}

fn write_report(out: &mut String, report: &RunReport) -> std::fmt::Result {
    let metrics = &report.metrics;

    writeln!(
        out,
        "\n{} {}  {} {}",
        "scenario".bold(),
        report.scenario,
        "run".bold(),
        report.run_id
    )?;
    writeln!(
        out,
        "  setup      source {} -> key {} (wallet {})",
        report.context.source_account_id, report.context.destination_key, report.context.destination_account_id
    )?;

    let load = &report.load;
    writeln!(out, "\n{} ({})", "iterations".bold(), load.shape)?;
    writeln!(
        out,
        "  started {}  completed {}  aborted {}  dropped {}  interrupted {}",
        load.started, load.completed, load.aborted, load.dropped, load.interrupted
    )?;
    writeln!(
        out,
        "  peak active {}  elapsed {}{}",
        load.peak_active,
        humantime_serde::re::humantime::format_duration(load.elapsed),
        if load.cancelled { "  (stopped early)" } else { "" }
    )?;

    writeln!(out, "\n{}", "requests".bold())?;
    writeln!(out, "  http_reqs        {}", counter(metrics.total(names::HTTP_REQS)))?;
    writeln!(out, "  http_req_failed  {}", rate(metrics.total(names::HTTP_REQ_FAILED)))?;
    let endpoints: BTreeSet<&String> = metrics
        .series_of(names::HTTP_REQ_DURATION)
        .filter_map(|s| s.tags.get("endpoint"))
        .collect();
    for endpoint in endpoints {
        let per_status: Vec<&SeriesSummary> = metrics
            .series_of(names::HTTP_REQ_DURATION)
            .filter(|s| s.tags.get("endpoint") == Some(endpoint))
            .collect();
        writeln!(out, "  {:<17}{}", endpoint, merged_trend(&per_status))?;
    }
    if let Some(MetricSummary::Trend(stats)) = metrics.total(names::TIME_TO_CONFIRM) {
        writeln!(out, "  time_to_confirm  {}", trend(stats))?;
    }

    writeln!(out, "\n{}", "webhook outcomes".bold())?;
    for (name, label) in WEBHOOK_COUNTERS {
        writeln!(out, "  {:<14}{}", label, counter(metrics.total(name)))?;
    }
    let mut codes: Vec<(String, u64)> = metrics
        .series_of(names::WEBHOOK_ERROR_CODE_COUNT)
        .filter_map(|s| match s.summary {
            MetricSummary::Counter { count } => Some((
                format!(
                    "{} ({})",
                    s.tags.get("error_code").map(String::as_str).unwrap_or("?"),
                    s.tags.get("status").map(String::as_str).unwrap_or("?")
                ),
                count,
            )),
            _ => None,
        })
        .collect();
    codes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (code, count) in codes.iter().take(10) {
        writeln!(out, "  {} {}", code.dimmed(), count)?;
    }
    writeln!(out, "  samples logged {}", report.samples_emitted)?;

    writeln!(out, "\n{}", "checks".bold())?;
    for series in metrics.series_of(names::CHECKS) {
        if let MetricSummary::Rate { hits, total, .. } = series.summary {
            let name = series.tags.get("check").map(String::as_str).unwrap_or("?");
            let mark = if hits == total { "✓".bright_green() } else { "✗".bright_red() };
            writeln!(out, "  {} {}  {}/{}", mark, name, hits, total)?;
        }
    }

    writeln!(out, "\n{}", "thresholds".bold())?;
    for outcome in &report.thresholds {
        let mark = if outcome.passed {
            "✓".bright_green().bold()
        } else {
            "✗".bright_red().bold()
        };
        writeln!(
            out,
            "  {} {} {}  observed {}",
            mark, outcome.label, outcome.condition, outcome.observed
        )?;
    }

    let verdict = if report.passed() {
        "PASSED".bright_green().bold()
    } else {
        "FAILED".bright_red().bold()
    };
    writeln!(out, "\n{}", verdict)
}

fn counter(summary: Option<&MetricSummary>) -> String {
    match summary {
        Some(MetricSummary::Counter { count }) => count.to_string(),
        _ => "0".to_string(),
    }
}

fn rate(summary: Option<&MetricSummary>) -> String {
    match summary {
        Some(MetricSummary::Rate { hits, total, rate }) => {
            format!("{:.2}% ({} of {})", rate * 100.0, hits, total)
        }
        _ => "-".to_string(),
    }
}

fn trend(stats: &TrendStats) -> String {
    format!(
        "avg={:.1}ms med={:.1}ms p(90)={:.1}ms p(95)={:.1}ms max={:.1}ms",
        stats.avg, stats.med, stats.p90, stats.p95, stats.max
    )
}

/// Per-status series of one endpoint, summarised by the widest view available
fn merged_trend(series: &[&SeriesSummary]) -> String {
    let mut count = 0;
    let mut max: f64 = 0.0;
    let mut weighted = 0.0;
    let mut p95: f64 = 0.0;
    for s in series {
        if let MetricSummary::Trend(stats) = &s.summary {
            count += stats.count;
            max = max.max(stats.max);
            weighted += stats.avg * stats.count as f64;
            p95 = p95.max(stats.p95);
        }
    }
    if count == 0 {
        return "-".to_string();
    }
    format!(
        "avg={:.1}ms p(95)<={:.1}ms max={:.1}ms n={}",
        weighted / count as f64,
        p95,
        max,
        count
    )
}

/// Write the full report as pretty JSON
pub fn export_summary(report: &RunReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create summary directory")?;
        }
    }
    fs::write(path, json).with_context(|| format!("Failed to write summary to {:?}", path))
}
