//! Load shaping
//!
//! [`LoadController`] turns a [`LoadShape`] into running iterations. A fixed
//! pool keeps `workers` tasks iterating back-to-back; a ramp starts new
//! iterations at a time-varying rate onto a bounded pool and drops arrivals
//! that find the pool full.

mod fixed;
mod ramp;
pub mod schedule;

pub use schedule::{RampSchedule, RampStage};

use crate::error::{EngineError, EngineResult};
use crate::metrics::{names, MetricsSink};
use crate::shutdown::ShutdownCoordinator;
use async_trait::async_trait;
use pixload_config::{BaselineConfig, StressConfig};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// How a single iteration ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationOutcome {
    /// Transfer created and its confirmation attempted
    Completed,
    /// Returned early, no confirmation sent
    Aborted,
}

impl IterationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationOutcome::Completed => "completed",
            IterationOutcome::Aborted => "aborted",
        }
    }
}

/// The body every worker executes
#[async_trait]
pub trait Workload: Send + Sync + 'static {
    async fn run_iteration(&self) -> IterationOutcome;
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixedPool {
    pub workers: usize,
    pub duration: Duration,
    pub pacing: Duration,
    pub graceful_stop: Option<Duration>,
}

impl From<&BaselineConfig> for FixedPool {
    fn from(config: &BaselineConfig) -> Self {
        Self {
            workers: config.workers,
            duration: config.duration,
            pacing: config.pacing,
            graceful_stop: config.graceful_stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RampingArrivalRate {
    pub schedule: RampSchedule,
    pub pre_allocated: usize,
    pub max_workers: usize,
    pub graceful_stop: Option<Duration>,
}

impl From<&StressConfig> for RampingArrivalRate {
    fn from(config: &StressConfig) -> Self {
        Self {
            schedule: RampSchedule::new(
                f64::from(config.start_rate),
                config.time_unit,
                config.stages.iter().map(RampStage::from).collect(),
            ),
            pre_allocated: config.pre_allocated_workers,
            max_workers: config.max_workers,
            graceful_stop: config.graceful_stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadShape {
    FixedPool(FixedPool),
    Ramp(RampingArrivalRate),
}

impl LoadShape {
    pub fn name(&self) -> &'static str {
        match self {
            LoadShape::FixedPool(_) => "fixed-pool",
            LoadShape::Ramp(_) => "ramping-arrival-rate",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            LoadShape::FixedPool(pool) => pool.duration,
            LoadShape::Ramp(ramp) => ramp.schedule.total_duration(),
        }
    }

    pub fn validate(&self) -> EngineResult<()> {
        match self {
            LoadShape::FixedPool(pool) if pool.workers == 0 => {
                Err(EngineError::InvalidShape("fixed pool needs at least one worker".into()))
            }
            LoadShape::Ramp(ramp) if ramp.max_workers == 0 => {
                Err(EngineError::InvalidShape("ramp needs a pool of at least one worker".into()))
            }
            LoadShape::Ramp(ramp) if ramp.schedule.stages().is_empty() => {
                Err(EngineError::InvalidShape("ramp has no stages".into()))
            }
            _ => Ok(()),
        }
    }
}

impl From<&BaselineConfig> for LoadShape {
    fn from(config: &BaselineConfig) -> Self {
        LoadShape::FixedPool(config.into())
    }
}

impl From<&StressConfig> for LoadShape {
    fn from(config: &StressConfig) -> Self {
        LoadShape::Ramp(config.into())
    }
}

/// Iteration accounting for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub shape: String,
    pub started: u64,
    pub completed: u64,
    pub aborted: u64,
    /// Arrivals that found the pool full
    pub dropped: u64,
    /// Still running when the graceful stop ran out
    pub interrupted: u64,
    pub peak_active: usize,
    /// Stopped early by an external signal
    pub cancelled: bool,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct Tally {
    started: AtomicU64,
    completed: AtomicU64,
    aborted: AtomicU64,
    dropped: AtomicU64,
    peak_active: AtomicUsize,
}

/// What a spawned task needs to run and account for one iteration
#[derive(Clone)]
struct Dispatch {
    workload: Arc<dyn Workload>,
    metrics: Arc<dyn MetricsSink>,
    shutdown: ShutdownCoordinator,
    tally: Arc<Tally>,
}

impl Dispatch {
    async fn run_one(&self) {
        let guard = self.shutdown.track();
        self.tally.started.fetch_add(1, Ordering::Relaxed);
        self.tally
            .peak_active
            .fetch_max(self.shutdown.in_flight(), Ordering::Relaxed);

        let outcome = self.workload.run_iteration().await;
        drop(guard);

        let counter = match outcome {
            IterationOutcome::Completed => &self.tally.completed,
            IterationOutcome::Aborted => &self.tally.aborted,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .increment(names::ITERATIONS, &[("outcome", outcome.as_str())]);
    }

    fn record_drop(&self) {
        self.tally.dropped.fetch_add(1, Ordering::Relaxed);
        self.metrics.increment(names::DROPPED_ITERATIONS, &[]);
    }

    fn report(&self, shape: &LoadShape, interrupted: u64, elapsed: Duration) -> LoadReport {
        let started = self.tally.started.load(Ordering::SeqCst);
        let completed = self.tally.completed.load(Ordering::SeqCst);
        let aborted = self.tally.aborted.load(Ordering::SeqCst);
        LoadReport {
            shape: shape.name().to_string(),
            started,
            completed,
            aborted,
            dropped: self.tally.dropped.load(Ordering::SeqCst),
            interrupted: interrupted.max(started.saturating_sub(completed + aborted)),
            peak_active: self.tally.peak_active.load(Ordering::SeqCst),
            cancelled: self.shutdown.is_shutting_down(),
            elapsed,
        }
    }
}

/// Drives iterations according to a load shape
pub struct LoadController {
    metrics: Arc<dyn MetricsSink>,
    shutdown: ShutdownCoordinator,
}

impl LoadController {
    pub fn new(metrics: Arc<dyn MetricsSink>, shutdown: ShutdownCoordinator) -> Self {
        Self { metrics, shutdown }
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    pub async fn run(&self, shape: &LoadShape, workload: Arc<dyn Workload>) -> EngineResult<LoadReport> {
        shape.validate()?;

        let dispatch = Dispatch {
            workload,
            metrics: self.metrics.clone(),
            shutdown: self.shutdown.clone(),
            tally: Arc::new(Tally::default()),
        };

        info!(shape = shape.name(), duration = ?shape.duration(), "Starting load");
        let start = tokio::time::Instant::now();

        let mut tasks = JoinSet::new();
        let graceful_stop = match shape {
            LoadShape::FixedPool(pool) => {
                fixed::drive(pool, &dispatch, &mut tasks).await;
                pool.graceful_stop
            }
            LoadShape::Ramp(ramp) => {
                ramp::drive(ramp, &dispatch, &mut tasks).await;
                ramp.graceful_stop
            }
        };

        let interrupted = drain(&mut tasks, graceful_stop).await;
        let report = dispatch.report(shape, interrupted, start.elapsed());

        info!(
            started = report.started,
            completed = report.completed,
            aborted = report.aborted,
            dropped = report.dropped,
            interrupted = report.interrupted,
            "Load finished after {:?}",
            report.elapsed
        );
        Ok(report)
    }
}

/// Wait for outstanding iterations; returns how many had to be abandoned
///
/// The limit covers every task still in the set, including arrivals spawned
/// on the last tick that have not been polled yet.
async fn drain(tasks: &mut JoinSet<()>, graceful_stop: Option<Duration>) -> u64 {
    let Some(limit) = graceful_stop else {
        join_all(tasks).await;
        return 0;
    };

    if tokio::time::timeout(limit, join_all(tasks)).await.is_ok() {
        return 0;
    }

    tasks.abort_all();
    let mut interrupted = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Err(e) if e.is_cancelled() => interrupted += 1,
            Err(e) => warn!("Iteration task panicked: {}", e),
            Ok(()) => {}
        }
    }
    warn!(interrupted, "Graceful stop of {:?} expired, abandoned in-flight iterations", limit);
    interrupted
}

async fn join_all(tasks: &mut JoinSet<()>) {
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            if e.is_panic() {
                warn!("Iteration task panicked: {}", e);
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InMemoryMetrics;

    #[test]
    fn test_shapes_from_config() {
        let baseline = BaselineConfig::default();
        let shape = LoadShape::from(&baseline);
        assert_eq!(shape.name(), "fixed-pool");
        assert_eq!(shape.duration(), baseline.duration);

        let stress = StressConfig::default();
        let shape = LoadShape::from(&stress);
        assert_eq!(shape.duration(), stress.total_duration());
        match shape {
            LoadShape::Ramp(ramp) => {
                assert_eq!(ramp.max_workers, stress.max_workers);
                assert_eq!(ramp.schedule.stages().len(), stress.stages.len());
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_shapes_rejected() {
        let controller = LoadController::new(Arc::new(InMemoryMetrics::new()), ShutdownCoordinator::new());
        let workload = Arc::new(test_support::SleepyWorkload::new(Duration::ZERO));

        let empty_pool = LoadShape::FixedPool(FixedPool {
            workers: 0,
            duration: Duration::from_secs(1),
            pacing: Duration::ZERO,
            graceful_stop: None,
        });
        assert!(matches!(
            controller.run(&empty_pool, workload.clone()).await,
            Err(EngineError::InvalidShape(_))
        ));

        let no_stages = LoadShape::Ramp(RampingArrivalRate {
            schedule: RampSchedule::new(10.0, Duration::from_secs(1), vec![]),
            pre_allocated: 1,
            max_workers: 1,
            graceful_stop: None,
        });
        assert!(controller.run(&no_stages, workload).await.is_err());
    }

    #[test]
    fn test_report_serializes_elapsed_humanized() {
        let report = LoadReport {
            shape: "fixed-pool".into(),
            elapsed: Duration::from_secs(90),
            ..Default::default()
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["elapsed"], "1m 30s");
        assert_eq!(value["dropped"], 0);
    }
}
