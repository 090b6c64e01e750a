//! Load shapes for the two traffic models

use crate::error::ConfigResult;
use crate::validation::{validate_positive, Validatable};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Load shape configuration for both scenarios
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoadConfig {
    /// Constant concurrency model
    #[serde(default)]
    pub baseline: BaselineConfig,

    /// Ramping arrival-rate model
    #[serde(default)]
    pub stress: StressConfig,
}

/// Fixed pool of workers iterating back-to-back
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    /// Number of concurrent workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Total scenario duration
    #[serde(with = "humantime_serde", default = "default_baseline_duration")]
    pub duration: Duration,

    /// Think time inserted after each iteration
    #[serde(with = "humantime_serde", default = "default_pacing")]
    pub pacing: Duration,

    /// Upper bound on waiting for in-flight iterations once the duration elapses
    #[serde(with = "humantime_serde", default, skip_serializing_if = "Option::is_none")]
    pub graceful_stop: Option<Duration>,
}

/// Open-model arrival-rate ramp over a bounded worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    /// Arrival rate at the start of the first stage, per `time_unit`
    #[serde(default = "default_start_rate")]
    pub start_rate: u32,

    /// Unit that stage targets and `start_rate` are expressed in
    #[serde(with = "humantime_serde", default = "default_time_unit")]
    pub time_unit: Duration,

    /// Workers made available before the ramp starts
    #[serde(default = "default_pre_allocated_workers")]
    pub pre_allocated_workers: usize,

    /// Hard ceiling on concurrently running iterations
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Ramp stages, executed in order
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,

    /// Upper bound on waiting for in-flight iterations after the last stage
    #[serde(with = "humantime_serde", default, skip_serializing_if = "Option::is_none")]
    pub graceful_stop: Option<Duration>,
}

/// One ramp stage: reach `target` arrivals per time unit by the end of `duration`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    pub target: u32,
}

impl StageConfig {
    pub fn new(duration: Duration, target: u32) -> Self {
        Self { duration, target }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            duration: default_baseline_duration(),
            pacing: default_pacing(),
            graceful_stop: None,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            start_rate: default_start_rate(),
            time_unit: default_time_unit(),
            pre_allocated_workers: default_pre_allocated_workers(),
            max_workers: default_max_workers(),
            stages: default_stages(),
            graceful_stop: None,
        }
    }
}

impl StressConfig {
    /// Total wall-clock length of all stages
    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }
}

impl Validatable for LoadConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.baseline.validate()?;
        self.stress.validate()?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load"
    }
}

impl Validatable for BaselineConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.workers, "workers", self.domain_name())?;
        validate_positive(self.duration.as_millis(), "duration", self.domain_name())?;
        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load.baseline"
    }
}

impl Validatable for StressConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_positive(self.time_unit.as_millis(), "time_unit", self.domain_name())?;
        validate_positive(self.max_workers, "max_workers", self.domain_name())?;

        if self.pre_allocated_workers > self.max_workers {
            return Err(self.validation_error(format!(
                "pre_allocated_workers ({}) cannot exceed max_workers ({})",
                self.pre_allocated_workers, self.max_workers
            )));
        }

        if self.stages.is_empty() {
            return Err(self.validation_error("at least one stage must be configured"));
        }

        if self.total_duration().is_zero() {
            return Err(self.validation_error("stages must span a non-zero duration"));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "load.stress"
    }
}

// Default value functions
fn default_workers() -> usize {
    30
}

fn default_baseline_duration() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_pacing() -> Duration {
    Duration::from_millis(500)
}

fn default_start_rate() -> u32 {
    25
}

fn default_time_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_pre_allocated_workers() -> usize {
    50
}

fn default_max_workers() -> usize {
    500
}

fn default_stages() -> Vec<StageConfig> {
    let minute = Duration::from_secs(60);
    vec![
        // warm-up
        StageConfig::new(Duration::from_secs(30), 25),
        StageConfig::new(minute, 50),
        StageConfig::new(minute, 100),
        StageConfig::new(minute, 150),
        StageConfig::new(minute, 200),
        StageConfig::new(minute, 250),
        StageConfig::new(minute, 300),
    ]
}
