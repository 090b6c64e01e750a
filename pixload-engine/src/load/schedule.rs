//! Arrival-rate ramp arithmetic
//!
//! The rate moves linearly from the previous target (or the start rate) to
//! each stage's target over the stage's duration. The number of iterations
//! that should have started by time `t` is the integral of that rate.

use pixload_config::StageConfig;
use std::time::Duration;

/// One leg of the ramp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampStage {
    pub duration: Duration,
    /// Target rate in iterations per time unit
    pub target: f64,
}

impl From<&StageConfig> for RampStage {
    fn from(stage: &StageConfig) -> Self {
        Self {
            duration: stage.duration,
            target: f64::from(stage.target),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RampSchedule {
    start_rate: f64,
    time_unit: Duration,
    stages: Vec<RampStage>,
}

impl RampSchedule {
    pub fn new(start_rate: f64, time_unit: Duration, stages: Vec<RampStage>) -> Self {
        Self {
            start_rate: start_rate.max(0.0),
            time_unit,
            stages,
        }
    }

    pub fn stages(&self) -> &[RampStage] {
        &self.stages
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|stage| stage.duration).sum()
    }

    fn unit_secs(&self) -> f64 {
        let secs = self.time_unit.as_secs_f64();
        if secs > 0.0 {
            secs
        } else {
            1.0
        }
    }

    /// Index of the stage active at `elapsed`; `None` once the ramp is over
    pub fn stage_at(&self, elapsed: Duration) -> Option<usize> {
        let mut stage_end = Duration::ZERO;
        for (index, stage) in self.stages.iter().enumerate() {
            stage_end += stage.duration;
            if elapsed < stage_end {
                return Some(index);
            }
        }
        None
    }

    /// Instantaneous rate at `elapsed`, in iterations per time unit
    pub fn rate_at(&self, elapsed: Duration) -> f64 {
        let mut from = self.start_rate;
        let mut stage_start = Duration::ZERO;
        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                return from + (stage.target - from) * progress;
            }
            from = stage.target;
            stage_start = stage_end;
        }
        from
    }

    /// Iterations that should have started by `elapsed`
    pub fn cumulative_arrivals(&self, elapsed: Duration) -> f64 {
        let unit = self.unit_secs();
        let mut from = self.start_rate;
        let mut stage_start = Duration::ZERO;
        let mut total = 0.0;

        for stage in &self.stages {
            if elapsed <= stage_start {
                break;
            }
            let length = stage.duration.as_secs_f64();
            if length > 0.0 {
                let t = (elapsed - stage_start).as_secs_f64().min(length);
                let slope = (stage.target - from) / length;
                total += (from * t + slope * t * t / 2.0) / unit;
            }
            from = stage.target;
            stage_start += stage.duration;
        }

        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn stage(duration: Duration, target: f64) -> RampStage {
        RampStage { duration, target }
    }

    #[test]
    fn test_hold_at_start_rate() {
        let schedule = RampSchedule::new(25.0, secs(1), vec![stage(secs(30), 25.0)]);
        assert!((schedule.cumulative_arrivals(secs(30)) - 750.0).abs() < 1e-9);
        assert!((schedule.cumulative_arrivals(secs(10)) - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_ramp_from_zero() {
        let schedule = RampSchedule::new(0.0, secs(1), vec![stage(secs(30), 25.0)]);
        // Triangle under 0 -> 25 over 30s
        assert!((schedule.cumulative_arrivals(secs(30)) - 375.0).abs() < 1e-9);
        assert!((schedule.rate_at(secs(15)) - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_multi_stage_and_time_unit() {
        let schedule = RampSchedule::new(
            0.0,
            secs(60),
            vec![stage(secs(60), 60.0), stage(secs(60), 60.0), stage(secs(60), 0.0)],
        );
        // 60 per minute is one per second
        assert!((schedule.cumulative_arrivals(secs(60)) - 30.0).abs() < 1e-9);
        assert!((schedule.cumulative_arrivals(secs(120)) - 90.0).abs() < 1e-9);
        assert!((schedule.cumulative_arrivals(secs(180)) - 120.0).abs() < 1e-9);
        // Nothing more after the last stage
        assert!((schedule.cumulative_arrivals(secs(500)) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_length_stage_jumps() {
        let schedule = RampSchedule::new(0.0, secs(1), vec![stage(Duration::ZERO, 10.0), stage(secs(10), 10.0)]);
        assert!((schedule.cumulative_arrivals(secs(10)) - 100.0).abs() < 1e-9);
        assert_eq!(schedule.stage_at(secs(0)), Some(1));
    }

    #[test]
    fn test_stage_lookup() {
        let schedule = RampSchedule::new(25.0, secs(1), vec![stage(secs(30), 25.0), stage(secs(60), 50.0)]);
        assert_eq!(schedule.total_duration(), secs(90));
        assert_eq!(schedule.stage_at(secs(0)), Some(0));
        assert_eq!(schedule.stage_at(secs(30)), Some(1));
        assert_eq!(schedule.stage_at(secs(90)), None);
        assert!((schedule.rate_at(secs(60)) - 37.5).abs() < 1e-9);
        assert!((schedule.rate_at(secs(200)) - 50.0).abs() < 1e-9);
    }

    fn stages_strategy() -> impl Strategy<Value = Vec<RampStage>> {
        prop::collection::vec((0u64..120_000, 0u32..500), 1..8).prop_map(|raw| {
            raw.into_iter()
                .map(|(ms, target)| stage(Duration::from_millis(ms), f64::from(target)))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn cumulative_arrivals_never_decrease(
            start in 0u32..500,
            stages in stages_strategy(),
            a in 0u64..1_000_000,
            b in 0u64..1_000_000,
        ) {
            let schedule = RampSchedule::new(f64::from(start), secs(1), stages);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let early = schedule.cumulative_arrivals(Duration::from_millis(lo));
            let late = schedule.cumulative_arrivals(Duration::from_millis(hi));
            prop_assert!(early >= 0.0);
            prop_assert!(late + 1e-9 >= early);
        }

        #[test]
        fn cumulative_arrivals_match_trapezoids(
            start in 0u32..500,
            stages in stages_strategy(),
        ) {
            let schedule = RampSchedule::new(f64::from(start), secs(1), stages.clone());
            let mut from = f64::from(start);
            let mut expected = 0.0;
            for s in &stages {
                expected += (from + s.target) / 2.0 * s.duration.as_secs_f64();
                from = s.target;
            }
            let actual = schedule.cumulative_arrivals(schedule.total_duration());
            prop_assert!((actual - expected).abs() < 1e-6 * expected.max(1.0));
        }
    }
}
