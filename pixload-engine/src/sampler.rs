//! Bounded, probabilistic sampling of webhook failures into the log

use pixload_config::domains::logging::SAMPLE_LOG_TARGET;
use pixload_config::SamplingConfig;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;

/// A failure record that passed the sampler
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub status: u16,
    pub end_to_end_id: String,
    pub error_code: String,
    pub message: String,
}

/// Process-wide gate on diagnostic failure records
///
/// `emitted` only grows and never passes `capacity`: a slot is claimed with a
/// compare-and-swap that refuses to increment once the cap is reached, so
/// concurrent offers cannot overshoot.
#[derive(Debug)]
pub struct SampleLimiter {
    emitted: AtomicUsize,
    capacity: usize,
    percent: f64,
}

impl SampleLimiter {
    pub fn new(percent: f64, capacity: usize) -> Self {
        Self {
            emitted: AtomicUsize::new(0),
            capacity,
            percent: if percent.is_finite() { percent.clamp(0.0, 100.0) } else { 0.0 },
        }
    }

    pub fn from_config(config: &SamplingConfig) -> Self {
        Self::new(config.percent, config.capacity)
    }

    pub fn emitted(&self) -> usize {
        self.emitted.load(Ordering::Acquire)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Offer a failure; returns the sample when it was accepted and logged
    pub fn offer(&self, status: u16, end_to_end_id: &str, error_code: &str, message: &str) -> Option<Sample> {
        let draw: f64 = rand::random::<f64>() * 100.0;
        self.offer_with_draw(draw, status, end_to_end_id, error_code, message)
    }

    fn offer_with_draw(
        &self,
        draw: f64,
        status: u16,
        end_to_end_id: &str,
        error_code: &str,
        message: &str,
    ) -> Option<Sample> {
        if self.emitted.load(Ordering::Acquire) >= self.capacity {
            return None;
        }
        // Strict comparison: a percent of 0 never accepts
        if draw >= self.percent {
            return None;
        }

        self.emitted
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |emitted| {
                (emitted < self.capacity).then_some(emitted + 1)
            })
            .ok()?;

        warn!(
            target: SAMPLE_LOG_TARGET,
            status,
            code = error_code,
            e2e = end_to_end_id,
            msg = message,
            "[webhook-fail] status={} code={} e2e={} msg={}",
            status,
            error_code,
            end_to_end_id,
            message
        );

        Some(Sample {
            status,
            end_to_end_id: end_to_end_id.to_string(),
            error_code: error_code.to_string(),
            message: message.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[test]
    fn test_capacity_holds_under_concurrency() {
        for _ in 0..5 {
            let limiter = Arc::new(SampleLimiter::new(100.0, 500));
            let accepted = Arc::new(AtomicUsize::new(0));

            let handles: Vec<_> = (0..10)
                .map(|_| {
                    let limiter = limiter.clone();
                    let accepted = accepted.clone();
                    std::thread::spawn(move || {
                        for _ in 0..1_000 {
                            if limiter.offer(503, "E2E", "DOWN", "m").is_some() {
                                accepted.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert_eq!(limiter.emitted(), 500);
            assert_eq!(accepted.load(Ordering::Relaxed), 500);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_capacity_holds_across_tasks() {
        let limiter = Arc::new(SampleLimiter::new(50.0, 500));
        let tasks: Vec<_> = (0..10_000)
            .map(|i| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.offer(500, &format!("E2E{i}"), "none", "").is_some() })
            })
            .collect();

        let mut accepted = 0;
        for task in tasks {
            if task.await.unwrap() {
                accepted += 1;
            }
        }
        assert!(accepted <= 500);
        assert_eq!(accepted, limiter.emitted());
    }

    #[test]
    fn test_zero_percent_never_samples() {
        let limiter = SampleLimiter::new(0.0, 500);
        for _ in 0..10_000 {
            assert!(limiter.offer(404, "E2E", "NOT_FOUND", "").is_none());
        }
        assert_eq!(limiter.emitted(), 0);

        // Even the lowest possible draw is rejected
        assert!(limiter.offer_with_draw(0.0, 404, "E2E", "NOT_FOUND", "").is_none());
    }

    #[test]
    fn test_draw_against_percent() {
        let limiter = SampleLimiter::new(5.0, 10);
        assert!(limiter.offer_with_draw(4.99, 503, "E2E1", "DOWN", "m").is_some());
        assert!(limiter.offer_with_draw(5.0, 503, "E2E2", "DOWN", "m").is_none());

        let sample = limiter.offer_with_draw(0.0, 503, "E2E3", "DOWN", "m").unwrap();
        assert_eq!(sample.message, "m");
        assert_eq!(sample.error_code, "DOWN");
        assert_eq!(limiter.emitted(), 2);
    }

    #[test]
    fn test_full_budget_drops_before_draw() {
        let limiter = SampleLimiter::new(100.0, 1);
        assert!(limiter.offer(500, "a", "none", "").is_some());
        assert!(limiter.offer(500, "b", "none", "").is_none());
        assert_eq!(limiter.emitted(), 1);
        assert_eq!(limiter.capacity(), 1);
    }
}
