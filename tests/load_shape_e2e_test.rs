//! Arrival-rate ramps over real HTTP, including a saturated pool

mod support;

use anyhow::Result;
use pixload_config::StageConfig;
use pixload_engine::metrics::{names, MetricSummary};
use pixload_engine::{LoadShape, ScenarioRunner, ShutdownCoordinator};
use serde_json::json;
use std::time::{Duration, Instant};
use support::PaymentService;

async fn healthy_service(transfer_delay: Duration) -> PaymentService {
    PaymentService::start()
        .await
        .with_setup("stress")
        .await
        .accepting_transfers(transfer_delay)
        .await
        .webhook_responds(200, json!({}))
        .await
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_ramp_starts_scheduled_arrivals() -> Result<()> {
    let service = healthy_service(Duration::ZERO).await;

    let mut config = service.config("stress");
    config.load.stress.start_rate = 20;
    config.load.stress.time_unit = Duration::from_secs(1);
    config.load.stress.pre_allocated_workers = 10;
    config.load.stress.max_workers = 100;
    config.load.stress.stages = vec![
        StageConfig::new(Duration::from_secs(1), 20),
        StageConfig::new(Duration::from_secs(1), 40),
    ];
    config.load.stress.graceful_stop = Some(Duration::from_secs(5));

    let shape = LoadShape::from(&config.load.stress);
    let report = ScenarioRunner::new(config).run(&shape).await?;

    // 20 in the first second, (20 + 40) / 2 in the second
    assert_eq!(report.load.started + report.load.dropped, 50);
    assert_eq!(report.load.dropped, 0);
    assert_eq!(report.load.completed, 50);
    assert!(report.passed(), "thresholds: {:?}", report.thresholds);

    match report.metrics.total(names::ITERATIONS) {
        Some(MetricSummary::Counter { count }) => assert_eq!(*count, 50),
        other => panic!("iterations missing: {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_saturated_pool_drops_instead_of_queueing() -> Result<()> {
    let service = healthy_service(Duration::from_millis(400)).await;

    let mut config = service.config("stress");
    config.load.stress.start_rate = 20;
    config.load.stress.pre_allocated_workers = 2;
    config.load.stress.max_workers = 2;
    config.load.stress.stages = vec![StageConfig::new(Duration::from_secs(1), 20)];
    config.load.stress.graceful_stop = Some(Duration::from_secs(5));

    let shape = LoadShape::from(&config.load.stress);
    let report = ScenarioRunner::new(config).run(&shape).await?;

    assert_eq!(report.load.started + report.load.dropped, 20);
    assert!(report.load.started <= 6, "started {}", report.load.started);
    assert!(report.load.dropped >= 14, "dropped {}", report.load.dropped);
    assert!(report.load.peak_active <= 2);

    match report.metrics.total(names::DROPPED_ITERATIONS) {
        Some(MetricSummary::Counter { count }) => assert_eq!(*count, report.load.dropped),
        other => panic!("dropped_iterations missing: {other:?}"),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_signal_ends_ramp_early() -> Result<()> {
    let service = healthy_service(Duration::ZERO).await;

    let mut config = service.config("stress");
    config.load.stress.start_rate = 10;
    config.load.stress.stages = vec![StageConfig::new(Duration::from_secs(60), 10)];

    let shutdown = ShutdownCoordinator::new();
    let stopper = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(800)).await;
            shutdown.shutdown();
        })
    };

    let start = Instant::now();
    let shape = LoadShape::from(&config.load.stress);
    let report = ScenarioRunner::new(config)
        .with_shutdown(shutdown)
        .run(&shape)
        .await?;
    stopper.await?;

    assert!(report.load.cancelled);
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(report.load.started < 60);
    assert_eq!(report.load.interrupted, 0);
    Ok(())
}
