//! Webhook outcome taxonomy and sample capping over real HTTP

mod support;

use anyhow::Result;
use futures::future::join_all;
use pixload_engine::metrics::{names, InMemoryMetrics};
use pixload_engine::{
    Correlation, FixedPool, LoadShape, OutcomeCategory, OutcomeClassifier, RandomIds, SampleLimiter, ScenarioRunner,
    TargetApi, WebhookConfirmer,
};
use pixload_http::{HttpConfig, HttpManager};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::PaymentService;

async fn confirmer_for(
    service: &PaymentService,
    sampler: Arc<SampleLimiter>,
) -> Result<(WebhookConfirmer, Arc<InMemoryMetrics>)> {
    let metrics = Arc::new(InMemoryMetrics::new());
    let client = Arc::new(HttpManager::new(&service.server.uri(), HttpConfig::default())?);
    let api = TargetApi::new(
        client,
        metrics.clone(),
        Arc::new(RandomIds),
        Correlation::new("classification", "run-e2e"),
    );
    let classifier = OutcomeClassifier::new(metrics.clone(), sampler);
    Ok((
        WebhookConfirmer::new(api, classifier, Duration::from_millis(750)),
        metrics,
    ))
}

#[tokio::test]
async fn test_not_found_counts_error_code() -> Result<()> {
    let service = PaymentService::start()
        .await
        .webhook_responds(404, json!({"code": "TRANSFER_NOT_FOUND", "message": "unknown e2e"}))
        .await;
    let (confirmer, metrics) = confirmer_for(&service, Arc::new(SampleLimiter::new(100.0, 500))).await?;

    let classification = confirmer.confirm_classified("E2E404").await;

    assert_eq!(classification.category, OutcomeCategory::ClientErrorNotFound);
    let sample = classification.sample.expect("sampled at 100%");
    assert_eq!(sample.status, 404);
    assert_eq!(sample.error_code, "TRANSFER_NOT_FOUND");
    assert_eq!(sample.end_to_end_id, "E2E404");

    assert_eq!(metrics.counter(names::WEBHOOK_404_COUNT, &[]), 1);
    assert_eq!(
        metrics.counter(
            names::WEBHOOK_ERROR_CODE_COUNT,
            &[("error_code", "TRANSFER_NOT_FOUND"), ("status", "404")]
        ),
        1
    );
    assert_eq!(metrics.rate(names::WEBHOOK_4XX_RATE, &[]), Some(1.0));
    assert_eq!(metrics.rate(names::WEBHOOK_5XX_RATE, &[]), Some(0.0));
    Ok(())
}

#[tokio::test]
async fn test_server_error_without_code() -> Result<()> {
    let service = PaymentService::start().await.webhook_responds(502, json!({})).await;
    let (confirmer, metrics) = confirmer_for(&service, Arc::new(SampleLimiter::new(0.0, 500))).await?;

    assert!(!confirmer.confirm("E2E502").await);
    assert_eq!(metrics.counter(names::WEBHOOK_5XX_COUNT, &[]), 1);
    assert_eq!(
        metrics.counter(names::WEBHOOK_ERROR_CODE_COUNT, &[("error_code", "none"), ("status", "502")]),
        1
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_failures_respect_sample_cap() -> Result<()> {
    let service = PaymentService::start()
        .await
        .webhook_responds(503, json!({"code": "UNAVAILABLE"}))
        .await;
    let sampler = Arc::new(SampleLimiter::new(100.0, 5));
    let (confirmer, metrics) = confirmer_for(&service, sampler.clone()).await?;
    let confirmer = Arc::new(confirmer);

    let calls = (0..200).map(|i| {
        let confirmer = confirmer.clone();
        async move { confirmer.confirm_classified(&format!("E2E{}", i)).await }
    });
    let outcomes = join_all(calls).await;

    let sampled = outcomes.iter().filter(|c| c.sample.is_some()).count();
    assert_eq!(sampled, 5);
    assert_eq!(sampler.emitted(), 5);
    assert_eq!(metrics.counter(names::WEBHOOK_5XX_COUNT, &[]), 200);
    assert_eq!(metrics.rate(names::WEBHOOK_5XX_RATE, &[]), Some(1.0));
    Ok(())
}

#[tokio::test]
async fn test_failing_webhooks_fail_run_thresholds() -> Result<()> {
    let service = PaymentService::start()
        .await
        .with_setup("baseline")
        .await
        .accepting_transfers(Duration::ZERO)
        .await
        .webhook_responds(500, json!({"code": "INTERNAL"}))
        .await;

    let mut config = service.config("baseline");
    config.sampling.percent = 100.0;
    config.sampling.capacity = 2;

    let shape = LoadShape::FixedPool(FixedPool {
        workers: 2,
        duration: Duration::from_millis(500),
        pacing: Duration::from_millis(50),
        graceful_stop: None,
    });
    let report = ScenarioRunner::new(config).run(&shape).await?;

    assert!(!report.passed());
    assert!(report
        .failed_thresholds()
        .any(|outcome| outcome.label == names::WEBHOOK_5XX_RATE));
    assert_eq!(report.samples_emitted, 2);
    // Confirmation failures never abort the iteration
    assert_eq!(report.load.completed, report.load.started);
    Ok(())
}
