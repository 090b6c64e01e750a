//! End-to-end scenario execution

use crate::api::{Correlation, TargetApi};
use crate::bootstrap::{ScenarioBootstrapper, ScenarioContext};
use crate::classifier::OutcomeClassifier;
use crate::error::EngineResult;
use crate::ids::{mint_run_id, IdGenerator, RandomIds};
use crate::iteration::TransferIteration;
use crate::load::{LoadController, LoadReport, LoadShape};
use crate::metrics::{evaluate_thresholds, InMemoryMetrics, MetricsSnapshot, ThresholdOutcome};
use crate::sampler::SampleLimiter;
use crate::shutdown::ShutdownCoordinator;
use crate::transfer::TransferRequestBuilder;
use crate::webhook::WebhookConfirmer;
use pixload_config::PixloadConfig;
use pixload_http::{HttpClient, HttpManager};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub run_id: String,
    pub context: ScenarioContext,
    pub load: LoadReport,
    pub samples_emitted: usize,
    pub thresholds: Vec<ThresholdOutcome>,
    pub metrics: MetricsSnapshot,
}

impl RunReport {
    /// True when no threshold failed
    pub fn passed(&self) -> bool {
        self.thresholds.iter().all(|outcome| outcome.passed)
    }

    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|outcome| !outcome.passed)
    }
}

/// Sets up a scenario, drives the load shape and evaluates thresholds
pub struct ScenarioRunner {
    config: PixloadConfig,
    client: Option<Arc<dyn HttpClient>>,
    ids: Arc<dyn IdGenerator>,
    shutdown: ShutdownCoordinator,
}

impl ScenarioRunner {
    pub fn new(config: PixloadConfig) -> Self {
        Self {
            config,
            client: None,
            ids: Arc::new(RandomIds),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Use this transport instead of connecting to `target.base_url`
    pub fn with_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownCoordinator) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &PixloadConfig {
        &self.config
    }

    pub fn shutdown(&self) -> &ShutdownCoordinator {
        &self.shutdown
    }

    pub async fn run(&self, shape: &LoadShape) -> EngineResult<RunReport> {
        self.config.validate_all()?;
        shape.validate()?;

        let client: Arc<dyn HttpClient> = match &self.client {
            Some(client) => client.clone(),
            None => Arc::new(HttpManager::new(
                &self.config.target.base_url,
                self.config.http.clone().into(),
            )?),
        };

        let scenario = self.config.target.scenario_name.clone();
        let run_id = self.config.target.run_id.clone().unwrap_or_else(mint_run_id);
        let metrics = Arc::new(InMemoryMetrics::new());
        let api = TargetApi::new(
            client,
            metrics.clone(),
            self.ids.clone(),
            Correlation::new(scenario.as_str(), run_id.as_str()),
        );

        info!(
            scenario = %scenario,
            run_id = %run_id,
            base_url = %self.config.target.base_url,
            shape = shape.name(),
            "Setting up scenario"
        );
        let context = ScenarioBootstrapper::new(api.clone(), self.config.transfer.initial_balance.as_str())
            .setup()
            .await?;

        let sampler = Arc::new(SampleLimiter::from_config(&self.config.sampling));
        let classifier = OutcomeClassifier::new(metrics.clone(), sampler.clone());
        let iteration = TransferIteration::new(
            Arc::new(context.clone()),
            TransferRequestBuilder::new(api.clone()),
            WebhookConfirmer::new(api, classifier, self.config.transfer.webhook_skew),
            metrics.clone(),
            self.config.transfer.amount.as_str(),
        );

        let load = LoadController::new(metrics.clone(), self.shutdown.clone())
            .run(shape, Arc::new(iteration))
            .await?;

        let thresholds = evaluate_thresholds(&metrics, &self.config.thresholds);
        for outcome in thresholds.iter().filter(|outcome| !outcome.passed) {
            warn!(
                threshold = %outcome.label,
                condition = %outcome.condition,
                observed = %outcome.observed,
                "Threshold crossed"
            );
        }

        Ok(RunReport {
            scenario,
            run_id,
            context,
            load,
            samples_emitted: sampler.emitted(),
            thresholds,
            metrics: metrics.snapshot(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, SetupError};
    use crate::ids::SequentialIds;
    use crate::load::FixedPool;
    use crate::metrics::{names, MetricSummary};
    use pixload_config::{ThresholdCondition, ThresholdRule};
    use pixload_http::{HttpMethod, MockHttpClient};
    use std::time::Duration;

    fn healthy_service() -> Arc<MockHttpClient> {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_sequence(
            HttpMethod::Post,
            "/wallets",
            vec![(201, r#"{"id":"wallet-a"}"#.into()), (201, r#"{"id":"wallet-b"}"#.into())],
        );
        mock.add_mock(HttpMethod::Post, "/wallets/*/pix-keys", 201, r#"{"value":"key-b"}"#);
        mock.add_mock(HttpMethod::Post, "/wallets/*/deposit", 200, "{}");
        mock.add_mock(
            HttpMethod::Post,
            "/pix/transfers",
            201,
            r#"{"endToEndId":"E2E1","status":"PENDING"}"#,
        );
        mock
    }

    fn short_pool() -> LoadShape {
        LoadShape::FixedPool(FixedPool {
            workers: 2,
            duration: Duration::from_secs(1),
            pacing: Duration::from_millis(250),
            graceful_stop: None,
        })
    }

    fn config() -> PixloadConfig {
        let mut config = PixloadConfig::default();
        config.target.scenario_name = "baseline".into();
        config.target.run_id = Some("run-test".into());
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_passes_against_healthy_service() {
        let mock = healthy_service();
        mock.add_mock(HttpMethod::Post, "/pix/webhook", 200, "{}");

        let report = ScenarioRunner::new(config())
            .with_client(mock.clone())
            .with_ids(Arc::new(SequentialIds::new("id")))
            .run(&short_pool())
            .await
            .unwrap();

        assert!(report.passed(), "{:?}", report.thresholds);
        assert_eq!(report.run_id, "run-test");
        assert_eq!(report.context.destination_key, "key-b");
        assert_eq!(report.load.started, 8);
        assert_eq!(report.load.completed, 8);
        assert_eq!(mock.requests_to("/pix/webhook").len(), 8);

        let headers = &mock.requests()[0];
        assert_eq!(headers.header("X-Scenario"), Some("baseline"));
        assert_eq!(headers.header("X-Run-Id"), Some("run-test"));

        match report.metrics.total(names::WEBHOOK_SUCCESS_COUNT) {
            Some(MetricSummary::Counter { count }) => assert_eq!(*count, 8),
            other => panic!("unexpected summary {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_webhooks_fail_thresholds() {
        let mock = healthy_service();
        mock.add_mock(HttpMethod::Post, "/pix/webhook", 500, r#"{"code":"BOOM"}"#);

        let report = ScenarioRunner::new(config())
            .with_client(mock)
            .run(&short_pool())
            .await
            .unwrap();

        assert!(!report.passed());
        let failed: Vec<&str> = report.failed_thresholds().map(|o| o.label.as_str()).collect();
        assert!(failed.contains(&"webhook_5xx_rate"));
        assert!(failed.contains(&"http_req_failed"));
    }

    #[tokio::test]
    async fn test_setup_failure_stops_run() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_mock(HttpMethod::Post, "/wallets", 503, "{}");

        let error = ScenarioRunner::new(config())
            .with_client(mock.clone())
            .run(&short_pool())
            .await
            .unwrap_err();

        assert!(matches!(error, EngineError::Setup(SetupError::UnexpectedStatus { .. })));
        assert!(mock.requests_to("/pix/transfers").is_empty());
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_any_request() {
        let mut config = config();
        config.transfer.amount = "five".into();
        let mock = healthy_service();

        let error = ScenarioRunner::new(config)
            .with_client(mock.clone())
            .run(&short_pool())
            .await
            .unwrap_err();

        assert!(matches!(error, EngineError::Config(_)));
        assert!(mock.requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_threshold_on_iterations() {
        let mock = healthy_service();
        mock.add_mock(HttpMethod::Post, "/pix/webhook", 200, "{}");
        let mut config = config();
        config.thresholds = vec![ThresholdRule::new(
            names::ITERATIONS,
            "count>100".parse::<ThresholdCondition>().unwrap(),
        )];

        let report = ScenarioRunner::new(config)
            .with_client(mock)
            .run(&short_pool())
            .await
            .unwrap();

        assert!(!report.passed());
        assert_eq!(report.thresholds.len(), 1);
    }
}
