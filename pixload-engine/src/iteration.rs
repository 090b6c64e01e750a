//! One simulated end-user action: create a transfer, then confirm it

use crate::bootstrap::ScenarioContext;
use crate::load::{IterationOutcome, Workload};
use crate::metrics::{names, MetricValue, MetricsSink};
use crate::transfer::TransferRequestBuilder;
use crate::webhook::WebhookConfirmer;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

pub const CHECK_TRANSFER_STATUS: &str = "transfer status returned";

pub struct TransferIteration {
    context: Arc<ScenarioContext>,
    transfers: TransferRequestBuilder,
    confirmer: WebhookConfirmer,
    metrics: Arc<dyn MetricsSink>,
    amount: String,
}

impl TransferIteration {
    pub fn new(
        context: Arc<ScenarioContext>,
        transfers: TransferRequestBuilder,
        confirmer: WebhookConfirmer,
        metrics: Arc<dyn MetricsSink>,
        amount: impl Into<String>,
    ) -> Self {
        Self {
            context,
            transfers,
            confirmer,
            metrics,
            amount: amount.into(),
        }
    }
}

#[async_trait]
impl Workload for TransferIteration {
    async fn run_iteration(&self) -> IterationOutcome {
        let start = Instant::now();

        let Some(transfer) = self
            .transfers
            .create_transfer(&self.context, &self.amount)
            .await
            .created()
        else {
            return IterationOutcome::Aborted;
        };

        self.confirmer.confirm(&transfer.end_to_end_id).await;

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.metrics
            .record(names::TIME_TO_CONFIRM, MetricValue::Trend(elapsed_ms), &[]);
        self.metrics
            .check(CHECK_TRANSFER_STATUS, transfer.status.is_some());

        IterationOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{Correlation, TargetApi};
    use crate::classifier::OutcomeClassifier;
    use crate::ids::RandomIds;
    use crate::metrics::InMemoryMetrics;
    use crate::sampler::SampleLimiter;
    use crate::webhook::CHECK_WEBHOOK_OK;
    use pixload_http::{HttpMethod, MockHttpClient};
    use std::time::Duration;

    fn iteration(mock: Arc<MockHttpClient>) -> (TransferIteration, Arc<InMemoryMetrics>) {
        let metrics = Arc::new(InMemoryMetrics::new());
        let api = TargetApi::new(mock, metrics.clone(), Arc::new(RandomIds), Correlation::new("baseline", "run-1"));
        let classifier = OutcomeClassifier::new(metrics.clone(), Arc::new(SampleLimiter::new(0.0, 500)));
        let context = Arc::new(ScenarioContext {
            source_account_id: "wallet-a".into(),
            destination_account_id: "wallet-b".into(),
            destination_key: "key-b".into(),
        });
        (
            TransferIteration::new(
                context,
                TransferRequestBuilder::new(api.clone()),
                WebhookConfirmer::new(api, classifier, Duration::from_millis(750)),
                metrics.clone(),
                "5.00",
            ),
            metrics,
        )
    }

    #[tokio::test]
    async fn test_create_then_confirm() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_mock(
            HttpMethod::Post,
            "/pix/transfers",
            201,
            r#"{"endToEndId":"E2E1","status":"PENDING"}"#,
        );
        mock.add_mock(HttpMethod::Post, "/pix/webhook", 200, "{}");
        let (iteration, metrics) = iteration(mock.clone());

        assert_eq!(iteration.run_iteration().await, IterationOutcome::Completed);

        let paths: Vec<String> = mock.requests().iter().map(|r| r.path.clone()).collect();
        assert_eq!(paths, vec!["/pix/transfers", "/pix/webhook"]);

        let confirm = metrics.trend(names::TIME_TO_CONFIRM, &[]).unwrap();
        assert_eq!(confirm.count, 1);
        assert!(confirm.min >= 0.0);
        assert_eq!(metrics.rate(names::CHECKS, &[("check", CHECK_TRANSFER_STATUS)]), Some(1.0));
        assert_eq!(metrics.rate(names::CHECKS, &[("check", CHECK_WEBHOOK_OK)]), Some(1.0));
    }

    #[tokio::test]
    async fn test_failed_creation_skips_confirmation() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_mock(HttpMethod::Post, "/pix/transfers", 500, "{}");
        mock.add_mock(HttpMethod::Post, "/pix/webhook", 200, "{}");
        let (iteration, metrics) = iteration(mock.clone());

        assert_eq!(iteration.run_iteration().await, IterationOutcome::Aborted);
        assert!(mock.requests_to("/pix/webhook").is_empty());
        assert!(metrics.trend(names::TIME_TO_CONFIRM, &[]).is_none());
    }

    #[tokio::test]
    async fn test_rejected_confirmation_still_completes() {
        let mock = Arc::new(MockHttpClient::new());
        mock.add_mock(HttpMethod::Post, "/pix/transfers", 201, r#"{"endToEndId":"E2E1"}"#);
        mock.add_mock(HttpMethod::Post, "/pix/webhook", 503, r#"{"code":"UNAVAILABLE"}"#);
        let (iteration, metrics) = iteration(mock);

        assert_eq!(iteration.run_iteration().await, IterationOutcome::Completed);
        assert_eq!(metrics.counter(names::WEBHOOK_5XX_COUNT, &[]), 1);
        // No status in the creation response
        assert_eq!(metrics.rate(names::CHECKS, &[("check", CHECK_TRANSFER_STATUS)]), Some(0.0));
        assert_eq!(metrics.rate(names::CHECKS, &[("check", CHECK_WEBHOOK_OK)]), Some(0.0));
    }
}
