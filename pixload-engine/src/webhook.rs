//! Simulated settlement confirmation

use crate::api::{ApiCall, Endpoint, TargetApi};
use crate::classifier::{Classification, OutcomeClassifier};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;

pub const CHECK_WEBHOOK_OK: &str = "webhook ok 200";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Confirmed,
}

/// Body of `POST /pix/webhook`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub end_to_end_id: String,
    pub event_id: String,
    pub event_type: EventType,
    /// RFC 3339 with millisecond precision, UTC
    pub occurred_at: String,
}

impl WebhookEvent {
    /// Confirmation stamped `skew` before `now`
    pub fn confirmed(end_to_end_id: impl Into<String>, event_id: impl Into<String>, now: DateTime<Utc>, skew: Duration) -> Self {
        let skew = chrono::Duration::from_std(skew).unwrap_or(chrono::Duration::zero());
        let occurred_at = now - skew;
        Self {
            end_to_end_id: end_to_end_id.into(),
            event_id: event_id.into(),
            event_type: EventType::Confirmed,
            occurred_at: occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// JSON body as derived; only strings and a unit enum, so serialization cannot fail
    pub fn body(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// Sends confirmations and hands every response to the classifier
#[derive(Debug, Clone)]
pub struct WebhookConfirmer {
    api: TargetApi,
    classifier: OutcomeClassifier,
    skew: Duration,
}

impl WebhookConfirmer {
    pub fn new(api: TargetApi, classifier: OutcomeClassifier, skew: Duration) -> Self {
        Self { api, classifier, skew }
    }

    pub fn event_for(&self, end_to_end_id: &str) -> WebhookEvent {
        WebhookEvent::confirmed(end_to_end_id, self.api.ids().next_id(), Utc::now(), self.skew)
    }

    /// True only when the service answered exactly 200
    pub async fn confirm(&self, end_to_end_id: &str) -> bool {
        self.confirm_classified(end_to_end_id).await.category.is_success()
    }

    pub async fn confirm_classified(&self, end_to_end_id: &str) -> Classification {
        let event = self.event_for(end_to_end_id);
        let call = ApiCall::post(Endpoint::TransferConfirm, "/pix/webhook").json(event.body());

        let classification = match self.api.send(call).await {
            Ok(response) => self
                .classifier
                .classify(response.status, &response.json_or_empty(), end_to_end_id),
            Err(e) => self.classifier.classify_transport_failure(&e, end_to_end_id),
        };

        self.api
            .metrics()
            .check(CHECK_WEBHOOK_OK, classification.category.is_success());
        classification
    }
}
