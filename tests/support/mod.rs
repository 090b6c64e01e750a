//! Shared wiremock stand-in for the payment service

#![allow(dead_code)]

use pixload_config::PixloadConfig;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SOURCE_WALLET: &str = "wallet-a";
pub const DESTINATION_WALLET: &str = "wallet-b";
pub const DESTINATION_KEY: &str = "c0ffee00-0000-4000-8000-000000000001";

/// Hands out a fresh end-to-end id for every accepted transfer
pub struct TransferResponder {
    next: AtomicU64,
    delay: Duration,
}

impl TransferResponder {
    pub fn new(delay: Duration) -> Self {
        Self {
            next: AtomicU64::new(1),
            delay,
        }
    }
}

impl Respond for TransferResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        ResponseTemplate::new(201)
            .set_body_json(json!({"endToEndId": format!("E2E{:08}", n), "status": "PENDING"}))
            .set_delay(self.delay)
    }
}

pub struct PaymentService {
    pub server: MockServer,
}

impl PaymentService {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Wallets, random key and deposit all succeed; correlation headers are required
    pub async fn with_setup(self, scenario: &str) -> Self {
        Mock::given(method("POST"))
            .and(path("/wallets"))
            .and(header("X-Scenario", scenario))
            .and(header_exists("X-Run-Id"))
            .and(header_exists("X-Trace-Id"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": SOURCE_WALLET})))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/wallets"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": DESTINATION_WALLET})))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/wallets/{}/pix-keys", DESTINATION_WALLET)))
            .and(body_partial_json(json!({"type": "RANDOM"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"type": "RANDOM", "value": DESTINATION_KEY})),
            )
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/wallets/{}/deposit", SOURCE_WALLET)))
            .and(header_exists("Idempotency-Key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"balance": "200000.00"})))
            .mount(&self.server)
            .await;
        self
    }

    /// Accept well-formed transfers from the funded wallet to the registered key
    pub async fn accepting_transfers(self, delay: Duration) -> Self {
        Mock::given(method("POST"))
            .and(path("/pix/transfers"))
            .and(header_exists("Idempotency-Key"))
            .and(header_exists("X-Trace-Id"))
            .and(body_partial_json(json!({
                "fromWalletId": SOURCE_WALLET,
                "toPixKey": DESTINATION_KEY,
            })))
            .respond_with(TransferResponder::new(delay))
            .mount(&self.server)
            .await;
        self
    }

    pub async fn rejecting_transfers(self, status: u16) -> Self {
        Mock::given(method("POST"))
            .and(path("/pix/transfers"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"code": "REJECTED"})))
            .mount(&self.server)
            .await;
        self
    }

    pub async fn webhook_responds(self, status: u16, body: Value) -> Self {
        Mock::given(method("POST"))
            .and(path("/pix/webhook"))
            .and(body_partial_json(json!({"eventType": "CONFIRMED"})))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
        self
    }

    pub async fn failing_setup(self, status: u16) -> Self {
        Mock::given(method("POST"))
            .and(path_regex("^/wallets"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
        self
    }

    pub async fn requests_to(&self, wanted: &str) -> Vec<Request> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == wanted)
            .collect()
    }

    /// Defaults pointed at this server, run id pinned
    pub fn config(&self, scenario: &str) -> PixloadConfig {
        let mut config = PixloadConfig::default();
        config.target.base_url = self.server.uri();
        config.target.scenario_name = scenario.to_string();
        config.target.run_id = Some("run-e2e".to_string());
        config
    }
}
