//! Traffic generation engine for pixload
//!
//! Drives synthetic PIX transfers against a payment service: one-time
//! scenario setup, per-iteration transfer creation and webhook
//! confirmation, outcome classification with capped diagnostic sampling,
//! and load shaping (fixed worker pool or ramping arrival rate).

pub mod api;
pub mod bootstrap;
pub mod classifier;
pub mod error;
pub mod ids;
pub mod iteration;
pub mod load;
pub mod metrics;
pub mod runner;
pub mod sampler;
pub mod shutdown;
pub mod transfer;
pub mod webhook;

// Re-export commonly used types
pub use api::{ApiCall, Correlation, Endpoint, TargetApi};
pub use bootstrap::{ScenarioBootstrapper, ScenarioContext};
pub use classifier::{Classification, OutcomeCategory, OutcomeClassifier};
pub use error::{EngineError, EngineResult, SetupError};
pub use ids::{mint_run_id, IdGenerator, RandomIds, SequentialIds};
pub use iteration::TransferIteration;
pub use load::{FixedPool, IterationOutcome, LoadController, LoadReport, LoadShape, RampingArrivalRate, Workload};
pub use metrics::{InMemoryMetrics, MetricValue, MetricsSink, ThresholdOutcome};
pub use runner::{RunReport, ScenarioRunner};
pub use sampler::{Sample, SampleLimiter};
pub use shutdown::{InFlightGuard, ShutdownCoordinator};
pub use transfer::{TransferOutcome, TransferRequest, TransferRequestBuilder, TransferResult};
pub use webhook::{WebhookConfirmer, WebhookEvent};
