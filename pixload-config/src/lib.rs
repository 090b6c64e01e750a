//! Domain-driven configuration for pixload
//!
//! Configuration is split by functional domain (target service, HTTP
//! transport, transfer values, diagnostic sampling, load shapes,
//! thresholds, logging), with validation, defaults and environment
//! variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

// Re-export domain configurations
pub use domains::{
    http::HttpConfig,
    load::{BaselineConfig, LoadConfig, StageConfig, StressConfig},
    logging::LoggingConfig,
    sampling::SamplingConfig,
    target::TargetConfig,
    thresholds::{Aggregate, Comparison, ThresholdCondition, ThresholdRule},
    transfer::TransferConfig,
    PixloadConfig,
};

// Re-export utilities
pub use domains::utils::{serde_duration_millis, serde_duration_secs};
