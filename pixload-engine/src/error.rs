//! Engine error types
//!
//! Only setup failures stop a run. Everything that goes wrong inside an
//! iteration is converted to metrics and never reaches these types.

use pixload_config::ConfigError;
use pixload_http::HttpError;

/// A bootstrap call did not produce what the scenario needs
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("{call} returned status {actual}, expected {expected}")]
    UnexpectedStatus {
        call: &'static str,
        expected: u16,
        actual: u16,
    },

    #[error("{call} response has no usable '{field}' field")]
    MissingField {
        call: &'static str,
        field: &'static str,
    },

    #[error("{call} failed: {source}")]
    Transport {
        call: &'static str,
        #[source]
        source: HttpError,
    },
}

/// Run-level failure
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Scenario setup failed: {0}")]
    Setup(#[from] SetupError),

    #[error("Transport error: {0}")]
    Http(#[from] HttpError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid load shape: {0}")]
    InvalidShape(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
