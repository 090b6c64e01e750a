//! Logging setup for pixload
//!
//! Everything the tool reports goes through `tracing`; this crate only
//! installs the global subscriber. Sampled webhook failures arrive as WARN
//! events on the `pixload::webhook_fail` target, so they can be isolated
//! with a directive such as `RUST_LOG=pixload::webhook_fail=warn`.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};

/// Target used for sampled webhook failure events
pub const WEBHOOK_FAIL_TARGET: &str = "pixload::webhook_fail";
