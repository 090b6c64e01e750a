//! HTTP transport for pixload
//!
//! This crate provides the `HttpClient` seam the engine talks through, a
//! pooled reqwest-backed implementation, and a scripted mock client for
//! tests that should not open sockets.

pub mod client;
pub mod config;
pub mod errors;
pub mod mock;
pub mod types;

// Re-export main types for convenience
pub use client::{HttpClient, HttpManager};
pub use config::HttpConfig;
pub use errors::HttpError;
pub use mock::MockHttpClient;
pub use types::{ApiRequest, ApiResponse, HttpMethod};
