//! HTTP client implementation

use crate::config::HttpConfig;
use crate::errors::HttpError;
use crate::types::{ApiRequest, ApiResponse};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, trace};

/// HTTP client trait for issuing requests against the service under test
///
/// Any status code is a successful exchange at this layer; only transport
/// failures and timeouts surface as errors.
#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError>;
}

/// Pooled reqwest client bound to one base URL
///
/// A single `reqwest::Client` is built up front and shared by every worker,
/// so connections are reused across iterations.
#[derive(Debug, Clone)]
pub struct HttpManager {
    client: Client,
    base_url: String,
    config: HttpConfig,
}

impl HttpManager {
    /// Create a manager for `base_url` with the given transport settings
    pub fn new(base_url: &str, config: HttpConfig) -> Result<Self, HttpError> {
        let parsed = url::Url::parse(base_url).map_err(|e| HttpError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(HttpError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                base_url,
                parsed.scheme()
            )));
        }

        debug!(
            "Creating HttpManager for {} with timeout: {}s",
            base_url,
            config.timeout.as_secs()
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.max_idle_per_host)
            .pool_idle_timeout(config.idle_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn header_map(headers: &[(String, String)]) -> Result<HeaderMap, HttpError> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (key, value) in headers {
            let name = HeaderName::from_str(key).map_err(|_| HttpError::InvalidHeaderName(key.clone()))?;
            let value = HeaderValue::from_str(value).map_err(|_| HttpError::InvalidHeaderValue(key.clone()))?;
            header_map.insert(name, value);
        }
        Ok(header_map)
    }

    fn classify_error(error: reqwest::Error, started: Instant) -> HttpError {
        if error.is_timeout() {
            HttpError::Timeout {
                elapsed: started.elapsed(),
            }
        } else {
            HttpError::NetworkError(error)
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for HttpManager {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let url = self.url_for(&request.path);
        let headers = Self::header_map(&request.headers)?;

        let mut builder = self
            .client
            .request(reqwest::Method::from(request.method), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        trace!("Sending {} {}", request.method, url);
        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify_error(e, started))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Self::classify_error(e, started))?;
        let elapsed = started.elapsed();

        trace!("{} {} -> {} in {:?}", request.method, url, status, elapsed);
        Ok(ApiResponse { status, body, elapsed })
    }
}
