//! Scripted in-process client for tests that should not open sockets

use crate::client::HttpClient;
use crate::errors::HttpError;
use crate::types::{ApiRequest, ApiResponse, HttpMethod};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
enum MockReply {
    Respond { status: u16, body: String },
    Timeout,
}

#[derive(Debug)]
struct MockRoute {
    method: HttpMethod,
    pattern: String,
    /// Replies consumed in order; the last one repeats forever
    replies: VecDeque<MockReply>,
}

impl MockRoute {
    fn matches(&self, method: HttpMethod, path: &str) -> bool {
        self.method == method && path_matches(&self.pattern, path)
    }

    fn next_reply(&mut self) -> Option<MockReply> {
        if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        }
    }
}

/// `*` matches exactly one path segment
fn path_matches(pattern: &str, path: &str) -> bool {
    let mut pattern_segments = pattern.split('/');
    let mut path_segments = path.split('/');
    loop {
        match (pattern_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some("*"), Some(segment)) if !segment.is_empty() => continue,
            (Some(expected), Some(actual)) if expected == actual => continue,
            _ => return false,
        }
    }
}

/// Mock client keyed by method and path pattern
///
/// Unmatched requests get a 404 with an empty body. Every request is
/// recorded for later assertions.
#[derive(Debug, Default)]
pub struct MockHttpClient {
    routes: Mutex<Vec<MockRoute>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond to `method` + `pattern` with a fixed status and body
    pub fn add_mock(&self, method: HttpMethod, pattern: &str, status: u16, body: impl Into<String>) {
        self.push_reply(method, pattern, MockReply::Respond {
            status,
            body: body.into(),
        });
    }

    /// Queue a sequence of replies; the final one repeats once the others are used
    pub fn add_sequence(&self, method: HttpMethod, pattern: &str, replies: Vec<(u16, String)>) {
        for (status, body) in replies {
            self.push_reply(method, pattern, MockReply::Respond { status, body });
        }
    }

    /// Make `method` + `pattern` fail with a timeout
    pub fn add_timeout(&self, method: HttpMethod, pattern: &str) {
        self.push_reply(method, pattern, MockReply::Timeout);
    }

    fn push_reply(&self, method: HttpMethod, pattern: &str, reply: MockReply) {
        let mut routes = self.routes.lock();
        if let Some(route) = routes
            .iter_mut()
            .find(|r| r.method == method && r.pattern == pattern)
        {
            route.replies.push_back(reply);
        } else {
            routes.push(MockRoute {
                method,
                pattern: pattern.to_string(),
                replies: VecDeque::from([reply]),
            });
        }
        debug!("Added HTTP mock for {} {}", method, pattern);
    }

    /// All requests seen so far, in arrival order
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Requests whose path matches `pattern`
    pub fn requests_to(&self, pattern: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .iter()
            .filter(|r| path_matches(pattern, &r.path))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl HttpClient for MockHttpClient {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .find(|route| route.matches(request.method, &request.path))
                .and_then(MockRoute::next_reply)
        };
        self.requests.lock().push(request);

        match reply {
            Some(MockReply::Respond { status, body }) => Ok(ApiResponse::new(status, body, Duration::from_millis(1))),
            Some(MockReply::Timeout) => Err(HttpError::Timeout {
                elapsed: Duration::from_secs(30),
            }),
            None => Ok(ApiResponse::new(404, "", Duration::from_millis(1))),
        }
    }
}
