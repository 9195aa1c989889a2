//! Dispatcher and transport settings.

use std::time::Duration;

use crate::http::HeaderMap;

/// What the dispatcher does with non-2xx responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusPolicy {
    /// Hand every response to the caller as a `ResponseView`.
    #[default]
    Accept,
    /// Fail with `HttpError::UnexpectedStatus` unless the status is 2xx.
    RequireSuccess,
}

/// Settings applied by `Dispatcher` to every request it sends.
#[derive(Debug, Clone, Default)]
pub struct DispatcherConfig {
    pub status_policy: StatusPolicy,
    /// Sent with every request unless the request sets the same header.
    pub default_headers: HeaderMap,
}

impl DispatcherConfig {
    pub fn status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name, value);
        self
    }
}

/// Settings for `UreqTransport`.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for a whole call, connect through body read.
    pub timeout: Option<Duration>,
    pub max_response_bytes: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            max_response_bytes: 64 * 1024 * 1024,
        }
    }
}

impl TransportConfig {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn max_response_bytes(mut self, limit: u64) -> Self {
        self.max_response_bytes = limit;
        self
    }
}
