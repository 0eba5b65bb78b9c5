use std::fmt;
use std::io;

use micro_proxy::config::ConfigError;
use micro_proxy::protocol::{ErrorCategory, ProxyError};
use thiserror::Error;

/// Synchronous failure of a client call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid engine configuration: {source}")]
    Configuration {
        #[from]
        source: ConfigError,
    },

    #[error("engine has been terminated")]
    EngineTerminated,

    #[error("{operation} is not allowed while the stream is {state}")]
    InvalidState { operation: &'static str, state: &'static str },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("failed to start engine runtime: {source}")]
    Runtime { source: io::Error },
}

impl ClientError {
    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Self::InvalidState { operation, state }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn runtime<E: Into<io::Error>>(e: E) -> Self {
        Self::Runtime { source: e.into() }
    }
}

/// Error delivered to `on_error`, the terminal failure of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    category: ErrorCategory,
    message: Option<String>,
}

impl StreamError {
    pub fn new(category: ErrorCategory, message: Option<String>) -> Self {
        Self { category, message }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Numeric code of the category
    pub fn code(&self) -> i32 {
        self.category.code()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} error ({}): {message}", self.category, self.code()),
            None => write!(f, "{} error ({})", self.category, self.code()),
        }
    }
}

impl std::error::Error for StreamError {}

impl From<ProxyError> for StreamError {
    fn from(e: ProxyError) -> Self {
        Self { category: e.category(), message: Some(e.to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_error_from_proxy_error() {
        let error = StreamError::from(ProxyError::filter_rejected("envoy.filters.http.assertion", "no match"));
        assert_eq!(error.category(), ErrorCategory::FilterRejected);
        assert_eq!(error.code(), ErrorCategory::FilterRejected.code());
        assert_eq!(error.message(), Some("filter envoy.filters.http.assertion rejected the request: no match"));
    }

    #[test]
    fn display() {
        assert_eq!(StreamError::new(ErrorCategory::Internal, None).to_string(), "internal error (0)");
        assert_eq!(ClientError::invalid_state("send_data", "half closed").to_string(), "send_data is not allowed while the stream is half closed");
    }
}
