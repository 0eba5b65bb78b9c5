use std::fmt;

use thiserror::Error;

/// Machine readable category of a stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network or upstream failure
    Transport,
    /// A filter of the chain refused the request
    FilterRejected,
    /// The engine itself misbehaved
    Internal,
}

impl ErrorCategory {
    /// Numeric code of the category, stable across releases
    pub fn code(self) -> i32 {
        match self {
            ErrorCategory::Internal => 0,
            ErrorCategory::Transport => 2,
            ErrorCategory::FilterRejected => 3,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::FilterRejected => "filter_rejected",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProxyError {
    #[error("filter {filter} rejected the request: {reason}")]
    FilterRejected { filter: String, reason: String },

    #[error("upstream cluster {cluster} failed: {reason}")]
    Upstream { cluster: String, reason: String },

    #[error("internal engine failure: {reason}")]
    Internal { reason: String },
}

impl ProxyError {
    pub fn filter_rejected<F: ToString, R: ToString>(filter: F, reason: R) -> Self {
        Self::FilterRejected { filter: filter.to_string(), reason: reason.to_string() }
    }

    pub fn upstream<C: ToString, R: ToString>(cluster: C, reason: R) -> Self {
        Self::Upstream { cluster: cluster.to_string(), reason: reason.to_string() }
    }

    pub fn internal<S: ToString>(str: S) -> Self {
        Self::Internal { reason: str.to_string() }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::FilterRejected { .. } => ErrorCategory::FilterRejected,
            ProxyError::Upstream { .. } => ErrorCategory::Transport,
            ProxyError::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories() {
        assert_eq!(ProxyError::filter_rejected("assertion", "no").category(), ErrorCategory::FilterRejected);
        assert_eq!(ProxyError::upstream("backend", "refused").category(), ErrorCategory::Transport);
        assert_eq!(ProxyError::internal("bug").category(), ErrorCategory::Internal);
        assert_eq!(ErrorCategory::Transport.to_string(), "transport");
        assert_ne!(ErrorCategory::Transport.code(), ErrorCategory::FilterRejected.code());
    }

    #[test]
    fn messages() {
        let error = ProxyError::filter_rejected("envoy.filters.http.assertion", "trailers do not match");
        assert_eq!(error.to_string(), "filter envoy.filters.http.assertion rejected the request: trailers do not match");
    }
}
