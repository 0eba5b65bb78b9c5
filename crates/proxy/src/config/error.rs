use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    #[error("configuration must define one api listener")]
    NoListener,

    #[error("configuration defines {count} listeners, only one api listener is supported")]
    MultipleListeners { count: usize },

    #[error("http filter chain is empty")]
    EmptyFilterChain,

    #[error("the router filter must be the last http filter, found {name} in its place")]
    RouterNotLast { name: String },

    #[error("duplicate http filter name: {name}")]
    DuplicateFilter { name: String },

    #[error("invalid http filter {name}: {reason}")]
    InvalidFilter { name: String, reason: String },

    #[error("invalid route in virtual host {virtual_host}: {reason}")]
    InvalidRoute { virtual_host: String, reason: String },

    #[error("route references unknown cluster: {cluster}")]
    UnknownCluster { cluster: String },

    #[error("invalid header matcher: {reason}")]
    InvalidHeaderMatcher { reason: String },
}

impl ConfigError {
    pub fn invalid_filter<N: ToString, R: ToString>(name: N, reason: R) -> Self {
        Self::InvalidFilter { name: name.to_string(), reason: reason.to_string() }
    }

    pub fn invalid_route<V: ToString, R: ToString>(virtual_host: V, reason: R) -> Self {
        Self::InvalidRoute { virtual_host: virtual_host.to_string(), reason: reason.to_string() }
    }

    pub fn unknown_cluster<S: ToString>(cluster: S) -> Self {
        Self::UnknownCluster { cluster: cluster.to_string() }
    }

    pub fn invalid_header_matcher<S: ToString>(str: S) -> Self {
        Self::InvalidHeaderMatcher { reason: str.to_string() }
    }
}
