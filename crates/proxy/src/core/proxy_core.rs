use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::config::{ConfigError, EngineConfig, FilterConfig};
use crate::filter::{AssertionFilter, BufferFilter, FilterChain, HttpFilter, Matcher};
use crate::handler::Upstream;
use crate::protocol::RequestHead;
use crate::router::{RouteEntry, RouteTable};

/// The compiled, immutable state shared by every stream of one engine.
pub struct ProxyCore {
    stat_prefix: String,
    filters: Vec<FilterFactory>,
    routes: RouteTable,
    upstreams: HashMap<String, Arc<dyn Upstream>>,
}

#[derive(Debug)]
enum FilterFactory {
    Assertion { name: String, matcher: Arc<Matcher> },
    Buffer { name: String, max_request_bytes: usize },
}

impl fmt::Debug for ProxyCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCore")
            .field("stat_prefix", &self.stat_prefix)
            .field("filters", &self.filters)
            .field("routes", &self.routes)
            .field("upstreams", &self.upstreams.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProxyCore {
    /// Validates the configuration and compiles filters and routes.
    ///
    /// Every cluster a route points to must be present in `upstreams`.
    pub fn new(config: &EngineConfig, upstreams: HashMap<String, Arc<dyn Upstream>>) -> Result<Self, ConfigError> {
        config.validate()?;
        let api_listener = config.api_listener()?;

        let mut filters = Vec::with_capacity(api_listener.http_filters.len());
        for filter in &api_listener.http_filters {
            let factory = match &filter.typed_config {
                FilterConfig::Assertion(assertion) => FilterFactory::Assertion {
                    name: filter.name.clone(),
                    matcher: Arc::new(Matcher::compile(&assertion.match_config)?),
                },
                FilterConfig::Buffer(buffer) => FilterFactory::Buffer {
                    name: filter.name.clone(),
                    max_request_bytes: buffer.max_request_bytes as usize,
                },
                // the router is the terminal stage, not a member of the chain
                FilterConfig::Router => continue,
            };
            filters.push(factory);
        }

        let routes = RouteTable::new(&api_listener.route_config, |cluster| upstreams.contains_key(cluster))?;

        info!(
            stat_prefix = %api_listener.stat_prefix,
            filters = filters.len(),
            upstreams = upstreams.len(),
            "proxy core configured"
        );
        Ok(Self { stat_prefix: api_listener.stat_prefix.clone(), filters, routes, upstreams })
    }

    /// Builds the filter chain of a new stream.
    pub fn new_filter_chain(&self) -> FilterChain {
        let filters = self
            .filters
            .iter()
            .map(|factory| -> Box<dyn HttpFilter> {
                match factory {
                    FilterFactory::Assertion { name, matcher } => Box::new(AssertionFilter::new(name.as_str(), Arc::clone(matcher))),
                    FilterFactory::Buffer { name, max_request_bytes } => Box::new(BufferFilter::new(name.as_str(), *max_request_bytes)),
                }
            })
            .collect();
        FilterChain::new(filters)
    }

    pub fn route(&self, head: &RequestHead) -> Option<&RouteEntry> {
        self.routes.route(head.authority(), head.route_path())
    }

    pub fn upstream(&self, cluster: &str) -> Option<&Arc<dyn Upstream>> {
        self.upstreams.get(cluster)
    }

    pub fn stat_prefix(&self) -> &str {
        &self.stat_prefix
    }
}
