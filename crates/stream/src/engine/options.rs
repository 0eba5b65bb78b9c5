use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use micro_proxy::config::EngineConfig;
use micro_proxy::handler::Upstream;
use tracing::level_filters::LevelFilter;

use crate::engine::Engine;
use crate::error::ClientError;

const DEFAULT_WORKER_THREADS: usize = 2;

/// Runtime options of an engine, everything that is not part of the configuration document.
pub struct EngineOptions {
    /// Max level of the log subscriber the engine installs, `OFF` installs none
    pub log_level: LevelFilter,
    pub worker_threads: usize,
    /// In-process clusters by name, routes may only target registered clusters
    pub upstreams: HashMap<String, Arc<dyn Upstream>>,
    /// Runs on the engine runtime once the engine is up
    pub on_engine_running: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::INFO,
            worker_threads: DEFAULT_WORKER_THREADS,
            upstreams: HashMap::new(),
            on_engine_running: None,
        }
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("log_level", &self.log_level)
            .field("worker_threads", &self.worker_threads)
            .field("upstreams", &self.upstreams.keys().collect::<Vec<_>>())
            .field("on_engine_running", &self.on_engine_running.is_some())
            .finish()
    }
}

/// Value builder of an [`Engine`].
///
/// ```
/// use micro_stream::engine::EngineBuilder;
/// use tracing::level_filters::LevelFilter;
///
/// let engine = EngineBuilder::from_json(r#"{
///   "static_resources": { "listeners": [{
///     "name": "base_api_listener",
///     "api_listener": {
///       "route_config": { "name": "api_router", "virtual_hosts": [{
///         "name": "api", "domains": ["*"],
///         "routes": [{ "match": { "prefix": "/" }, "direct_response": { "status": 200 } }]
///       }]},
///       "http_filters": [{ "name": "envoy.router", "typed_config": {
///         "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router" } }]
///     }
///   }]}
/// }"#)
/// .unwrap()
/// .log_level(LevelFilter::OFF)
/// .build()
/// .unwrap();
///
/// assert!(engine.is_running());
/// engine.terminate().unwrap();
/// assert!(engine.terminate().is_err());
/// ```
#[derive(Debug)]
pub struct EngineBuilder {
    config: EngineConfig,
    options: EngineOptions,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self { config, options: EngineOptions::default() }
    }

    /// Parses and validates a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ClientError> {
        Ok(Self::new(EngineConfig::from_json(json)?))
    }

    #[must_use]
    pub fn log_level(mut self, level: LevelFilter) -> Self {
        self.options.log_level = level;
        self
    }

    #[must_use]
    pub fn worker_threads(mut self, worker_threads: usize) -> Self {
        self.options.worker_threads = worker_threads;
        self
    }

    /// Registers an in-process cluster under `name`.
    #[must_use]
    pub fn add_upstream(mut self, name: impl Into<String>, upstream: impl Upstream + 'static) -> Self {
        self.options.upstreams.insert(name.into(), Arc::new(upstream));
        self
    }

    #[must_use]
    pub fn on_engine_running(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.options.on_engine_running = Some(Box::new(f));
        self
    }

    pub fn build(self) -> Result<Engine, ClientError> {
        Engine::build(&self.config, self.options)
    }
}
