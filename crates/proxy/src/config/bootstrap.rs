use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, FilterConfig, HttpFilterConfig, RouteConfiguration};
use crate::utils::ensure;

/// Root of the engine configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub static_resources: StaticResources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticResources {
    #[serde(default)]
    pub listeners: Vec<Listener>,
}

/// A listener definition. Streams are in-process, so the address is carried but never bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub api_listener: ApiListener,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub socket_address: SocketAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    pub address: String,
    pub port_value: u16,
}

/// The http connection manager behind the api listener: routes plus the filter chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiListener {
    #[serde(default)]
    pub stat_prefix: String,
    pub route_config: RouteConfiguration,
    #[serde(default)]
    pub http_filters: Vec<HttpFilterConfig>,
}

impl EngineConfig {
    /// Creates a configuration with a single api listener.
    pub fn with_api_listener(name: impl Into<String>, api_listener: ApiListener) -> Self {
        let listener = Listener { name: name.into(), address: None, api_listener };
        Self { static_resources: StaticResources { listeners: vec![listener] } }
    }

    /// Parses a JSON configuration document and validates it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the single api listener of this configuration.
    pub fn api_listener(&self) -> Result<&ApiListener, ConfigError> {
        match self.static_resources.listeners.as_slice() {
            [] => Err(ConfigError::NoListener),
            [listener] => Ok(&listener.api_listener),
            listeners => Err(ConfigError::MultipleListeners { count: listeners.len() }),
        }
    }

    /// Checks the structure of the configuration.
    ///
    /// Cluster names are not checked here, they depend on the upstreams registered
    /// with the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let api_listener = self.api_listener()?;
        api_listener.validate()
    }
}

impl ApiListener {
    pub fn new(route_config: RouteConfiguration, http_filters: Vec<HttpFilterConfig>) -> Self {
        Self { stat_prefix: String::new(), route_config, http_filters }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let (last, rest) = self.http_filters.split_last().ok_or(ConfigError::EmptyFilterChain)?;
        ensure!(
            matches!(last.typed_config, FilterConfig::Router),
            ConfigError::RouterNotLast { name: last.name.clone() }
        );

        let mut names = HashSet::with_capacity(self.http_filters.len());
        for filter in &self.http_filters {
            ensure!(!filter.name.is_empty(), ConfigError::invalid_filter("<unnamed>", "filter name must not be empty"));
            ensure!(names.insert(filter.name.as_str()), ConfigError::DuplicateFilter { name: filter.name.clone() });
        }

        for filter in rest {
            ensure!(
                !matches!(filter.typed_config, FilterConfig::Router),
                ConfigError::RouterNotLast { name: last.name.clone() }
            );
            filter.validate()?;
        }

        self.route_config.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BufferConfig, DirectResponse, Route, RouteAction, RouteMatch, VirtualHost};
    use indoc::indoc;

    fn route_config() -> RouteConfiguration {
        RouteConfiguration {
            name: "api_router".into(),
            virtual_hosts: vec![VirtualHost {
                name: "api".into(),
                domains: vec!["*".into()],
                routes: vec![Route {
                    route_match: RouteMatch::Prefix("/".into()),
                    action: RouteAction::DirectResponse(DirectResponse { status: 200, body: None }),
                }],
            }],
        }
    }

    fn router() -> HttpFilterConfig {
        HttpFilterConfig { name: "envoy.router".into(), typed_config: FilterConfig::Router }
    }

    fn buffer(name: &str) -> HttpFilterConfig {
        HttpFilterConfig {
            name: name.into(),
            typed_config: FilterConfig::Buffer(BufferConfig { max_request_bytes: 1024 }),
        }
    }

    #[test]
    fn parse_full_document() {
        let json = indoc! {r#"
        {
          "static_resources": {
            "listeners": [{
              "name": "base_api_listener",
              "address": { "socket_address": { "protocol": "TCP", "address": "0.0.0.0", "port_value": 10000 } },
              "api_listener": {
                "stat_prefix": "hcm",
                "route_config": {
                  "name": "api_router",
                  "virtual_hosts": [{
                    "name": "api",
                    "domains": ["*"],
                    "routes": [{ "match": { "prefix": "/" }, "direct_response": { "status": 200 } }]
                  }]
                },
                "http_filters": [
                  {
                    "name": "envoy.filters.http.buffer",
                    "typed_config": {
                      "@type": "type.googleapis.com/envoy.extensions.filters.http.buffer.v3.Buffer",
                      "max_request_bytes": 65000
                    }
                  },
                  {
                    "name": "envoy.router",
                    "typed_config": { "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router" }
                  }
                ]
              }
            }]
          }
        }
        "#};

        let config = EngineConfig::from_json(json).unwrap();
        let listener = &config.static_resources.listeners[0];
        assert_eq!(listener.name, "base_api_listener");
        assert_eq!(listener.address.as_ref().unwrap().socket_address.port_value, 10000);

        let api_listener = config.api_listener().unwrap();
        assert_eq!(api_listener.stat_prefix, "hcm");
        assert_eq!(api_listener.http_filters.len(), 2);
        assert_eq!(
            api_listener.http_filters[0].typed_config,
            FilterConfig::Buffer(BufferConfig { max_request_bytes: 65000 })
        );
        assert_eq!(api_listener.route_config, route_config());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let error = EngineConfig::from_json("{ \"static_resources\": ").unwrap_err();
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn unknown_filter_type_is_a_parse_error() {
        let json = indoc! {r#"
        {
          "static_resources": {
            "listeners": [{
              "name": "l",
              "api_listener": {
                "route_config": { "name": "r", "virtual_hosts": [] },
                "http_filters": [{ "name": "x", "typed_config": { "@type": "type.googleapis.com/unknown.Filter" } }]
              }
            }]
          }
        }
        "#};
        assert!(matches!(EngineConfig::from_json(json), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn listener_count() {
        let config = EngineConfig { static_resources: StaticResources { listeners: vec![] } };
        assert!(matches!(config.validate(), Err(ConfigError::NoListener)));

        let mut config = EngineConfig::with_api_listener("a", ApiListener::new(route_config(), vec![router()]));
        let second = config.static_resources.listeners[0].clone();
        config.static_resources.listeners.push(second);
        assert!(matches!(config.validate(), Err(ConfigError::MultipleListeners { count: 2 })));
    }

    #[test]
    fn filter_chain_shape() {
        let config = EngineConfig::with_api_listener("l", ApiListener::new(route_config(), vec![]));
        assert!(matches!(config.validate(), Err(ConfigError::EmptyFilterChain)));

        let config = EngineConfig::with_api_listener("l", ApiListener::new(route_config(), vec![buffer("buffer")]));
        assert!(matches!(config.validate(), Err(ConfigError::RouterNotLast { .. })));

        let filters = vec![router(), buffer("buffer"), router()];
        let config = EngineConfig::with_api_listener("l", ApiListener::new(route_config(), filters));
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateFilter { .. })));

        let filters = vec![buffer("buffer"), buffer("buffer"), router()];
        let config = EngineConfig::with_api_listener("l", ApiListener::new(route_config(), filters));
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateFilter { name }) if name == "buffer"));

        let filters = vec![buffer("buffer"), router()];
        let config = EngineConfig::with_api_listener("l", ApiListener::new(route_config(), filters));
        assert!(config.validate().is_ok());
    }
}
