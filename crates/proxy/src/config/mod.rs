//! Typed engine configuration tree.
//!
//! The configuration document is deserialized with `serde` into a tree of plain
//! structs and tagged enums, then validated structurally by [`EngineConfig::validate`].
//! Anything that can be checked without the engine's runtime state (filter ordering,
//! route shapes, matcher syntax) is rejected here with a [`ConfigError`]; the only
//! check deferred to [`ProxyCore`](crate::core::ProxyCore) is that every routed
//! cluster was registered.
//!
//! The document mirrors a bootstrap with a single in-process API listener:
//!
//! ```
//! use micro_proxy::config::EngineConfig;
//!
//! let config = EngineConfig::from_json(r#"{
//!   "static_resources": {
//!     "listeners": [{
//!       "name": "base_api_listener",
//!       "api_listener": {
//!         "stat_prefix": "hcm",
//!         "route_config": {
//!           "name": "api_router",
//!           "virtual_hosts": [{
//!             "name": "api",
//!             "domains": ["*"],
//!             "routes": [{ "match": { "prefix": "/" }, "direct_response": { "status": 200 } }]
//!           }]
//!         },
//!         "http_filters": [{
//!           "name": "envoy.router",
//!           "typed_config": { "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router" }
//!         }]
//!       }
//!     }]
//!   }
//! }"#).unwrap();
//!
//! assert_eq!(config.api_listener().unwrap().http_filters.len(), 1);
//! ```

mod bootstrap;
mod error;
mod filter;
mod route;

pub use bootstrap::Address;
pub use bootstrap::ApiListener;
pub use bootstrap::EngineConfig;
pub use bootstrap::Listener;
pub use bootstrap::SocketAddress;
pub use bootstrap::StaticResources;

pub use error::ConfigError;

pub use filter::ASSERTION_TYPE_URL;
pub use filter::AssertionConfig;
pub use filter::BUFFER_TYPE_URL;
pub use filter::BodyPattern;
pub use filter::BufferConfig;
pub use filter::FilterConfig;
pub use filter::GenericBodyMatch;
pub use filter::HeaderMatchSpecifier;
pub use filter::HeaderMatcher;
pub use filter::HeadersMatch;
pub use filter::HttpFilterConfig;
pub use filter::MatchConfig;
pub use filter::MatchSet;
pub use filter::ROUTER_TYPE_URL;

pub use route::DataSource;
pub use route::DirectResponse;
pub use route::Route;
pub use route::RouteAction;
pub use route::RouteConfiguration;
pub use route::RouteMatch;
pub use route::RouteTarget;
pub use route::VirtualHost;
