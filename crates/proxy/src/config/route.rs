use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::utils::ensure;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteConfiguration {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub virtual_hosts: Vec<VirtualHost>,
}

/// A group of routes selected by the request authority.
///
/// Domains are either `*`, an exact host, a suffix wildcard like `*.example.com`
/// or a prefix wildcard like `example.*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualHost {
    pub name: String,
    pub domains: Vec<String>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "match")]
    pub route_match: RouteMatch,
    #[serde(flatten)]
    pub action: RouteAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMatch {
    /// Matches any path starting with the prefix
    Prefix(String),
    /// Matches exactly this path
    Path(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteAction {
    /// Answer locally without any upstream
    DirectResponse(DirectResponse),
    /// Forward to an upstream cluster registered with the engine
    Route(RouteTarget),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<DataSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub inline_string: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTarget {
    pub cluster: String,
}

impl RouteConfiguration {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.virtual_hosts.iter().try_for_each(VirtualHost::validate)
    }
}

impl VirtualHost {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.domains.is_empty(), ConfigError::invalid_route(&self.name, "virtual host needs at least one domain"));
        for domain in &self.domains {
            ensure!(!domain.is_empty(), ConfigError::invalid_route(&self.name, "domain must not be empty"));
            let wildcards = domain.matches('*').count();
            let well_formed = wildcards == 0
                || domain == "*"
                || (wildcards == 1 && (domain.starts_with('*') || domain.ends_with('*')));
            ensure!(well_formed, ConfigError::invalid_route(&self.name, format!("invalid domain pattern {domain:?}")));
        }

        for route in &self.routes {
            let path = match &route.route_match {
                RouteMatch::Prefix(path) | RouteMatch::Path(path) => path,
            };
            ensure!(path.starts_with('/'), ConfigError::invalid_route(&self.name, format!("route path {path:?} must start with '/'")));

            if let RouteAction::DirectResponse(direct) = &route.action {
                ensure!(
                    (100..=599).contains(&direct.status),
                    ConfigError::invalid_route(&self.name, format!("invalid direct response status {}", direct.status))
                );
            }
            if let RouteAction::Route(target) = &route.action {
                ensure!(!target.cluster.is_empty(), ConfigError::invalid_route(&self.name, "cluster name must not be empty"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn virtual_host(domains: &[&str], routes: Vec<Route>) -> VirtualHost {
        VirtualHost { name: "api".into(), domains: domains.iter().map(ToString::to_string).collect(), routes }
    }

    fn direct(prefix: &str, status: u16) -> Route {
        Route {
            route_match: RouteMatch::Prefix(prefix.into()),
            action: RouteAction::DirectResponse(DirectResponse { status, body: None }),
        }
    }

    #[test]
    fn parse_routes() {
        let json = indoc! {r#"
        {
          "name": "api_router",
          "virtual_hosts": [{
            "name": "api",
            "domains": ["*"],
            "routes": [
              { "match": { "path": "/health" }, "direct_response": { "status": 204 } },
              { "match": { "prefix": "/static" }, "direct_response": { "status": 200, "body": { "inline_string": "hi" } } },
              { "match": { "prefix": "/" }, "route": { "cluster": "backend" } }
            ]
          }]
        }
        "#};

        let config: RouteConfiguration = serde_json::from_str(json).unwrap();
        let routes = &config.virtual_hosts[0].routes;
        assert_eq!(routes[0].route_match, RouteMatch::Path("/health".into()));
        assert_eq!(
            routes[1].action,
            RouteAction::DirectResponse(DirectResponse { status: 200, body: Some(DataSource { inline_string: "hi".into() }) })
        );
        assert_eq!(routes[2].action, RouteAction::Route(RouteTarget { cluster: "backend".into() }));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_routes() {
        let bad_status = RouteConfiguration { name: "r".into(), virtual_hosts: vec![virtual_host(&["*"], vec![direct("/", 42)])] };
        assert!(matches!(bad_status.validate(), Err(ConfigError::InvalidRoute { .. })));

        let bad_path = RouteConfiguration { name: "r".into(), virtual_hosts: vec![virtual_host(&["*"], vec![direct("api", 200)])] };
        assert!(bad_path.validate().is_err());

        let no_domain = RouteConfiguration { name: "r".into(), virtual_hosts: vec![virtual_host(&[], vec![])] };
        assert!(no_domain.validate().is_err());

        let bad_domain = RouteConfiguration { name: "r".into(), virtual_hosts: vec![virtual_host(&["a.*.com"], vec![])] };
        assert!(bad_domain.validate().is_err());

        let good = RouteConfiguration {
            name: "r".into(),
            virtual_hosts: vec![virtual_host(&["*.example.com", "example.*", "api.example.com"], vec![direct("/", 200)])],
        };
        assert!(good.validate().is_ok());
    }
}
