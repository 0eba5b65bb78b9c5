//! Route resolution, the terminal stage of the filter chain.
//!
//! The configured [`RouteConfiguration`] is compiled once per engine into a
//! [`RouteTable`]. A request picks a virtual host by its authority, most specific
//! domain first (exact, then `*.suffix`, then `prefix.*`, then `*`), and then the
//! first route of that host whose path matcher accepts the request path.

mod assembler;

pub use assembler::AssembledRequest;
pub use assembler::RequestAssembler;

use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

use crate::config::{ConfigError, RouteAction, RouteConfiguration, RouteMatch, VirtualHost};
use crate::utils::ensure;

/// Compiled routes of one engine.
#[derive(Debug)]
pub struct RouteTable {
    virtual_hosts: Vec<CompiledVirtualHost>,
}

#[derive(Debug)]
struct CompiledVirtualHost {
    name: String,
    domains: Vec<DomainMatcher>,
    routes: Vec<RouteEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum DomainMatcher {
    Exact(String),
    Suffix(String),
    Prefix(String),
    Any,
}

/// A resolved route: how the path matched and what to do with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    path: RouteMatch,
    action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    DirectResponse { status: StatusCode, body: Option<Bytes> },
    Cluster(String),
}

impl RouteTable {
    /// Compiles the route configuration, checking every cluster with `has_cluster`.
    pub fn new(config: &RouteConfiguration, has_cluster: impl Fn(&str) -> bool) -> Result<Self, ConfigError> {
        let virtual_hosts = config
            .virtual_hosts
            .iter()
            .map(|virtual_host| CompiledVirtualHost::new(virtual_host, &has_cluster))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { virtual_hosts })
    }

    /// Resolves the route for a request authority and path, `None` when nothing matches.
    pub fn route(&self, authority: &str, path: &str) -> Option<&RouteEntry> {
        let host = authority.to_ascii_lowercase();
        let without_port = strip_port(&host);

        let virtual_host = self.select_virtual_host(&[host.as_str(), without_port])?;

        let entry = virtual_host.routes.iter().find(|entry| entry.matches(path));
        debug!(virtual_host = %virtual_host.name, path, matched = entry.is_some(), "resolved route");
        entry
    }

    fn select_virtual_host(&self, hosts: &[&str]) -> Option<&CompiledVirtualHost> {
        // lower rank wins, ties go to the longer pattern
        self.virtual_hosts
            .iter()
            .filter_map(|virtual_host| {
                let rank = hosts.iter().filter_map(|host| virtual_host.best_domain_match(host)).min()?;
                Some((rank, virtual_host))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, virtual_host)| virtual_host)
    }
}

impl CompiledVirtualHost {
    fn new(config: &VirtualHost, has_cluster: &impl Fn(&str) -> bool) -> Result<Self, ConfigError> {
        let domains = config.domains.iter().map(|domain| DomainMatcher::parse(domain)).collect();

        let mut routes = Vec::with_capacity(config.routes.len());
        for route in &config.routes {
            let action = match &route.action {
                RouteAction::DirectResponse(direct) => {
                    let status = StatusCode::from_u16(direct.status)
                        .map_err(|e| ConfigError::invalid_route(&config.name, format!("invalid status {}: {e}", direct.status)))?;
                    let body = direct.body.as_ref().map(|source| Bytes::from(source.inline_string.clone()));
                    Action::DirectResponse { status, body }
                }
                RouteAction::Route(target) => {
                    ensure!(has_cluster(&target.cluster), ConfigError::unknown_cluster(&target.cluster));
                    Action::Cluster(target.cluster.clone())
                }
            };
            routes.push(RouteEntry { path: route.route_match.clone(), action });
        }

        Ok(Self { name: config.name.clone(), domains, routes })
    }

    fn best_domain_match(&self, host: &str) -> Option<(u8, std::cmp::Reverse<usize>)> {
        self.domains.iter().filter_map(|domain| domain.rank(host)).min()
    }
}

impl DomainMatcher {
    fn parse(domain: &str) -> Self {
        let domain = domain.to_ascii_lowercase();
        if domain == "*" {
            DomainMatcher::Any
        } else if let Some(suffix) = domain.strip_prefix('*') {
            DomainMatcher::Suffix(suffix.to_string())
        } else if let Some(prefix) = domain.strip_suffix('*') {
            DomainMatcher::Prefix(prefix.to_string())
        } else {
            DomainMatcher::Exact(domain)
        }
    }

    fn rank(&self, host: &str) -> Option<(u8, std::cmp::Reverse<usize>)> {
        match self {
            DomainMatcher::Exact(exact) => (exact == host).then_some((0, std::cmp::Reverse(exact.len()))),
            DomainMatcher::Suffix(suffix) => {
                (host.len() > suffix.len() && host.ends_with(suffix.as_str())).then_some((1, std::cmp::Reverse(suffix.len())))
            }
            DomainMatcher::Prefix(prefix) => {
                (host.len() > prefix.len() && host.starts_with(prefix.as_str())).then_some((2, std::cmp::Reverse(prefix.len())))
            }
            DomainMatcher::Any => Some((3, std::cmp::Reverse(0))),
        }
    }
}

impl RouteEntry {
    fn matches(&self, path: &str) -> bool {
        match &self.path {
            RouteMatch::Prefix(prefix) => path.starts_with(prefix.as_str()),
            RouteMatch::Path(exact) => path == exact,
        }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

fn strip_port(host: &str) -> &str {
    let Some((name, port)) = host.rsplit_once(':') else {
        return host;
    };
    // an unbracketed ipv6 literal has no port, its last group only looks like one
    let bracketed = name.starts_with('[') && name.ends_with(']');
    if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) && (bracketed || !name.contains(':')) {
        name
    } else {
        host
    }
}
