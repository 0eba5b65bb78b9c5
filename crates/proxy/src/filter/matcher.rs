//! Compiled request matchers used by the assertion filter.

use http::{HeaderMap, HeaderName};

use crate::config::{ConfigError, HeaderMatchSpecifier, HeaderMatcher, MatchConfig};

/// Everything a matcher may look at. Parts that were not received are `None`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchInput<'a> {
    pub headers: Option<&'a HeaderMap>,
    pub body: &'a [u8],
    pub trailers: Option<&'a HeaderMap>,
}

#[derive(Debug)]
pub(crate) enum Matcher {
    Headers(Vec<HeaderRule>),
    Trailers(Vec<HeaderRule>),
    Body { patterns: Vec<Vec<u8>>, limit: Option<usize> },
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    Always(bool),
}

#[derive(Debug)]
pub(crate) struct HeaderRule {
    name: HeaderName,
    specifier: HeaderMatchSpecifier,
    invert: bool,
}

impl Matcher {
    pub(crate) fn compile(config: &MatchConfig) -> Result<Self, ConfigError> {
        let matcher = match config {
            MatchConfig::HttpRequestHeadersMatch(headers) => Matcher::Headers(compile_rules(&headers.headers)?),
            MatchConfig::HttpRequestTrailersMatch(trailers) => Matcher::Trailers(compile_rules(&trailers.headers)?),
            MatchConfig::HttpRequestGenericBodyMatch(body) => Matcher::Body {
                patterns: body.patterns.iter().map(|pattern| pattern.string_match.as_bytes().to_vec()).collect(),
                limit: (body.bytes_limit > 0).then_some(body.bytes_limit as usize),
            },
            MatchConfig::AndMatch(set) => Matcher::All(set.rules.iter().map(Matcher::compile).collect::<Result<_, _>>()?),
            MatchConfig::OrMatch(set) => Matcher::Any(set.rules.iter().map(Matcher::compile).collect::<Result<_, _>>()?),
            MatchConfig::AnyMatch(value) => Matcher::Always(*value),
        };
        Ok(matcher)
    }

    pub(crate) fn matches(&self, input: &MatchInput<'_>) -> bool {
        match self {
            Matcher::Headers(rules) => input.headers.is_some_and(|headers| rules.iter().all(|rule| rule.matches(headers))),
            Matcher::Trailers(rules) => input.trailers.is_some_and(|trailers| rules.iter().all(|rule| rule.matches(trailers))),
            Matcher::Body { patterns, limit } => {
                let body = match limit {
                    Some(limit) => &input.body[..input.body.len().min(*limit)],
                    None => input.body,
                };
                patterns.iter().all(|pattern| contains(body, pattern))
            }
            Matcher::All(matchers) => matchers.iter().all(|matcher| matcher.matches(input)),
            Matcher::Any(matchers) => matchers.iter().any(|matcher| matcher.matches(input)),
            Matcher::Always(value) => *value,
        }
    }

    /// Returns true when the verdict only depends on the request headers
    pub(crate) fn headers_only(&self) -> bool {
        match self {
            Matcher::Headers(_) | Matcher::Always(_) => true,
            Matcher::Trailers(_) | Matcher::Body { .. } => false,
            Matcher::All(matchers) | Matcher::Any(matchers) => matchers.iter().all(Matcher::headers_only),
        }
    }

    /// How many body bytes the matcher may inspect, `None` meaning unbounded
    pub(crate) fn body_limit(&self) -> Option<usize> {
        match self {
            Matcher::Headers(_) | Matcher::Trailers(_) | Matcher::Always(_) => Some(0),
            Matcher::Body { limit, .. } => *limit,
            Matcher::All(matchers) | Matcher::Any(matchers) => {
                matchers.iter().try_fold(0, |max, matcher| matcher.body_limit().map(|limit| max.max(limit)))
            }
        }
    }

    /// Short description of what was expected, used in rejection reasons
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Matcher::Headers(_) => "request headers do not match configured expectations",
            Matcher::Trailers(_) => "request trailers do not match configured expectations",
            Matcher::Body { .. } => "request body does not match configured expectations",
            Matcher::All(_) | Matcher::Any(_) | Matcher::Always(_) => "request does not match configured expectations",
        }
    }
}

fn compile_rules(matchers: &[HeaderMatcher]) -> Result<Vec<HeaderRule>, ConfigError> {
    matchers
        .iter()
        .map(|matcher| {
            Ok(HeaderRule { name: matcher.header_name()?, specifier: matcher.specifier.clone(), invert: matcher.invert_match })
        })
        .collect()
}

impl HeaderRule {
    fn matches(&self, headers: &HeaderMap) -> bool {
        let mut values = headers.get_all(&self.name).iter().filter_map(|value| value.to_str().ok());
        let matched = match &self.specifier {
            HeaderMatchSpecifier::PresentMatch(present) => headers.contains_key(&self.name) == *present,
            HeaderMatchSpecifier::ExactMatch(expected) => values.any(|value| value == expected),
            HeaderMatchSpecifier::PrefixMatch(prefix) => values.any(|value| value.starts_with(prefix.as_str())),
            HeaderMatchSpecifier::SuffixMatch(suffix) => values.any(|value| value.ends_with(suffix.as_str())),
            HeaderMatchSpecifier::ContainsMatch(needle) => values.any(|value| value.contains(needle.as_str())),
        };
        matched != self.invert
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|window| window == needle)
}
