use http::HeaderName;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::utils::ensure;

pub const ASSERTION_TYPE_URL: &str = "type.googleapis.com/envoymobile.extensions.filters.http.assertion.Assertion";
pub const BUFFER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.buffer.v3.Buffer";
pub const ROUTER_TYPE_URL: &str = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router";

/// One entry of the http filter chain: a unique name and its typed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpFilterConfig {
    pub name: String,
    pub typed_config: FilterConfig,
}

/// Typed filter configuration, selected by the `@type` url of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "@type")]
pub enum FilterConfig {
    #[serde(rename = "type.googleapis.com/envoymobile.extensions.filters.http.assertion.Assertion")]
    Assertion(AssertionConfig),
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.http.buffer.v3.Buffer")]
    Buffer(BufferConfig),
    #[serde(rename = "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router")]
    Router,
}

impl FilterConfig {
    pub fn type_url(&self) -> &'static str {
        match self {
            FilterConfig::Assertion(_) => ASSERTION_TYPE_URL,
            FilterConfig::Buffer(_) => BUFFER_TYPE_URL,
            FilterConfig::Router => ROUTER_TYPE_URL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionConfig {
    pub match_config: MatchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    pub max_request_bytes: u32,
}

/// What the assertion filter expects from a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfig {
    HttpRequestHeadersMatch(HeadersMatch),
    HttpRequestTrailersMatch(HeadersMatch),
    HttpRequestGenericBodyMatch(GenericBodyMatch),
    AndMatch(MatchSet),
    OrMatch(MatchSet),
    AnyMatch(bool),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadersMatch {
    pub headers: Vec<HeaderMatcher>,
}

/// Substring search in the first `bytes_limit` bytes of the body, zero means no limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericBodyMatch {
    #[serde(default)]
    pub bytes_limit: u32,
    pub patterns: Vec<BodyPattern>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPattern {
    pub string_match: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    pub rules: Vec<MatchConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMatcher {
    pub name: String,
    #[serde(flatten)]
    pub specifier: HeaderMatchSpecifier,
    #[serde(default)]
    pub invert_match: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderMatchSpecifier {
    ExactMatch(String),
    PrefixMatch(String),
    SuffixMatch(String),
    ContainsMatch(String),
    PresentMatch(bool),
}

impl HeaderMatcher {
    pub fn exact(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), specifier: HeaderMatchSpecifier::ExactMatch(value.into()), invert_match: false }
    }

    pub fn present(name: impl Into<String>) -> Self {
        Self { name: name.into(), specifier: HeaderMatchSpecifier::PresentMatch(true), invert_match: false }
    }

    pub(crate) fn header_name(&self) -> Result<HeaderName, ConfigError> {
        HeaderName::from_bytes(self.name.as_bytes())
            .map_err(|e| ConfigError::invalid_header_matcher(format!("{:?} is not a valid header name: {e}", self.name)))
    }
}

impl HttpFilterConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match &self.typed_config {
            FilterConfig::Assertion(assertion) => assertion.match_config.validate(),
            FilterConfig::Buffer(buffer) => {
                ensure!(buffer.max_request_bytes > 0, ConfigError::invalid_filter(&self.name, "max_request_bytes must be positive"));
                Ok(())
            }
            FilterConfig::Router => Ok(()),
        }
    }
}

impl MatchConfig {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            MatchConfig::HttpRequestHeadersMatch(headers) | MatchConfig::HttpRequestTrailersMatch(headers) => {
                for matcher in &headers.headers {
                    matcher.header_name()?;
                }
                Ok(())
            }
            MatchConfig::HttpRequestGenericBodyMatch(body) => {
                ensure!(!body.patterns.is_empty(), ConfigError::invalid_header_matcher("generic body match needs at least one pattern"));
                ensure!(
                    body.patterns.iter().all(|pattern| !pattern.string_match.is_empty()),
                    ConfigError::invalid_header_matcher("body patterns must not be empty")
                );
                Ok(())
            }
            MatchConfig::AndMatch(set) | MatchConfig::OrMatch(set) => {
                ensure!(!set.rules.is_empty(), ConfigError::invalid_header_matcher("and/or match needs at least one rule"));
                set.rules.iter().try_for_each(MatchConfig::validate)
            }
            MatchConfig::AnyMatch(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn parse_assertion_filter() {
        let json = indoc! {r#"
        {
          "name": "envoy.filters.http.assertion",
          "typed_config": {
            "@type": "type.googleapis.com/envoymobile.extensions.filters.http.assertion.Assertion",
            "match_config": {
              "http_request_trailers_match": {
                "headers": [
                  { "name": "test-trailer", "exact_match": "test.code" },
                  { "name": "x-absent", "present_match": true, "invert_match": true }
                ]
              }
            }
          }
        }
        "#};

        let filter: HttpFilterConfig = serde_json::from_str(json).unwrap();
        assert_eq!(filter.name, "envoy.filters.http.assertion");
        assert_eq!(filter.typed_config.type_url(), ASSERTION_TYPE_URL);

        let FilterConfig::Assertion(assertion) = filter.typed_config else {
            panic!("expected an assertion filter");
        };
        let MatchConfig::HttpRequestTrailersMatch(trailers) = assertion.match_config else {
            panic!("expected a trailers match");
        };
        assert_eq!(trailers.headers[0], HeaderMatcher::exact("test-trailer", "test.code"));
        assert_eq!(trailers.headers[1].specifier, HeaderMatchSpecifier::PresentMatch(true));
        assert!(trailers.headers[1].invert_match);
    }

    #[test]
    fn parse_nested_match() {
        let json = indoc! {r#"
        {
          "and_match": {
            "rules": [
              { "http_request_headers_match": { "headers": [{ "name": ":path", "prefix_match": "/" }] } },
              { "http_request_generic_body_match": { "bytes_limit": 10, "patterns": [{ "string_match": "match_me" }] } },
              { "any_match": true }
            ]
          }
        }
        "#};

        let match_config: MatchConfig = serde_json::from_str(json).unwrap();
        let MatchConfig::AndMatch(set) = &match_config else {
            panic!("expected an and match");
        };
        assert_eq!(set.rules.len(), 3);
        assert!(matches!(&set.rules[1], MatchConfig::HttpRequestGenericBodyMatch(body) if body.bytes_limit == 10));

        // ":path" is not a valid field name for a header matcher
        assert!(matches!(match_config.validate(), Err(ConfigError::InvalidHeaderMatcher { .. })));
    }

    #[test]
    fn buffer_limit_must_be_positive() {
        let filter = HttpFilterConfig {
            name: "buffer".into(),
            typed_config: FilterConfig::Buffer(BufferConfig { max_request_bytes: 0 }),
        };
        assert!(matches!(filter.validate(), Err(ConfigError::InvalidFilter { name, .. }) if name == "buffer"));
    }

    #[test]
    fn empty_rule_sets_are_rejected() {
        assert!(MatchConfig::OrMatch(MatchSet { rules: vec![] }).validate().is_err());
        let body = GenericBodyMatch { bytes_limit: 0, patterns: vec![] };
        assert!(MatchConfig::HttpRequestGenericBodyMatch(body).validate().is_err());
        assert!(MatchConfig::AnyMatch(true).validate().is_ok());
    }
}
