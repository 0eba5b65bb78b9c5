use std::sync::Arc;

use http::HeaderMap;

use crate::filter::matcher::{MatchInput, Matcher};
use crate::filter::{FilterStatus, HttpFilter};
use crate::protocol::RequestHead;

/// Rejects every request that does not satisfy the configured matcher.
///
/// Header-only matchers are evaluated as soon as the headers arrive; anything that
/// looks at the body or the trailers is evaluated once the request side ends. A
/// trailers matcher fails when the request ends without trailers.
#[derive(Debug)]
pub struct AssertionFilter {
    name: String,
    matcher: Arc<Matcher>,
    headers: Option<HeaderMap>,
    body: Vec<u8>,
    body_limit: Option<usize>,
    decided: bool,
}

impl AssertionFilter {
    pub(crate) fn new(name: impl Into<String>, matcher: Arc<Matcher>) -> Self {
        let body_limit = matcher.body_limit();
        Self { name: name.into(), matcher, headers: None, body: Vec::new(), body_limit, decided: false }
    }

    fn evaluate(&mut self, trailers: Option<&HeaderMap>) -> FilterStatus {
        self.decided = true;
        let input = MatchInput { headers: self.headers.as_ref(), body: &self.body, trailers };
        if self.matcher.matches(&input) {
            FilterStatus::Continue
        } else {
            FilterStatus::Reject(self.matcher.describe().to_string())
        }
    }
}

impl HttpFilter for AssertionFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_request_headers(&mut self, head: &mut RequestHead, end_stream: bool) -> FilterStatus {
        self.headers = Some(head.headers().clone());
        if end_stream || self.matcher.headers_only() {
            return self.evaluate(None);
        }
        FilterStatus::Continue
    }

    fn on_request_data(&mut self, data: &[u8], end_stream: bool) -> FilterStatus {
        if self.decided {
            return FilterStatus::Continue;
        }

        let wanted = match self.body_limit {
            Some(limit) => limit.saturating_sub(self.body.len()).min(data.len()),
            None => data.len(),
        };
        self.body.extend_from_slice(&data[..wanted]);

        if end_stream {
            return self.evaluate(None);
        }
        FilterStatus::Continue
    }

    fn on_request_trailers(&mut self, trailers: &mut HeaderMap) -> FilterStatus {
        if self.decided {
            return FilterStatus::Continue;
        }
        self.evaluate(Some(trailers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BodyPattern, GenericBodyMatch, HeaderMatcher, HeadersMatch, MatchConfig};
    use crate::filter::{FilterChain, FilterInterrupt};
    use crate::protocol::RequestFrame;
    use http::{HeaderValue, Method};

    fn filter(config: MatchConfig) -> AssertionFilter {
        AssertionFilter::new("envoy.filters.http.assertion", Arc::new(Matcher::compile(&config).unwrap()))
    }

    fn trailer_assertion() -> AssertionFilter {
        filter(MatchConfig::HttpRequestTrailersMatch(HeadersMatch {
            headers: vec![HeaderMatcher::exact("test-trailer", "test.code")],
        }))
    }

    fn head() -> RequestHead {
        let mut headers = HeaderMap::new();
        headers.insert("x-client", HeaderValue::from_static("test"));
        RequestHead::new(Method::GET, "https", "example.com", "/test", headers)
    }

    fn trailers(value: &'static str) -> HeaderMap {
        let mut trailers = HeaderMap::new();
        trailers.insert("test-trailer", HeaderValue::from_static(value));
        trailers
    }

    #[test]
    fn matching_trailers_pass() {
        let mut filter = trailer_assertion();
        assert!(matches!(filter.on_request_headers(&mut head(), false), FilterStatus::Continue));
        assert!(matches!(filter.on_request_data(b"match_me", false), FilterStatus::Continue));
        assert!(matches!(filter.on_request_trailers(&mut trailers("test.code")), FilterStatus::Continue));
    }

    #[test]
    fn mismatching_trailers_are_rejected() {
        let mut filter = trailer_assertion();
        filter.on_request_headers(&mut head(), false);
        filter.on_request_data(b"match_me", false);
        match filter.on_request_trailers(&mut trailers("wrong.code")) {
            FilterStatus::Reject(reason) => assert_eq!(reason, "request trailers do not match configured expectations"),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn missing_trailers_are_rejected_at_end_of_body() {
        let mut filter = trailer_assertion();
        filter.on_request_headers(&mut head(), false);
        assert!(matches!(filter.on_request_data(b"match_me", true), FilterStatus::Reject(_)));

        let mut filter = trailer_assertion();
        assert!(matches!(filter.on_request_headers(&mut head(), true), FilterStatus::Reject(_)));
    }

    #[test]
    fn header_assertion_decides_early() {
        let mut filter = filter(MatchConfig::HttpRequestHeadersMatch(HeadersMatch {
            headers: vec![HeaderMatcher::exact("x-client", "other")],
        }));
        assert!(matches!(filter.on_request_headers(&mut head(), false), FilterStatus::Reject(_)));
    }

    #[test]
    fn body_assertion_sees_all_chunks() {
        let config = MatchConfig::HttpRequestGenericBodyMatch(GenericBodyMatch {
            bytes_limit: 0,
            patterns: vec![BodyPattern { string_match: "match_me".into() }],
        });
        let mut chain = FilterChain::new(vec![Box::new(filter(config))]);

        chain.decode(RequestFrame::headers(head(), false)).unwrap();
        chain.decode(RequestFrame::data("mat", false)).unwrap();
        let out = chain.decode(RequestFrame::data("ch_me", true)).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn rejection_through_the_chain() {
        let mut chain = FilterChain::new(vec![Box::new(trailer_assertion())]);
        chain.decode(RequestFrame::headers(head(), false)).unwrap();
        chain.decode(RequestFrame::data("match_me", false)).unwrap();
        let interrupt = chain.decode(RequestFrame::trailers(trailers("nope"))).unwrap_err();
        assert!(matches!(interrupt, FilterInterrupt::Rejected { filter, .. } if filter == "envoy.filters.http.assertion"));
    }
}
