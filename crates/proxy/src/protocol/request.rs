//! Request head handling.
//!
//! The head carries the four request pseudo fields (method, scheme, authority and
//! path) next to the ordinary header map, the way an HTTP/2 request starts.

use bytes::Bytes;
use http::{HeaderMap, Method, Request, Uri};

use crate::protocol::ProxyError;

/// Represents the head of a request stream.
#[derive(Debug, Clone)]
pub struct RequestHead {
    method: Method,
    scheme: String,
    authority: String,
    path: String,
    headers: HeaderMap,
}

/// Request trailers, attached to the extensions of requests forwarded to an upstream.
#[derive(Debug, Clone, Default)]
pub struct RequestTrailers(pub HeaderMap);

impl RequestHead {
    pub fn new(
        method: Method,
        scheme: impl Into<String>,
        authority: impl Into<String>,
        path: impl Into<String>,
        headers: HeaderMap,
    ) -> Self {
        Self { method, scheme: scheme.into(), authority: authority.into(), path: path.into(), headers }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns the raw path, including the query string if any
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the path without the query string, this is what routes match on
    pub fn route_path(&self) -> &str {
        self.path.split_once('?').map_or(self.path.as_str(), |(path, _query)| path)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Builds a full `http::Request` from this head and a body.
    ///
    /// Fails when scheme, authority and path don't form a valid absolute uri.
    pub fn into_request(self, body: Bytes, trailers: Option<HeaderMap>) -> Result<Request<Bytes>, ProxyError> {
        let uri = Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(self.path.as_str())
            .build()
            .map_err(|e| ProxyError::internal(format!("invalid request uri: {e}")))?;

        let mut request = Request::new(body);
        *request.method_mut() = self.method;
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        if let Some(trailers) = trailers {
            request.extensions_mut().insert(RequestTrailers(trailers));
        }
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn route_path_strips_query() {
        let head = RequestHead::new(Method::GET, "https", "example.com", "/index/?a=1&b=2", HeaderMap::new());
        assert_eq!(head.path(), "/index/?a=1&b=2");
        assert_eq!(head.route_path(), "/index/");

        let head = RequestHead::new(Method::GET, "https", "example.com", "/plain", HeaderMap::new());
        assert_eq!(head.route_path(), "/plain");
    }

    #[test]
    fn into_request_keeps_everything() {
        let mut headers = HeaderMap::new();
        headers.append("x-multi", HeaderValue::from_static("1"));
        headers.append("x-multi", HeaderValue::from_static("2"));
        let mut trailers = HeaderMap::new();
        trailers.insert("test-trailer", HeaderValue::from_static("test.code"));

        let head = RequestHead::new(Method::POST, "https", "example.com:8443", "/upload?x=1", headers);
        let request = head.into_request(Bytes::from_static(b"body"), Some(trailers)).unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().to_string(), "https://example.com:8443/upload?x=1");
        assert_eq!(request.headers().get_all("x-multi").iter().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(request.body(), &Bytes::from_static(b"body"));
        let trailers = request.extensions().get::<RequestTrailers>().unwrap();
        assert_eq!(trailers.0.get("test-trailer").unwrap(), "test.code");
    }

    #[test]
    fn into_request_rejects_bad_authority() {
        let head = RequestHead::new(Method::GET, "https", "bad authority", "/", HeaderMap::new());
        assert!(head.into_request(Bytes::new(), None).is_err());
    }
}
