use http::{HeaderMap, StatusCode};

use crate::headers::HeaderSet;

/// Response head delivered to `on_response_headers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    status: StatusCode,
    headers: HeaderSet,
}

impl ResponseHeaders {
    pub fn new(status: StatusCode, headers: HeaderSet) -> Self {
        Self { status, headers }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The numeric http status code
    pub fn http_status(&self) -> u16 {
        self.status.as_u16()
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }
}

impl From<(StatusCode, HeaderMap)> for ResponseHeaders {
    fn from((status, headers): (StatusCode, HeaderMap)) -> Self {
        Self { status, headers: HeaderSet::from(headers) }
    }
}

/// Response trailers delivered to `on_response_trailers`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTrailers {
    trailers: HeaderSet,
}

impl ResponseTrailers {
    pub fn new(trailers: HeaderSet) -> Self {
        Self { trailers }
    }

    pub fn trailers(&self) -> &HeaderSet {
        &self.trailers
    }
}

impl From<HeaderMap> for ResponseTrailers {
    fn from(map: HeaderMap) -> Self {
        Self { trailers: HeaderSet::from(map) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn from_engine_parts() {
        let mut map = HeaderMap::new();
        map.insert("content-length", HeaderValue::from_static("5"));

        let headers = ResponseHeaders::from((StatusCode::NOT_FOUND, map));
        assert_eq!(headers.http_status(), 404);
        assert_eq!(headers.headers().value("content-length"), Some("5"));
    }
}
