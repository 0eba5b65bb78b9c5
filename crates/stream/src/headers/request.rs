use http::uri::{Authority, PathAndQuery, Scheme};
use http::Method;
use micro_proxy::protocol::RequestHead;

use crate::error::ClientError;
use crate::headers::{HeaderSet, HeaderSetBuilder};

/// The head of a request: the four pseudo fields plus ordinary headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    method: Method,
    scheme: String,
    authority: String,
    path: String,
    headers: HeaderSet,
}

#[derive(Debug, Clone)]
pub struct RequestHeadersBuilder {
    method: Method,
    scheme: String,
    authority: String,
    path: String,
    headers: HeaderSetBuilder,
}

impl RequestHeaders {
    pub fn builder(
        method: Method,
        scheme: impl Into<String>,
        authority: impl Into<String>,
        path: impl Into<String>,
    ) -> RequestHeadersBuilder {
        RequestHeadersBuilder::new(method, scheme, authority, path)
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

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    pub fn to_builder(&self) -> RequestHeadersBuilder {
        RequestHeadersBuilder {
            method: self.method.clone(),
            scheme: self.scheme.clone(),
            authority: self.authority.clone(),
            path: self.path.clone(),
            headers: self.headers.to_builder(),
        }
    }

    pub(crate) fn to_head(&self) -> RequestHead {
        RequestHead::new(
            self.method.clone(),
            self.scheme.as_str(),
            self.authority.as_str(),
            self.path.as_str(),
            self.headers.to_header_map(),
        )
    }
}

impl RequestHeadersBuilder {
    pub fn new(method: Method, scheme: impl Into<String>, authority: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method,
            scheme: scheme.into(),
            authority: authority.into(),
            path: path.into(),
            headers: HeaderSetBuilder::new(),
        }
    }

    #[must_use]
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.add(name, value);
        self
    }

    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.set(name, value);
        self
    }

    #[must_use]
    pub fn remove(mut self, name: &str) -> Self {
        self.headers = self.headers.remove(name);
        self
    }

    /// Validates the pseudo fields and the headers.
    pub fn build(self) -> Result<RequestHeaders, ClientError> {
        check_field("scheme", &self.scheme)?;
        check_field("authority", &self.authority)?;
        check_field("path", &self.path)?;

        self.scheme.parse::<Scheme>().map_err(|e| ClientError::invalid_header(format!("invalid scheme {:?}: {e}", self.scheme)))?;
        self.authority
            .parse::<Authority>()
            .map_err(|e| ClientError::invalid_header(format!("invalid authority {:?}: {e}", self.authority)))?;
        let path = self.path.parse::<PathAndQuery>().map_err(|e| ClientError::invalid_header(format!("invalid path {:?}: {e}", self.path)))?;
        if !path.as_str().starts_with('/') {
            return Err(ClientError::invalid_header(format!("path {:?} must start with '/'", self.path)));
        }

        Ok(RequestHeaders {
            method: self.method,
            scheme: self.scheme,
            authority: self.authority,
            path: self.path,
            headers: self.headers.build()?,
        })
    }
}

fn check_field(field: &str, value: &str) -> Result<(), ClientError> {
    if value.is_empty() {
        return Err(ClientError::invalid_header(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Trailers of a request, always the last request frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTrailers {
    trailers: HeaderSet,
}

#[derive(Debug, Clone, Default)]
pub struct RequestTrailersBuilder {
    trailers: HeaderSetBuilder,
}

impl RequestTrailers {
    pub fn builder() -> RequestTrailersBuilder {
        RequestTrailersBuilder::default()
    }

    pub fn trailers(&self) -> &HeaderSet {
        &self.trailers
    }

    pub fn to_builder(&self) -> RequestTrailersBuilder {
        RequestTrailersBuilder { trailers: self.trailers.to_builder() }
    }
}

impl RequestTrailersBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn add(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.trailers = self.trailers.add(name, value);
        self
    }

    #[must_use]
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.trailers = self.trailers.set(name, value);
        self
    }

    #[must_use]
    pub fn remove(mut self, name: &str) -> Self {
        self.trailers = self.trailers.remove(name);
        self
    }

    pub fn build(self) -> Result<RequestTrailers, ClientError> {
        Ok(RequestTrailers { trailers: self.trailers.build()? })
    }
}
