use bytes::{Bytes, BytesMut};
use http::{HeaderMap, Request};

use crate::protocol::{ProxyError, RequestFrame, RequestHead};
use crate::utils::ensure;

/// Collects the filtered request frames into one request for the router.
#[derive(Debug, Default)]
pub struct RequestAssembler {
    head: Option<RequestHead>,
    body: BytesMut,
    trailers: Option<HeaderMap>,
    complete: bool,
}

/// A fully received request.
#[derive(Debug)]
pub struct AssembledRequest {
    pub head: RequestHead,
    pub body: Bytes,
    pub trailers: Option<HeaderMap>,
}

impl RequestAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: RequestFrame) -> Result<(), ProxyError> {
        ensure!(!self.complete, ProxyError::internal(format!("{} frame after the end of the request", frame.kind())));

        self.complete = frame.is_end_stream();
        match frame {
            RequestFrame::Headers { head, .. } => {
                ensure!(self.head.is_none(), ProxyError::internal("request headers received twice"));
                self.head = Some(head);
            }
            RequestFrame::Data { data, .. } => {
                ensure!(self.head.is_some(), ProxyError::internal("request data before request headers"));
                self.body.extend_from_slice(&data);
            }
            RequestFrame::Trailers(trailers) => {
                ensure!(self.head.is_some(), ProxyError::internal("request trailers before request headers"));
                self.trailers = Some(trailers);
            }
        }
        Ok(())
    }

    /// Returns true once the request side has ended
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn head(&self) -> Option<&RequestHead> {
        self.head.as_ref()
    }

    pub fn into_request(self) -> Result<AssembledRequest, ProxyError> {
        ensure!(self.complete, ProxyError::internal("request is not complete"));
        let head = self.head.ok_or_else(|| ProxyError::internal("request without headers"))?;
        Ok(AssembledRequest { head, body: self.body.freeze(), trailers: self.trailers })
    }
}

impl AssembledRequest {
    /// Converts into an `http::Request`, trailers travel in the request extensions.
    pub fn into_http(self) -> Result<Request<Bytes>, ProxyError> {
        self.head.into_request(self.body, self.trailers)
    }
}
