use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::protocol::{ProxyError, RequestHead};

/// A frame travelling from the client into the proxy core.
///
/// A well formed request is one `Headers` frame, zero or more `Data` frames and an
/// optional `Trailers` frame. The request side ends with the first frame whose
/// `end_stream` flag is set, or with the trailers.
#[derive(Debug)]
pub enum RequestFrame {
    /// The request head, with `end_stream` set when no body or trailers follow
    Headers { head: RequestHead, end_stream: bool },
    /// A chunk of request body
    Data { data: Bytes, end_stream: bool },
    /// Request trailers, always the last frame
    Trailers(HeaderMap),
}

impl RequestFrame {
    #[inline]
    pub fn headers(head: RequestHead, end_stream: bool) -> Self {
        Self::Headers { head, end_stream }
    }

    #[inline]
    pub fn data(data: impl Into<Bytes>, end_stream: bool) -> Self {
        Self::Data { data: data.into(), end_stream }
    }

    #[inline]
    pub fn trailers(trailers: HeaderMap) -> Self {
        Self::Trailers(trailers)
    }

    /// Returns true if no request frame may follow this one
    pub fn is_end_stream(&self) -> bool {
        match self {
            RequestFrame::Headers { end_stream, .. } | RequestFrame::Data { end_stream, .. } => *end_stream,
            RequestFrame::Trailers(_) => true,
        }
    }

    /// Short name used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            RequestFrame::Headers { .. } => "headers",
            RequestFrame::Data { .. } => "data",
            RequestFrame::Trailers(_) => "trailers",
        }
    }
}

/// An event travelling from the proxy core back to the client.
///
/// Events of one stream are emitted in order: headers, data, trailers and then exactly
/// one terminal event. `SendWindowAvailable` is out of band and may be interleaved
/// anywhere before the terminal event.
#[derive(Debug)]
pub enum ResponseEvent {
    /// Response head; any status code, including non-2xx, is an ordinary response
    Headers { status: StatusCode, headers: HeaderMap, end_stream: bool },
    /// A chunk of response body
    Data { data: Bytes, end_stream: bool },
    /// Response trailers, they end the response
    Trailers(HeaderMap),
    /// The core consumed the last request body chunk and is ready for another one
    SendWindowAvailable,
    /// Terminal: the exchange finished successfully
    Complete,
    /// Terminal: the exchange failed
    Error(ProxyError),
}

impl ResponseEvent {
    #[inline]
    pub fn headers(status: StatusCode, headers: HeaderMap, end_stream: bool) -> Self {
        Self::Headers { status, headers, end_stream }
    }

    #[inline]
    pub fn data(data: impl Into<Bytes>, end_stream: bool) -> Self {
        Self::Data { data: data.into(), end_stream }
    }

    /// Returns true for `Complete` and `Error`
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResponseEvent::Complete | ResponseEvent::Error(_))
    }

    /// Short name used in logs and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseEvent::Headers { .. } => "headers",
            ResponseEvent::Data { .. } => "data",
            ResponseEvent::Trailers(_) => "trailers",
            ResponseEvent::SendWindowAvailable => "send_window_available",
            ResponseEvent::Complete => "complete",
            ResponseEvent::Error(_) => "error",
        }
    }
}
