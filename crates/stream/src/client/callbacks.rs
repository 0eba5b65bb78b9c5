use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::client::StreamIntel;
use crate::error::StreamError;
use crate::headers::{ResponseHeaders, ResponseTrailers};

pub(crate) type HeadersCallback = Arc<dyn Fn(ResponseHeaders, bool, StreamIntel) + Send + Sync>;
pub(crate) type DataCallback = Arc<dyn Fn(Bytes, bool, StreamIntel) + Send + Sync>;
pub(crate) type TrailersCallback = Arc<dyn Fn(ResponseTrailers, StreamIntel) + Send + Sync>;
pub(crate) type ErrorCallback = Arc<dyn Fn(StreamError, StreamIntel) + Send + Sync>;
pub(crate) type IntelCallback = Arc<dyn Fn(StreamIntel) + Send + Sync>;

/// The callbacks registered on a prototype, frozen when the stream starts.
#[derive(Clone, Default)]
pub(crate) struct StreamCallbacks {
    pub(crate) on_response_headers: Option<HeadersCallback>,
    pub(crate) on_response_data: Option<DataCallback>,
    pub(crate) on_response_trailers: Option<TrailersCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) on_cancel: Option<IntelCallback>,
    pub(crate) on_complete: Option<IntelCallback>,
    pub(crate) on_send_window_available: Option<IntelCallback>,
}

impl StreamCallbacks {
    pub(crate) fn response_headers(&self, headers: ResponseHeaders, end_stream: bool, intel: StreamIntel) {
        if let Some(callback) = &self.on_response_headers {
            callback(headers, end_stream, intel);
        }
    }

    pub(crate) fn response_data(&self, data: Bytes, end_stream: bool, intel: StreamIntel) {
        if let Some(callback) = &self.on_response_data {
            callback(data, end_stream, intel);
        }
    }

    pub(crate) fn response_trailers(&self, trailers: ResponseTrailers, intel: StreamIntel) {
        if let Some(callback) = &self.on_response_trailers {
            callback(trailers, intel);
        }
    }

    pub(crate) fn error(&self, error: StreamError, intel: StreamIntel) {
        if let Some(callback) = &self.on_error {
            callback(error, intel);
        }
    }

    pub(crate) fn cancel(&self, intel: StreamIntel) {
        if let Some(callback) = &self.on_cancel {
            callback(intel);
        }
    }

    pub(crate) fn complete(&self, intel: StreamIntel) {
        if let Some(callback) = &self.on_complete {
            callback(intel);
        }
    }

    pub(crate) fn send_window_available(&self, intel: StreamIntel) {
        if let Some(callback) = &self.on_send_window_available {
            callback(intel);
        }
    }
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_response_headers", &self.on_response_headers.is_some())
            .field("on_response_data", &self.on_response_data.is_some())
            .field("on_response_trailers", &self.on_response_trailers.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_send_window_available", &self.on_send_window_available.is_some())
            .finish()
    }
}
