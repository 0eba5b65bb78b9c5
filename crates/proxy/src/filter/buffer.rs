use http::StatusCode;
use tracing::warn;

use crate::filter::{FilterStatus, HttpFilter, LocalReply};

/// Holds the whole request body until the request side ends.
///
/// A body larger than `max_request_bytes` is answered locally with `413 Payload Too Large`.
#[derive(Debug)]
pub struct BufferFilter {
    name: String,
    max_request_bytes: usize,
}

impl BufferFilter {
    pub(crate) fn new(name: impl Into<String>, max_request_bytes: usize) -> Self {
        Self { name: name.into(), max_request_bytes }
    }
}

impl HttpFilter for BufferFilter {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_request_data(&mut self, data: &[u8], end_stream: bool) -> FilterStatus {
        if data.len() > self.max_request_bytes {
            warn!(filter = %self.name, buffered = data.len(), limit = self.max_request_bytes, "request body exceeds buffer limit");
            return FilterStatus::LocalReply(LocalReply::with_body(StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large"));
        }

        if end_stream { FilterStatus::Continue } else { FilterStatus::StopAndBuffer }
    }
}
