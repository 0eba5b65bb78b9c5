//! HTTP filter chain applied to every request stream.
//!
//! Each stream owns a fresh [`FilterChain`] built from the compiled configuration.
//! Request frames enter the chain one at a time and travel through the filters in
//! configuration order; whatever leaves the last filter is handed to the router stage.
//!
//! A filter decides per frame with a [`FilterStatus`]:
//!
//! - `Continue`: pass the frame on
//! - `StopAndBuffer`: keep the body in the chain until the filter continues, the
//!   filter then sees the whole buffered body on each following data frame
//! - `LocalReply`: stop the stream and answer locally with a status code
//! - `Reject`: stop the stream with a filter rejection error
//!
//! ## Thread Safety
//!
//! A chain belongs to one stream and is driven by one task, so filters only need
//! to be `Send`.

mod assertion;
mod buffer;
mod matcher;

pub use assertion::AssertionFilter;
pub use buffer::BufferFilter;
pub(crate) use matcher::Matcher;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, StatusCode};
use tracing::debug;

use crate::protocol::{RequestFrame, RequestHead};

/// Verdict of a filter on one frame.
#[derive(Debug)]
pub enum FilterStatus {
    Continue,
    StopAndBuffer,
    LocalReply(LocalReply),
    Reject(String),
}

/// A response produced by the proxy itself instead of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalReply {
    pub status: StatusCode,
    pub body: Option<Bytes>,
}

impl LocalReply {
    pub fn new(status: StatusCode) -> Self {
        Self { status, body: None }
    }

    pub fn with_body(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, body: Some(body.into()) }
    }
}

/// Why the chain stopped processing a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterInterrupt {
    LocalReply(LocalReply),
    Rejected { filter: String, reason: String },
}

/// Core trait of a request filter.
///
/// All methods default to `Continue`, so a filter only implements the hooks it cares about.
pub trait HttpFilter: Send {
    /// The configured name of this filter
    fn name(&self) -> &str;

    fn on_request_headers(&mut self, _head: &mut RequestHead, _end_stream: bool) -> FilterStatus {
        FilterStatus::Continue
    }

    /// Called for each data frame. When the filter asked to buffer, `data` is the whole
    /// body buffered so far including the new chunk.
    fn on_request_data(&mut self, _data: &[u8], _end_stream: bool) -> FilterStatus {
        FilterStatus::Continue
    }

    fn on_request_trailers(&mut self, _trailers: &mut HeaderMap) -> FilterStatus {
        FilterStatus::Continue
    }
}

/// The ordered filters of one stream plus the body each of them buffers.
pub struct FilterChain {
    filters: Vec<Box<dyn HttpFilter>>,
    buffers: Vec<Option<BytesMut>>,
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain").field("filters", &self.filters.iter().map(|filter| filter.name()).collect::<Vec<_>>()).finish()
    }
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn HttpFilter>>) -> Self {
        let buffers = filters.iter().map(|_| None).collect();
        Self { filters, buffers }
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs one frame through every filter.
    ///
    /// Returns the frames that made it out of the last filter, in order. The list is
    /// empty while a filter is buffering and may hold several frames when a buffer
    /// is released.
    pub fn decode(&mut self, frame: RequestFrame) -> Result<Vec<RequestFrame>, FilterInterrupt> {
        let mut frames = vec![frame];
        for index in 0..self.filters.len() {
            let mut forwarded = Vec::with_capacity(frames.len());
            for frame in frames {
                self.decode_at(index, frame, &mut forwarded)?;
            }
            if forwarded.is_empty() {
                return Ok(forwarded);
            }
            frames = forwarded;
        }
        Ok(frames)
    }

    fn decode_at(&mut self, index: usize, frame: RequestFrame, out: &mut Vec<RequestFrame>) -> Result<(), FilterInterrupt> {
        let filter = &mut self.filters[index];
        match frame {
            RequestFrame::Headers { mut head, end_stream } => {
                let status = filter.on_request_headers(&mut head, end_stream);
                interrupt(filter.as_ref(), status)?;
                out.push(RequestFrame::Headers { head, end_stream });
            }

            RequestFrame::Data { data, end_stream } => {
                let status = match &mut self.buffers[index] {
                    Some(buffered) => {
                        buffered.extend_from_slice(&data);
                        filter.on_request_data(buffered, end_stream)
                    }
                    None => filter.on_request_data(&data, end_stream),
                };

                if interrupt(filter.as_ref(), status)? && !end_stream {
                    self.buffers[index].get_or_insert_with(|| BytesMut::from(&data[..]));
                    debug!(filter = filter.name(), buffered = self.buffers[index].as_ref().map_or(0, BytesMut::len), "buffering request body");
                    return Ok(());
                }

                match self.buffers[index].take() {
                    Some(buffered) => out.push(RequestFrame::Data { data: buffered.freeze(), end_stream }),
                    None => out.push(RequestFrame::Data { data, end_stream }),
                }
            }

            RequestFrame::Trailers(mut trailers) => {
                let status = filter.on_request_trailers(&mut trailers);
                interrupt(filter.as_ref(), status)?;
                if let Some(buffered) = self.buffers[index].take() {
                    out.push(RequestFrame::Data { data: buffered.freeze(), end_stream: false });
                }
                out.push(RequestFrame::Trailers(trailers));
            }
        }
        Ok(())
    }
}

/// Maps a status onto the chain control flow, returning true when the filter wants to buffer.
fn interrupt(filter: &dyn HttpFilter, status: FilterStatus) -> Result<bool, FilterInterrupt> {
    match status {
        FilterStatus::Continue => Ok(false),
        FilterStatus::StopAndBuffer => Ok(true),
        FilterStatus::LocalReply(reply) => {
            debug!(filter = filter.name(), status = %reply.status, "filter sent a local reply");
            Err(FilterInterrupt::LocalReply(reply))
        }
        FilterStatus::Reject(reason) => {
            debug!(filter = filter.name(), reason = %reason, "filter rejected the request");
            Err(FilterInterrupt::Rejected { filter: filter.name().to_string(), reason })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Method};

    /// Records what it saw and buffers until the end of the body.
    struct Recorder {
        seen: std::sync::Arc<std::sync::Mutex<Vec<String>>>,
        buffer: bool,
    }

    impl HttpFilter for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn on_request_headers(&mut self, head: &mut RequestHead, _end_stream: bool) -> FilterStatus {
            head.headers_mut().insert("x-recorded", HeaderValue::from_static("yes"));
            self.seen.lock().unwrap().push("headers".into());
            FilterStatus::Continue
        }

        fn on_request_data(&mut self, data: &[u8], end_stream: bool) -> FilterStatus {
            self.seen.lock().unwrap().push(format!("data:{}:{end_stream}", String::from_utf8_lossy(data)));
            if self.buffer { FilterStatus::StopAndBuffer } else { FilterStatus::Continue }
        }
    }

    struct Rejecting;

    impl HttpFilter for Rejecting {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn on_request_trailers(&mut self, _trailers: &mut HeaderMap) -> FilterStatus {
            FilterStatus::Reject("no trailers allowed".into())
        }
    }

    fn head() -> RequestHead {
        RequestHead::new(Method::POST, "https", "example.com", "/test", HeaderMap::new())
    }

    fn recorder(buffer: bool) -> (Box<dyn HttpFilter>, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
        (Box::new(Recorder { seen: seen.clone(), buffer }), seen)
    }

    #[test]
    fn empty_chain_forwards_everything() {
        let mut chain = FilterChain::new(vec![]);
        assert!(chain.is_empty());
        let out = chain.decode(RequestFrame::data("abc", true)).unwrap();
        assert!(matches!(out.as_slice(), [RequestFrame::Data { end_stream: true, .. }]));
    }

    #[test]
    fn headers_are_mutable_by_filters() {
        let (filter, seen) = recorder(false);
        let mut chain = FilterChain::new(vec![filter]);

        let out = chain.decode(RequestFrame::headers(head(), false)).unwrap();
        let [RequestFrame::Headers { head, end_stream: false }] = out.as_slice() else {
            panic!("unexpected frames: {out:?}");
        };
        assert_eq!(head.headers().get("x-recorded").unwrap(), "yes");
        assert_eq!(seen.lock().unwrap().as_slice(), ["headers"]);
    }

    #[test]
    fn buffering_filter_releases_body_at_end_stream() {
        let (buffering, seen) = recorder(true);
        let (downstream, downstream_seen) = recorder(false);
        let mut chain = FilterChain::new(vec![buffering, downstream]);

        assert_eq!(chain.decode(RequestFrame::headers(head(), false)).unwrap().len(), 1);
        assert!(chain.decode(RequestFrame::data("match", false)).unwrap().is_empty());
        assert!(chain.decode(RequestFrame::data("_me", false)).unwrap().is_empty());

        let out = chain.decode(RequestFrame::data("!", true)).unwrap();
        let [RequestFrame::Data { data, end_stream: true }] = out.as_slice() else {
            panic!("unexpected frames: {out:?}");
        };
        assert_eq!(data, &Bytes::from_static(b"match_me!"));

        assert_eq!(seen.lock().unwrap().as_slice(), ["headers", "data:match:false", "data:match_me:false", "data:match_me!:true"]);
        assert_eq!(downstream_seen.lock().unwrap().as_slice(), ["headers", "data:match_me!:true"]);
    }

    #[test]
    fn trailers_flush_buffered_body_first() {
        let (buffering, _seen) = recorder(true);
        let mut chain = FilterChain::new(vec![buffering]);

        chain.decode(RequestFrame::headers(head(), false)).unwrap();
        assert!(chain.decode(RequestFrame::data("match_me", false)).unwrap().is_empty());

        let out = chain.decode(RequestFrame::trailers(HeaderMap::new())).unwrap();
        assert!(matches!(
            out.as_slice(),
            [RequestFrame::Data { end_stream: false, .. }, RequestFrame::Trailers(_)]
        ));
    }

    #[test]
    fn rejection_names_the_filter() {
        let (filter, _seen) = recorder(false);
        let mut chain = FilterChain::new(vec![filter, Box::new(Rejecting)]);

        chain.decode(RequestFrame::headers(head(), false)).unwrap();
        let interrupt = chain.decode(RequestFrame::trailers(HeaderMap::new())).unwrap_err();
        assert_eq!(
            interrupt,
            FilterInterrupt::Rejected { filter: "rejecting".into(), reason: "no trailers allowed".into() }
        );
    }
}
