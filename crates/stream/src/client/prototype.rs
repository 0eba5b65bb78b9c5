use std::sync::{Arc, Weak};

use bytes::Bytes;

use crate::client::{Stream, StreamCallbacks, StreamIntel};
use crate::engine::EngineInner;
use crate::error::{ClientError, StreamError};
use crate::headers::{ResponseHeaders, ResponseTrailers};

/// Collects the callbacks of a stream before it is started.
///
/// Every setter consumes and returns the prototype. Events without a registered
/// callback are dropped. Callbacks run on an engine worker thread, one at a time per
/// stream and in response order.
#[derive(Debug)]
pub struct StreamPrototype {
    engine: Weak<EngineInner>,
    callbacks: StreamCallbacks,
}

impl StreamPrototype {
    pub(crate) fn new(engine: Weak<EngineInner>) -> Self {
        Self { engine, callbacks: StreamCallbacks::default() }
    }

    #[must_use]
    pub fn on_response_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseHeaders, bool, StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_response_headers = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_response_data<F>(mut self, f: F) -> Self
    where
        F: Fn(Bytes, bool, StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_response_data = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_response_trailers<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseTrailers, StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_response_trailers = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(StreamError, StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_error = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_cancel<F>(mut self, f: F) -> Self
    where
        F: Fn(StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_cancel = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: Fn(StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_complete = Some(Arc::new(f));
        self
    }

    /// Called each time the engine took a request body chunk off the stream, only with
    /// explicit flow control.
    #[must_use]
    pub fn on_send_window_available<F>(mut self, f: F) -> Self
    where
        F: Fn(StreamIntel) + Send + Sync + 'static,
    {
        self.callbacks.on_send_window_available = Some(Arc::new(f));
        self
    }

    /// Starts the stream.
    ///
    /// With `explicit_flow_control` response body is only delivered as far as
    /// [`Stream::read_data`] allows.
    pub fn start(self, explicit_flow_control: bool) -> Result<Stream, ClientError> {
        let engine = self.engine.upgrade().ok_or(ClientError::EngineTerminated)?;
        engine.start_stream(self.callbacks, explicit_flow_control)
    }
}
