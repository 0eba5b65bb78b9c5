use std::cell::Cell;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::Bytes;
use micro_proxy::protocol::{ProxyError, RequestFrame};
use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::state::RequestState;
use crate::client::{StreamCallbacks, StreamIntel, Terminal};
use crate::engine::EngineInner;
use crate::error::{ClientError, StreamError};
use crate::headers::{RequestHeaders, RequestTrailers};

thread_local! {
    // callbacks currently running on this thread, over all streams
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as running a stream callback until dropped.
struct DispatchScope;

impl DispatchScope {
    fn enter() -> Self {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }

    fn active() -> bool {
        DISPATCH_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

/// State of one stream shared by the application handle, the dispatcher task and
/// the engine registry.
pub(crate) struct StreamShared {
    id: u64,
    callbacks: StreamCallbacks,
    explicit_flow_control: bool,

    closed: AtomicBool,
    terminal: Mutex<Option<Terminal>>,
    // held while any callback runs, reentrant so callbacks may cancel their own stream
    dispatch: ReentrantMutex<()>,

    request: Mutex<RequestState>,
    frames: UnboundedSender<RequestFrame>,
    cancel: CancellationToken,

    consumed: AtomicU64,
    read_budget: Mutex<usize>,
    read_ready: Notify,

    engine: Weak<EngineInner>,
}

impl StreamShared {
    pub(crate) fn new(
        id: u64,
        callbacks: StreamCallbacks,
        explicit_flow_control: bool,
        frames: UnboundedSender<RequestFrame>,
        cancel: CancellationToken,
        engine: Weak<EngineInner>,
    ) -> Self {
        Self {
            id,
            callbacks,
            explicit_flow_control,
            closed: AtomicBool::new(false),
            terminal: Mutex::new(None),
            dispatch: ReentrantMutex::new(()),
            request: Mutex::new(RequestState::Idle),
            frames,
            cancel,
            consumed: AtomicU64::new(0),
            read_budget: Mutex::new(0),
            read_ready: Notify::new(),
            engine,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn explicit_flow_control(&self) -> bool {
        self.explicit_flow_control
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn intel(&self) -> StreamIntel {
        StreamIntel::new(self.id, self.consumed.load(Ordering::Acquire))
    }

    /// Runs a non terminal callback unless the stream is closed, returns false if it was.
    pub(crate) fn deliver(&self, f: impl FnOnce(&StreamCallbacks, StreamIntel)) -> bool {
        let _guard = self.dispatch.lock();
        if self.is_closed() {
            return false;
        }
        let _scope = DispatchScope::enter();
        f(&self.callbacks, self.intel());
        true
    }

    /// Delivers a chunk of response body and accounts for it in the intel.
    pub(crate) fn deliver_data(&self, data: Bytes, end_stream: bool) -> bool {
        let _guard = self.dispatch.lock();
        if self.is_closed() {
            return false;
        }
        self.consumed.fetch_add(data.len() as u64, Ordering::AcqRel);
        let _scope = DispatchScope::enter();
        self.callbacks.response_data(data, end_stream, self.intel());
        true
    }

    /// Moves the stream into its terminal state and runs the terminal callback.
    ///
    /// Only the first call has an effect. The engine side of the stream is aborted and
    /// the stream is removed from the engine registry.
    ///
    /// A caller outside of any callback waits for an in-flight callback of this stream
    /// to return first. A caller that is itself running a callback, of this stream or
    /// another one, never waits: a thread holding a dispatch lock must not block on
    /// another one.
    fn finish(&self, terminal: Terminal, f: impl FnOnce(&StreamCallbacks, StreamIntel)) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        *self.terminal.lock() = Some(terminal);
        self.cancel.cancel();
        if let Some(engine) = self.engine.upgrade() {
            engine.unregister(self.id);
        }
        debug!(stream_id = self.id, terminal = ?terminal, "stream closed");

        let _guard = match self.dispatch.try_lock() {
            Some(guard) => Some(guard),
            None if DispatchScope::active() => None,
            None => Some(self.dispatch.lock()),
        };
        let _scope = DispatchScope::enter();
        f(&self.callbacks, self.intel());
        true
    }

    pub(crate) fn complete(&self) -> bool {
        self.finish(Terminal::Complete, |callbacks, intel| callbacks.complete(intel))
    }

    pub(crate) fn fail(&self, error: ProxyError) -> bool {
        let error = StreamError::from(error);
        self.finish(Terminal::Error, |callbacks, intel| callbacks.error(error, intel))
    }

    pub(crate) fn cancel(&self) -> bool {
        self.finish(Terminal::Cancelled, |callbacks, intel| callbacks.cancel(intel))
    }

    /// Waits for a `read_data` grant and takes all of it, `None` once the stream closed.
    pub(crate) async fn take_read_grant(&self) -> Option<usize> {
        loop {
            let notified = self.read_ready.notified();
            {
                let mut budget = self.read_budget.lock();
                if *budget > 0 {
                    return Some(std::mem::take(&mut *budget));
                }
            }

            tokio::select! {
                () = notified => {}
                () = self.cancel.cancelled() => return None,
            }
        }
    }

    fn send(
        &self,
        operation: &'static str,
        transition: impl FnOnce(RequestState) -> Option<RequestState>,
        frame: impl FnOnce() -> RequestFrame,
    ) -> Result<(), ClientError> {
        let mut request = self.request.lock();
        if self.is_closed() {
            return Err(ClientError::invalid_state(operation, "closed"));
        }

        let next = transition(*request).ok_or_else(|| ClientError::invalid_state(operation, request.name()))?;
        *request = next;

        // the engine side may already be done with the request, e.g. after a local reply
        if let Err(e) = self.frames.send(frame()) {
            debug!(stream_id = self.id, operation, frame = e.0.kind(), "request frame dropped, engine no longer reads the request");
        }
        Ok(())
    }
}

impl fmt::Debug for StreamShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamShared")
            .field("id", &self.id)
            .field("explicit_flow_control", &self.explicit_flow_control)
            .field("closed", &self.is_closed())
            .field("callbacks", &self.callbacks)
            .finish_non_exhaustive()
    }
}

/// Handle of a started stream, used to send the request and to cancel.
///
/// Every send returns as soon as the frame is queued for the engine; the response is
/// delivered to the callbacks of the prototype the stream was started from. Dropping
/// the handle does not cancel the stream.
#[derive(Debug)]
pub struct Stream {
    shared: Arc<StreamShared>,
}

impl Stream {
    pub(crate) fn new(shared: Arc<StreamShared>) -> Self {
        Self { shared }
    }

    pub fn id(&self) -> u64 {
        self.shared.id()
    }

    /// Returns true once a terminal callback was delivered or is being delivered
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// How the stream ended, `None` while it is still open
    pub fn terminal(&self) -> Option<Terminal> {
        *self.shared.terminal.lock()
    }

    /// Sends the request head, it must be the first thing sent.
    pub fn send_headers(&self, headers: &RequestHeaders, end_stream: bool) -> Result<&Self, ClientError> {
        self.shared.send(
            "send_headers",
            |state| state.on_headers(end_stream),
            || RequestFrame::headers(headers.to_head(), end_stream),
        )?;
        Ok(self)
    }

    /// Sends a chunk of request body.
    pub fn send_data(&self, data: impl Into<Bytes>) -> Result<&Self, ClientError> {
        let data = data.into();
        self.shared.send("send_data", |state| state.on_data(false), || RequestFrame::data(data, false))?;
        Ok(self)
    }

    /// Sends the last chunk of request body and half closes the stream.
    pub fn send_data_with_end(&self, data: impl Into<Bytes>) -> Result<&Self, ClientError> {
        let data = data.into();
        self.shared.send("send_data", |state| state.on_data(true), || RequestFrame::data(data, true))?;
        Ok(self)
    }

    /// Sends the request trailers and half closes the stream.
    pub fn close(&self, trailers: &RequestTrailers) -> Result<&Self, ClientError> {
        self.shared.send("close", RequestState::on_trailers, || RequestFrame::trailers(trailers.trailers().to_header_map()))?;
        Ok(self)
    }

    /// Half closes the stream without trailers.
    pub fn close_without_trailers(&self) -> Result<&Self, ClientError> {
        self.shared.send("close", |state| state.on_data(true), || RequestFrame::data(Bytes::new(), true))?;
        Ok(self)
    }

    /// Cancels the stream.
    ///
    /// `on_cancel` runs before this returns, after which no other callback of the stream
    /// starts. Called from outside a callback, it first waits for a callback of the
    /// stream that is already running. Called from inside a callback it never waits,
    /// so a callback of this stream may still be finishing on another worker. A no-op
    /// on a closed stream.
    pub fn cancel(&self) {
        if self.shared.cancel() {
            info!(stream_id = self.shared.id(), "stream cancelled");
        }
    }

    /// Allows the next `on_response_data` call to carry up to `max_bytes` of body.
    ///
    /// Only valid with explicit flow control. Grants made before a delivery add up.
    pub fn read_data(&self, max_bytes: usize) -> Result<&Self, ClientError> {
        if !self.shared.explicit_flow_control() {
            return Err(ClientError::invalid_state("read_data", "not using explicit flow control"));
        }
        if self.shared.is_closed() {
            return Err(ClientError::invalid_state("read_data", "closed"));
        }
        if max_bytes > 0 {
            let mut budget = self.shared.read_budget.lock();
            *budget = budget.saturating_add(max_bytes);
            self.shared.read_ready.notify_one();
        }
        Ok(self)
    }
}
