//! Stream state machine.
//!
//! ```text
//! request:   Idle ──headers──▶ Open ──data*──▶ Open ──end_stream / trailers──▶ HalfClosed
//! response:  AwaitingHeaders ──headers──▶ ReceivingBody ──data*──▶ ReceivingBody
//!                                              └──trailers──▶ ReceivedTrailers
//!            end_stream on headers or data ──▶ Ended
//! terminal:  Closed(Complete | Error | Cancelled)
//! ```

use micro_proxy::protocol::ResponseEvent;

/// Request side of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestState {
    Idle,
    Open,
    HalfClosed,
}

impl RequestState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            RequestState::Idle => "idle",
            RequestState::Open => "open",
            RequestState::HalfClosed => "half closed",
        }
    }

    pub(crate) fn on_headers(self, end_stream: bool) -> Option<Self> {
        match self {
            RequestState::Idle => Some(if end_stream { RequestState::HalfClosed } else { RequestState::Open }),
            RequestState::Open | RequestState::HalfClosed => None,
        }
    }

    pub(crate) fn on_data(self, end_stream: bool) -> Option<Self> {
        match self {
            RequestState::Open => Some(if end_stream { RequestState::HalfClosed } else { RequestState::Open }),
            RequestState::Idle | RequestState::HalfClosed => None,
        }
    }

    pub(crate) fn on_trailers(self) -> Option<Self> {
        match self {
            RequestState::Open => Some(RequestState::HalfClosed),
            RequestState::Idle | RequestState::HalfClosed => None,
        }
    }
}

/// Response side of a stream, driven by the events the engine emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ResponseState {
    AwaitingHeaders,
    ReceivingBody,
    ReceivedTrailers,
    Ended,
}

impl ResponseState {
    /// Checks that `event` may follow the current state and advances.
    pub(crate) fn accept(&mut self, event: &ResponseEvent) -> Result<(), String> {
        let next = match (*self, event) {
            (ResponseState::AwaitingHeaders, ResponseEvent::Headers { end_stream, .. }) => {
                if *end_stream { ResponseState::Ended } else { ResponseState::ReceivingBody }
            }
            (ResponseState::ReceivingBody, ResponseEvent::Data { end_stream, .. }) => {
                if *end_stream { ResponseState::Ended } else { ResponseState::ReceivingBody }
            }
            (ResponseState::ReceivingBody, ResponseEvent::Trailers(_)) => ResponseState::ReceivedTrailers,
            (state, ResponseEvent::SendWindowAvailable | ResponseEvent::Error(_)) => state,
            (state @ (ResponseState::Ended | ResponseState::ReceivedTrailers), ResponseEvent::Complete) => state,
            (state, event) => return Err(format!("unexpected {} event while the response is {}", event.kind(), state.name())),
        };
        *self = next;
        Ok(())
    }

    fn name(self) -> &'static str {
        match self {
            ResponseState::AwaitingHeaders => "awaiting headers",
            ResponseState::ReceivingBody => "receiving body",
            ResponseState::ReceivedTrailers => "finished with trailers",
            ResponseState::Ended => "finished",
        }
    }
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    Complete,
    Error,
    Cancelled,
}
