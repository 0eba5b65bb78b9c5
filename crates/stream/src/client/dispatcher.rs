use std::sync::Arc;

use bytes::Bytes;
use micro_proxy::protocol::{ProxyError, ResponseEvent};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{trace, warn};

use crate::client::state::ResponseState;
use crate::client::stream::StreamShared;
use crate::headers::{ResponseHeaders, ResponseTrailers};

/// Delivers the response events of one stream to its callbacks, in order.
///
/// Runs on the engine runtime until the stream reaches a terminal state. Events that
/// break the response order end the stream with an internal error.
pub(crate) async fn dispatch(shared: Arc<StreamShared>, mut events: UnboundedReceiver<ResponseEvent>) {
    let mut response = ResponseState::AwaitingHeaders;

    loop {
        let event = tokio::select! {
            biased;

            () = shared.cancel_token().cancelled() => break,
            event = events.recv() => event,
        };

        let Some(event) = event else {
            warn!(stream_id = shared.id(), "response events ended without a terminal event");
            shared.fail(ProxyError::internal("response events ended without a terminal event"));
            break;
        };

        trace!(stream_id = shared.id(), event = event.kind(), "dispatching response event");
        if let Err(reason) = response.accept(&event) {
            warn!(stream_id = shared.id(), reason = %reason, "engine broke the response order");
            shared.fail(ProxyError::internal(reason));
            break;
        }

        let open = match event {
            ResponseEvent::Headers { status, headers, end_stream } => shared.deliver(|callbacks, intel| {
                callbacks.response_headers(ResponseHeaders::from((status, headers)), end_stream, intel);
            }),
            ResponseEvent::Data { data, end_stream } => {
                if shared.explicit_flow_control() {
                    deliver_on_demand(&shared, data, end_stream).await
                } else {
                    shared.deliver_data(data, end_stream)
                }
            }
            ResponseEvent::Trailers(trailers) => shared.deliver(|callbacks, intel| {
                callbacks.response_trailers(ResponseTrailers::from(trailers), intel);
            }),
            ResponseEvent::SendWindowAvailable => {
                shared.deliver(|callbacks, intel| callbacks.send_window_available(intel))
            }
            ResponseEvent::Complete => {
                shared.complete();
                false
            }
            ResponseEvent::Error(e) => {
                shared.fail(e);
                false
            }
        };

        if !open {
            break;
        }
    }
}

/// Splits a body chunk over as many `read_data` grants as it takes.
async fn deliver_on_demand(shared: &StreamShared, mut data: Bytes, end_stream: bool) -> bool {
    // an empty chunk carries no body, only the end of it
    if data.is_empty() {
        return shared.deliver_data(data, end_stream);
    }

    while !data.is_empty() {
        let Some(granted) = shared.take_read_grant().await else {
            return false;
        };
        let chunk = data.split_to(granted.min(data.len()));
        if !shared.deliver_data(chunk, end_stream && data.is_empty()) {
            return false;
        }
    }
    true
}
