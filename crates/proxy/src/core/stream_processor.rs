use std::sync::Arc;

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, StatusCode};
use http_body::Frame;
use http_body_util::BodyExt;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::ProxyCore;
use crate::filter::{FilterInterrupt, LocalReply};
use crate::handler::UpstreamBody;
use crate::protocol::{ProxyError, RequestFrame, ResponseEvent};
use crate::router::{Action, AssembledRequest, RequestAssembler};

/// Drives one request stream through the filter chain and the router.
///
/// Request frames are read from `frames`, response events are written to `events`.
/// The processor always finishes with exactly one terminal event (`Complete` or
/// `Error`), unless `cancel` fires first, in which case it stops silently and the
/// owner of the stream is responsible for reporting the cancellation.
#[derive(Debug)]
pub struct StreamProcessor {
    core: Arc<ProxyCore>,
    stream_id: u64,
    frames: UnboundedReceiver<RequestFrame>,
    events: UnboundedSender<ResponseEvent>,
    cancel: CancellationToken,
    explicit_flow_control: bool,
}

impl StreamProcessor {
    pub fn new(
        core: Arc<ProxyCore>,
        stream_id: u64,
        frames: UnboundedReceiver<RequestFrame>,
        events: UnboundedSender<ResponseEvent>,
        cancel: CancellationToken,
        explicit_flow_control: bool,
    ) -> Self {
        Self { core, stream_id, frames, events, cancel, explicit_flow_control }
    }

    pub async fn process(self) {
        let cancel = self.cancel.clone();
        let events = self.events.clone();
        let stream_id = self.stream_id;

        let result = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(stream_id, "stream processing cancelled");
                return;
            }

            result = self.do_process() => result,
        };

        let terminal = match result {
            Ok(()) => {
                debug!(stream_id, "stream completed");
                ResponseEvent::Complete
            }
            Err(e) => {
                info!(stream_id, category = %e.category(), cause = %e, "stream failed");
                ResponseEvent::Error(e)
            }
        };

        if events.send(terminal).is_err() {
            debug!(stream_id, "response receiver gone, terminal event dropped");
        }
    }

    async fn do_process(mut self) -> Result<(), ProxyError> {
        let mut chain = self.core.new_filter_chain();
        let mut assembler = RequestAssembler::new();

        while !assembler.is_complete() {
            let Some(frame) = self.frames.recv().await else {
                return Err(ProxyError::internal("request stream reset before end of request"));
            };

            // a data chunk that does not end the request opens the send window again
            let reopens_window = matches!(frame, RequestFrame::Data { end_stream: false, .. });

            let forwarded = match chain.decode(frame) {
                Ok(forwarded) => forwarded,
                Err(FilterInterrupt::LocalReply(reply)) => return self.send_local_reply(reply),
                Err(FilterInterrupt::Rejected { filter, reason }) => {
                    warn!(stream_id = self.stream_id, filter = %filter, reason = %reason, "request rejected by filter");
                    return Err(ProxyError::filter_rejected(filter, reason));
                }
            };

            for frame in forwarded {
                assembler.push(frame)?;
            }

            if reopens_window && self.explicit_flow_control {
                self.emit(ResponseEvent::SendWindowAvailable)?;
            }
        }

        let request = assembler.into_request()?;
        self.route(request).await
    }

    async fn route(&self, request: AssembledRequest) -> Result<(), ProxyError> {
        let Some(entry) = self.core.route(&request.head) else {
            debug!(
                stream_id = self.stream_id,
                authority = request.head.authority(),
                path = request.head.path(),
                "no route matched"
            );
            return self.send_local_reply(LocalReply::new(StatusCode::NOT_FOUND));
        };

        match entry.action() {
            Action::DirectResponse { status, body } => {
                let reply = LocalReply { status: *status, body: body.clone() };
                self.send_local_reply(reply)
            }
            Action::Cluster(cluster) => self.forward(cluster, request).await,
        }
    }

    async fn forward(&self, cluster: &str, request: AssembledRequest) -> Result<(), ProxyError> {
        let upstream = self
            .core
            .upstream(cluster)
            .ok_or_else(|| ProxyError::internal(format!("cluster {cluster} is not registered")))?;

        let request = request.into_http()?;
        debug!(stream_id = self.stream_id, cluster, uri = %request.uri(), "forwarding request upstream");
        let response = upstream.call(request).await.map_err(|e| ProxyError::upstream(cluster, e))?;

        let (parts, mut body) = response.into_parts();

        // one frame of lookahead tells whether the current frame ends the response
        let mut pending = next_frame(&mut body, cluster).await?;
        self.emit(ResponseEvent::headers(parts.status, parts.headers, pending.is_none()))?;

        while let Some(frame) = pending {
            let next = next_frame(&mut body, cluster).await?;
            match frame.into_data() {
                Ok(data) => {
                    if !data.is_empty() || next.is_none() {
                        self.emit(ResponseEvent::data(data, next.is_none()))?;
                    }
                }
                Err(frame) => {
                    if let Ok(trailers) = frame.into_trailers() {
                        return self.emit(ResponseEvent::Trailers(trailers));
                    }
                }
            }
            pending = next;
        }
        Ok(())
    }

    fn send_local_reply(&self, reply: LocalReply) -> Result<(), ProxyError> {
        let body = reply.body.filter(|body| !body.is_empty());

        let mut headers = HeaderMap::new();
        if let Some(body) = &body {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        }

        debug!(stream_id = self.stream_id, status = %reply.status, "sending local reply");
        self.emit(ResponseEvent::headers(reply.status, headers, body.is_none()))?;
        match body {
            Some(body) => self.emit(ResponseEvent::data(body, true)),
            None => Ok(()),
        }
    }

    fn emit(&self, event: ResponseEvent) -> Result<(), ProxyError> {
        self.events
            .send(event)
            .map_err(|e| ProxyError::internal(format!("response channel closed, {} event dropped", e.0.kind())))
    }
}

async fn next_frame(body: &mut UpstreamBody, cluster: &str) -> Result<Option<Frame<Bytes>>, ProxyError> {
    body.frame().await.transpose().map_err(|e| ProxyError::upstream(cluster, e))
}
