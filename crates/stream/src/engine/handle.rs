use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use micro_proxy::config::EngineConfig;
use micro_proxy::core::{ProxyCore, StreamProcessor};
use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::client::{Stream, StreamCallbacks, StreamClient, StreamShared, dispatch};
use crate::engine::{EngineOptions, logging};
use crate::error::ClientError;

/// A running engine.
///
/// The engine owns the worker runtime, the compiled configuration and the registry of
/// live streams. It stops on [`terminate`](Engine::terminate) or when dropped.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    inner: Arc<EngineInner>,
    runtime: Mutex<Option<Runtime>>,
}

/// The part of the engine streams and clients refer to, without owning it.
#[derive(Debug)]
pub(crate) struct EngineInner {
    core: Arc<ProxyCore>,
    handle: Handle,
    running: AtomicBool,
    next_stream_id: AtomicU64,
    streams: Mutex<HashMap<u64, Arc<StreamShared>>>,
}

impl Engine {
    /// Validates and compiles `config`, then starts the worker runtime.
    ///
    /// The engine keeps its own copy of the configuration.
    pub fn build(config: &EngineConfig, options: EngineOptions) -> Result<Self, ClientError> {
        let EngineOptions { log_level, worker_threads, upstreams, on_engine_running } = options;
        logging::install(log_level);

        let core = ProxyCore::new(config, upstreams)?;

        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("micro-stream-worker")
            .enable_all()
            .build()
            .map_err(ClientError::runtime)?;

        let inner = Arc::new(EngineInner {
            core: Arc::new(core),
            handle: runtime.handle().clone(),
            running: AtomicBool::new(true),
            next_stream_id: AtomicU64::new(1),
            streams: Mutex::new(HashMap::new()),
        });

        if let Some(callback) = on_engine_running {
            runtime.spawn(async move { callback() });
        }

        info!(worker_threads = worker_threads.max(1), "engine running");
        Ok(Self { config: config.clone(), inner, runtime: Mutex::new(Some(runtime)) })
    }

    pub fn stream_client(&self) -> Result<StreamClient, ClientError> {
        if !self.is_running() {
            return Err(ClientError::EngineTerminated);
        }
        Ok(StreamClient::new(Arc::downgrade(&self.inner)))
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stops the engine.
    ///
    /// Every open stream is cancelled first, its `on_cancel` runs before this returns.
    /// Calling it again returns [`ClientError::EngineTerminated`] and does nothing.
    pub fn terminate(&self) -> Result<(), ClientError> {
        let streams = {
            let mut streams = self.inner.streams.lock();
            if !self.inner.running.swap(false, Ordering::AcqRel) {
                return Err(ClientError::EngineTerminated);
            }
            std::mem::take(&mut *streams)
        };

        let open = streams.len();
        for stream in streams.into_values() {
            stream.cancel();
        }

        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
        info!(cancelled_streams = open, "engine terminated");
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if self.terminate().is_ok() {
            debug!("engine terminated on drop");
        }
    }
}

impl EngineInner {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Registers a new stream and spawns its processor and dispatcher.
    pub(crate) fn start_stream(self: &Arc<Self>, callbacks: StreamCallbacks, explicit_flow_control: bool) -> Result<Stream, ClientError> {
        // registering under the lock keeps terminate from missing a stream
        let mut streams = self.streams.lock();
        if !self.is_running() {
            return Err(ClientError::EngineTerminated);
        }

        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let shared = Arc::new(StreamShared::new(
            id,
            callbacks,
            explicit_flow_control,
            frame_tx,
            cancel.clone(),
            Arc::downgrade(self),
        ));
        streams.insert(id, Arc::clone(&shared));

        let processor = StreamProcessor::new(Arc::clone(&self.core), id, frame_rx, event_tx, cancel, explicit_flow_control);
        self.handle.spawn(processor.process());
        self.handle.spawn(dispatch(Arc::clone(&shared), event_rx));

        debug!(stream_id = id, explicit_flow_control, open_streams = streams.len(), "stream started");
        Ok(Stream::new(shared))
    }

    pub(crate) fn unregister(&self, stream_id: u64) {
        self.streams.lock().remove(&stream_id);
    }

    #[cfg(test)]
    pub(crate) fn open_streams(&self) -> usize {
        self.streams.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Terminal;
    use crate::engine::EngineBuilder;
    use crate::headers::RequestHeaders;
    use http::Method;
    use indoc::indoc;
    use std::sync::mpsc;
    use std::time::Duration;
    use tracing::level_filters::LevelFilter;

    const CONFIG: &str = indoc! {r#"
    {
      "static_resources": {
        "listeners": [{
          "name": "base_api_listener",
          "api_listener": {
            "route_config": {
              "name": "api_router",
              "virtual_hosts": [{
                "name": "api",
                "domains": ["*"],
                "routes": [{ "match": { "prefix": "/" }, "direct_response": { "status": 200 } }]
              }]
            },
            "http_filters": [{
              "name": "envoy.router",
              "typed_config": { "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router" }
            }]
          }
        }]
      }
    }
    "#};

    fn engine() -> Engine {
        EngineBuilder::from_json(CONFIG).unwrap().log_level(LevelFilter::OFF).worker_threads(1).build().unwrap()
    }

    #[test]
    fn on_engine_running_fires() {
        let (tx, rx) = mpsc::channel();
        let _engine = EngineBuilder::from_json(CONFIG)
            .unwrap()
            .log_level(LevelFilter::OFF)
            .on_engine_running(move || tx.send(()).unwrap())
            .build()
            .unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    #[test]
    fn finished_streams_leave_the_registry() {
        let engine = engine();
        let (tx, rx) = mpsc::channel();
        let stream = engine
            .stream_client()
            .unwrap()
            .new_stream_prototype()
            .unwrap()
            .on_complete(move |_intel| tx.send(()).unwrap())
            .start(false)
            .unwrap();

        assert_eq!(engine.inner.open_streams(), 1);
        let headers = RequestHeaders::builder(Method::GET, "https", "example.com", "/").build().unwrap();
        stream.send_headers(&headers, true).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(stream.terminal(), Some(Terminal::Complete));
        assert_eq!(engine.inner.open_streams(), 0);
    }

    #[test]
    fn stream_ids_are_unique() {
        let engine = engine();
        let client = engine.stream_client().unwrap();
        let first = client.new_stream_prototype().unwrap().start(false).unwrap();
        let second = client.new_stream_prototype().unwrap().start(false).unwrap();
        assert!(second.id() > first.id());

        engine.terminate().unwrap();
        assert_eq!(engine.inner.open_streams(), 0);
        assert_eq!(first.terminal(), Some(Terminal::Cancelled));
    }
}
