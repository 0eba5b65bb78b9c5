//! An in-process filter chain proxy core
//!
//! This crate is the engine side of `micro-stream`. It takes a declarative
//! configuration (one api listener with a route table and an HTTP filter chain),
//! compiles it once, and then processes request streams frame by frame: each stream
//! runs through its own filter chain and ends at the router, which answers directly
//! or hands the request to an in-process upstream cluster.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use http::{HeaderMap, Method, StatusCode};
//! use micro_proxy::config::EngineConfig;
//! use micro_proxy::core::{ProxyCore, StreamProcessor};
//! use micro_proxy::protocol::{RequestFrame, RequestHead, ResponseEvent};
//! use tokio::sync::mpsc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = EngineConfig::from_json(r#"{
//!       "static_resources": { "listeners": [{
//!         "name": "base_api_listener",
//!         "api_listener": {
//!           "route_config": { "name": "api_router", "virtual_hosts": [{
//!             "name": "api", "domains": ["*"],
//!             "routes": [{ "match": { "prefix": "/" }, "direct_response": { "status": 200 } }]
//!           }]},
//!           "http_filters": [{ "name": "envoy.router", "typed_config": {
//!             "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router" } }]
//!         }
//!       }]}
//!     }"#).unwrap();
//!     let core = Arc::new(ProxyCore::new(&config, HashMap::new()).unwrap());
//!
//!     let (frames, frame_rx) = mpsc::unbounded_channel();
//!     let (event_tx, mut events) = mpsc::unbounded_channel();
//!     let processor = StreamProcessor::new(core, 1, frame_rx, event_tx, CancellationToken::new(), false);
//!     tokio::spawn(processor.process());
//!
//!     let head = RequestHead::new(Method::GET, "https", "example.com", "/test", HeaderMap::new());
//!     frames.send(RequestFrame::headers(head, true)).unwrap();
//!
//!     assert!(matches!(events.recv().await, Some(ResponseEvent::Headers { status: StatusCode::OK, .. })));
//!     assert!(matches!(events.recv().await, Some(ResponseEvent::Complete)));
//! }
//! ```
//!
//! # Architecture
//!
//! - [`config`]: typed configuration tree and its validation
//! - [`protocol`]: request frames, response events and errors
//! - [`filter`]: the filter trait, the per-stream chain and the built-in filters
//! - [`router`]: route table and request assembly
//! - [`handler`]: in-process upstream clusters
//! - [`core`]: compiled engine state and the per-stream processing loop
//!
//! # Limitations
//!
//! - No sockets: listeners are never bound and upstreams are in-process handlers
//! - No load balancing, retries or timeouts
//! - The configuration document is JSON only

pub mod config;
pub mod core;
pub mod filter;
pub mod handler;
pub mod protocol;
pub mod router;

mod utils;
