//! An embeddable streaming HTTP client
//!
//! `micro-stream` runs HTTP exchanges as asynchronous streams through an in-process
//! proxy engine. The application pushes request headers, body and trailers
//! incrementally and receives the response through callbacks, while the engine runs
//! each exchange through the filter chain and routes of its configuration.
//!
//! # Example
//!
//! ```
//! use std::sync::mpsc;
//! use std::time::Duration;
//! use http::Method;
//! use micro_stream::engine::EngineBuilder;
//! use micro_stream::headers::{RequestHeaders, RequestTrailers};
//! use tracing::level_filters::LevelFilter;
//!
//! let engine = EngineBuilder::from_json(r#"{
//!   "static_resources": { "listeners": [{
//!     "name": "base_api_listener",
//!     "api_listener": {
//!       "route_config": { "name": "api_router", "virtual_hosts": [{
//!         "name": "api", "domains": ["*"],
//!         "routes": [{ "match": { "prefix": "/" }, "direct_response": { "status": 200 } }]
//!       }]},
//!       "http_filters": [{ "name": "envoy.router", "typed_config": {
//!         "@type": "type.googleapis.com/envoy.extensions.filters.http.router.v3.Router" } }]
//!     }
//!   }]}
//! }"#)
//! .unwrap()
//! .log_level(LevelFilter::OFF)
//! .build()
//! .unwrap();
//!
//! let (tx, rx) = mpsc::channel();
//! let status_tx = tx.clone();
//! let stream = engine
//!     .stream_client()
//!     .unwrap()
//!     .new_stream_prototype()
//!     .unwrap()
//!     .on_response_headers(move |headers, _end_stream, _intel| status_tx.send(headers.http_status()).unwrap())
//!     .on_complete(move |_intel| tx.send(0).unwrap())
//!     .start(false)
//!     .unwrap();
//!
//! let headers = RequestHeaders::builder(Method::GET, "https", "example.com", "/test").build().unwrap();
//! stream
//!     .send_headers(&headers, false)
//!     .unwrap()
//!     .send_data("match_me")
//!     .unwrap()
//!     .close(&RequestTrailers::builder().add("test-trailer", "test.code").build().unwrap())
//!     .unwrap();
//!
//! assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 200);
//! assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
//! ```
//!
//! # Architecture
//!
//! - [`engine`]: engine builder, lifecycle and stream registry
//! - [`client`]: stream client, prototypes, streams and callback dispatch
//! - [`headers`]: immutable header and trailer values with their builders
//! - [`error`]: synchronous [`ClientError`](error::ClientError) and the
//!   [`StreamError`](error::StreamError) delivered to `on_error`
//!
//! # Threading
//!
//! Sends never block on the network: each frame is queued to the engine and the call
//! returns. Callbacks run on engine worker threads, one at a time per stream. A
//! callback may call back into its own stream, including `cancel`.

pub mod client;
pub mod engine;
pub mod error;
pub mod headers;

pub use micro_proxy::config::EngineConfig;
pub use micro_proxy::handler::{Upstream, make_upstream};
