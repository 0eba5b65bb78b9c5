//! The per-engine proxy core and the per-stream processing loop.

mod proxy_core;
mod stream_processor;

pub use proxy_core::ProxyCore;
pub use stream_processor::StreamProcessor;
