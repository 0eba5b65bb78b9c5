//! Streams and their callbacks.
//!
//! A [`StreamClient`] creates [`StreamPrototype`]s; a prototype collects callbacks
//! and is started into a [`Stream`]. The stream handle sends the request while a
//! dispatcher task on the engine runtime delivers the response to the callbacks.
//!
//! # Ordering
//!
//! Callbacks of a stream never run concurrently and follow the response order:
//! headers, data, trailers, then exactly one of `on_complete`, `on_error` or
//! `on_cancel`. Nothing runs after that terminal callback.

mod callbacks;
mod dispatcher;
mod intel;
mod prototype;
mod state;
mod stream;
mod stream_client;

pub(crate) use callbacks::StreamCallbacks;
pub(crate) use dispatcher::dispatch;
pub(crate) use stream::StreamShared;

pub use intel::StreamIntel;
pub use prototype::StreamPrototype;
pub use state::Terminal;
pub use stream::Stream;
pub use stream_client::StreamClient;
