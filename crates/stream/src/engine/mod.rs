//! Engine lifecycle.
//!
//! [`EngineBuilder`] validates and compiles the configuration, then starts a
//! multi-thread tokio runtime that runs the stream processors and the callback
//! dispatchers. The [`Engine`] handle owns that runtime; [`StreamClient`](crate::client::StreamClient)s
//! and streams only hold weak references, so dropping or terminating the engine
//! stops everything.

mod handle;
mod logging;
mod options;

pub use handle::Engine;
pub(crate) use handle::EngineInner;
pub use options::EngineBuilder;
pub use options::EngineOptions;
