//! Stream wire contract between a client and the proxy core.
//!
//! A client drives one exchange by pushing [`RequestFrame`]s into the core and
//! receives [`ResponseEvent`]s back. The contract is deliberately small:
//!
//! - request frames: `{headers, end_stream}`, `{data, end_stream}`, `{trailers}`
//! - response events: `{headers, end_stream}`, `{data, end_stream}`, `{trailers}`
//!   followed by exactly one terminal event, `{complete}` or `{error}`
//!
//! Cancellation is not an event, it is signalled out of band by the client side
//! through a cancellation token handed to the [`StreamProcessor`](crate::core::StreamProcessor).
//!
//! # Components
//!
//! - [`RequestHead`]: the mandatory first request frame payload
//! - [`RequestFrame`] / [`ResponseEvent`]: the framed exchange
//! - [`ProxyError`] / [`ErrorCategory`]: failures reported through the terminal error event

mod frame;
pub use frame::RequestFrame;
pub use frame::ResponseEvent;

mod request;
pub use request::RequestHead;
pub use request::RequestTrailers;

mod error;
pub use error::ErrorCategory;
pub use error::ProxyError;
