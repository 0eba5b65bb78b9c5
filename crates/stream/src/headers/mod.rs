//! Header and trailer values exchanged with a stream.
//!
//! All of them are immutable once built. Request side values are created with value
//! builders that validate names and values in `build()`; response side values are
//! created by the client from what the engine emitted.

mod header_set;
mod request;
mod response;

pub use header_set::HeaderSet;
pub use header_set::HeaderSetBuilder;

pub use request::RequestHeaders;
pub use request::RequestHeadersBuilder;
pub use request::RequestTrailers;
pub use request::RequestTrailersBuilder;

pub use response::ResponseHeaders;
pub use response::ResponseTrailers;
