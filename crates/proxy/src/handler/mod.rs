//! In-process upstream clusters.
//!
//! A route that targets a cluster hands the assembled request to the [`Upstream`]
//! registered under the cluster's name. The response body is streamed back frame by
//! frame, trailer frames of the body become response trailers.

use std::error::Error;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;
use http_body_util::BodyExt;
use http_body_util::combinators::UnsyncBoxBody;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// The type-erased response body of an upstream.
pub type UpstreamBody = UnsyncBoxBody<Bytes, BoxError>;

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn call(&self, req: Request<Bytes>) -> Result<Response<UpstreamBody>, BoxError>;
}

#[derive(Debug)]
pub struct UpstreamFn<F> {
    f: F,
}

#[async_trait]
impl<RespBody, Err, F, Fut> Upstream for UpstreamFn<F>
where
    RespBody: Body<Data = Bytes> + Send + 'static,
    RespBody::Error: Into<BoxError>,
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Err: Into<BoxError>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    async fn call(&self, req: Request<Bytes>) -> Result<Response<UpstreamBody>, BoxError> {
        let response = (self.f)(req).await.map_err(Into::into)?;
        Ok(response.map(|body| body.map_err(Into::into).boxed_unsync()))
    }
}

/// Turns an async function into an [`Upstream`].
///
/// ```
/// use bytes::Bytes;
/// use http::{Request, Response};
/// use http_body_util::Full;
/// use micro_proxy::handler::make_upstream;
/// use std::convert::Infallible;
///
/// let upstream = make_upstream(|req: Request<Bytes>| async move {
///     Ok::<_, Infallible>(Response::new(Full::new(req.into_body())))
/// });
/// # let _ = upstream;
/// ```
pub fn make_upstream<F, RespBody, Err, Ret>(f: F) -> UpstreamFn<F>
where
    RespBody: Body,
    Err: Into<BoxError>,
    Ret: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<Bytes>) -> Ret,
{
    UpstreamFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use http_body_util::Full;
    use std::convert::Infallible;

    #[tokio::test]
    async fn echo_upstream() {
        let upstream = make_upstream(|req: Request<Bytes>| async move {
            let response = Response::builder().status(StatusCode::CREATED).body(Full::new(req.into_body()))?;
            Ok::<_, http::Error>(response)
        });

        let response = upstream.call(Request::new(Bytes::from_static(b"ping"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from_static(b"ping"));
    }

    #[tokio::test]
    async fn failing_upstream() {
        let upstream = make_upstream(|_req: Request<Bytes>| async move {
            Err::<Response<Full<Bytes>>, _>(std::io::Error::other("connection refused"))
        });
        let error = upstream.call(Request::new(Bytes::new())).await.unwrap_err();
        assert_eq!(error.to_string(), "connection refused");

        let infallible = make_upstream(|_req: Request<Bytes>| async { Ok::<_, Infallible>(Response::new(Full::new(Bytes::new()))) });
        assert!(infallible.call(Request::new(Bytes::new())).await.is_ok());
    }
}
