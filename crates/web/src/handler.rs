//! Handler descriptors.
//!
//! Any function of the right shape can be registered on a route. Its shape
//! decides how it runs:
//!
//! - `Fn(&Request) -> R` is synchronous, it runs to completion on the connection task
//! - `Fn(Request) -> impl Future<Output = R>` suspends, it is awaited and other
//!   connections proceed meanwhile
//!
//! where `R` is anything implementing [`IntoHandlerResult`]: an [`EncodedResponse`],
//! a [`Response`] or a `Result` of either.
//!
//! Closures need their argument type spelled out (`|request: &Request| ...`) so
//! the shape can be told apart.

use aquarius_http::protocol::{BoxError, EncodedResponse, Request, Response};
use futures::FutureExt;
use futures::future::BoxFuture;

type HandlerResult = Result<EncodedResponse, BoxError>;

type BlockingFn = dyn Fn(&Request) -> HandlerResult + Send + Sync;

type SuspendingFn = dyn Fn(Request) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Request-processing logic bound to a route.
pub enum RouteHandler {
    Blocking(Box<BlockingFn>),
    Suspending(Box<SuspendingFn>),
}

impl RouteHandler {
    /// Returns true if invoking this handler yields before producing a result
    pub fn suspends(&self) -> bool {
        matches!(self, RouteHandler::Suspending(_))
    }

    pub async fn invoke(&self, request: Request) -> HandlerResult {
        match self {
            RouteHandler::Blocking(f) => f(&request),
            RouteHandler::Suspending(f) => f(request).await,
        }
    }
}

impl std::fmt::Debug for RouteHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteHandler::Blocking(_) => f.write_str("RouteHandler::Blocking"),
            RouteHandler::Suspending(_) => f.write_str("RouteHandler::Suspending"),
        }
    }
}

/// Values a handler may return.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> HandlerResult;
}

impl IntoHandlerResult for EncodedResponse {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self)
    }
}

impl IntoHandlerResult for Response {
    fn into_handler_result(self) -> HandlerResult {
        Ok(self.encode()?)
    }
}

impl<E: Into<BoxError>> IntoHandlerResult for Result<EncodedResponse, E> {
    fn into_handler_result(self) -> HandlerResult {
        self.map_err(Into::into)
    }
}

impl<E: Into<BoxError>> IntoHandlerResult for Result<Response, E> {
    fn into_handler_result(self) -> HandlerResult {
        match self {
            Ok(response) => response.into_handler_result(),
            Err(e) => Err(e.into()),
        }
    }
}

/// Marker for handlers taking `&Request`
#[derive(Debug)]
pub struct Blocking;

/// Marker for handlers taking `Request` and returning a future
#[derive(Debug)]
pub struct Suspending;

/// Conversion of a function into a [`RouteHandler`].
///
/// `Marker` only tells the blanket implementations apart, it is inferred.
pub trait IntoRouteHandler<Marker> {
    fn into_route_handler(self) -> RouteHandler;
}

impl<F, R> IntoRouteHandler<(Blocking, R)> for F
where
    F: Fn(&Request) -> R + Send + Sync + 'static,
    R: IntoHandlerResult,
{
    fn into_route_handler(self) -> RouteHandler {
        RouteHandler::Blocking(Box::new(move |request: &Request| self(request).into_handler_result()))
    }
}

impl<F, Fut> IntoRouteHandler<(Suspending, Fut)> for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoHandlerResult,
{
    fn into_route_handler(self) -> RouteHandler {
        RouteHandler::Suspending(Box::new(move |request: Request| self(request).map(IntoHandlerResult::into_handler_result).boxed()))
    }
}
