//! The seam between the connection controller and request-processing logic.
//!
//! A [`Handler`] receives every completed [`Request`] of a connection and answers
//! with a [`Dispatch`] telling the controller what to do next. A routing layer
//! implements it on top of a path table, [`make_handler`] turns an async
//! closure into one.

use async_trait::async_trait;

use crate::protocol::{BoxError, EncodedResponse, Request};

/// The outcome of dispatching one request.
#[derive(Debug)]
pub enum Dispatch {
    /// Write these bytes, then apply the keep-alive policy
    Response(EncodedResponse),
    /// No route for the path, the fixed not-found response is written
    NotFound,
    /// The route exists but doesn't accept the method, the connection is closed
    MethodNotAllowed,
    /// The handler failed, the connection is closed without a response
    Failed(BoxError),
}

impl From<EncodedResponse> for Dispatch {
    fn from(response: EncodedResponse) -> Self {
        Dispatch::Response(response)
    }
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, request: Request) -> Dispatch;
}

#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Dispatch> + Send,
{
    async fn call(&self, request: Request) -> Dispatch {
        (self.f)(request).await
    }
}

pub fn make_handler<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Dispatch> + Send,
{
    HandlerFn { f }
}
