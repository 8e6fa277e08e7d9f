//! Routing table mapping exact request paths to handlers.
//!
//! Routes are registered once at startup through a [`RouterBuilder`], the built
//! [`Router`] is read-only and shared by every connection.
//!
//! # Examples
//!
//! ```
//! use aquarius::router::Router;
//! use aquarius::protocol::{Request, Response};
//!
//! fn test(request: &Request) -> Response {
//!     Response::text(request.path())
//! }
//!
//! async fn status(_request: Request) -> Response {
//!     Response::text("ok")
//! }
//!
//! let router = Router::builder()
//!     .route_with_methods("/test/", test, ["GET"])
//!     .unwrap()
//!     .route("/status", status)
//!     .build();
//!
//! assert!(router.resolve("/test/").is_some());
//! assert!(router.resolve("/status").unwrap().suspends());
//! assert!(router.resolve("/test").is_none());
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;

use aquarius_http::handler::{Dispatch, Handler};
use aquarius_http::protocol::Request;
use async_trait::async_trait;
use http::Method;
use thiserror::Error;
use tracing::{debug, warn};

use crate::handler::{IntoRouteHandler, RouteHandler};

/// Methods a route accepts unless told otherwise
pub const DEFAULT_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RouterError {
    #[error("route {path} must allow at least one method")]
    EmptyMethods { path: String },

    #[error("route {path} has an invalid method token: {method:?}")]
    InvalidMethod { path: String, method: String },
}

/// The binding of one path to its handler and allowed methods.
#[derive(Debug)]
pub struct RouteEntry {
    path: String,
    name: &'static str,
    allowed_methods: Vec<Method>,
    handler: RouteHandler,
}

impl RouteEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The type name of the registered handler
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn allowed_methods(&self) -> &[Method] {
        &self.allowed_methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.allowed_methods.contains(method)
    }

    /// Returns true if the handler yields before producing its result
    pub fn suspends(&self) -> bool {
        self.handler.suspends()
    }

    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }
}

/// Main routing structure, resolves request paths by exact match.
#[derive(Debug, Default)]
pub struct Router {
    routes: HashMap<String, RouteEntry>,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Returns the entry registered for exactly this path.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        self.routes.get(path)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Returns the entries ordered by path
    pub fn entries(&self) -> Vec<&RouteEntry> {
        let mut entries = self.routes.values().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

/// One line per route: path, handler name, and whether it suspends.
impl fmt::Display for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in self.entries() {
            let kind = if entry.suspends() { "async" } else { "sync" };
            writeln!(f, "{}  {}  {}", entry.path, entry.name, kind)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Handler for Router {
    async fn call(&self, request: Request) -> Dispatch {
        let Some(entry) = self.resolve(request.path()) else {
            debug!(path = request.path(), "no route matched");
            return Dispatch::NotFound;
        };

        if !entry.allows(request.method()) {
            debug!(path = entry.path(), method = %request.method(), "method not allowed on route");
            return Dispatch::MethodNotAllowed;
        }

        match entry.handler.invoke(request).await {
            Ok(response) => Dispatch::Response(response),
            Err(e) => Dispatch::Failed(e),
        }
    }
}

#[derive(Debug, Default)]
pub struct RouterBuilder {
    routes: HashMap<String, RouteEntry>,
}

impl RouterBuilder {
    /// Registers a handler accepting the [`DEFAULT_METHODS`].
    ///
    /// Registering the same path again replaces the previous entry.
    pub fn route<H, M>(self, path: impl Into<String>, handler: H) -> Self
    where
        H: IntoRouteHandler<M>,
    {
        self.insert(path.into(), type_name::<H>(), DEFAULT_METHODS.to_vec(), handler.into_route_handler())
    }

    /// Registers a handler accepting only the given methods.
    ///
    /// Method tokens are case-sensitive, `"GET"` and `"get"` are different methods.
    pub fn route_with_methods<H, M, I, S>(self, path: impl Into<String>, handler: H, methods: I) -> Result<Self, RouterError>
    where
        H: IntoRouteHandler<M>,
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = path.into();

        let mut allowed_methods = Vec::new();
        for token in methods {
            let token = token.as_ref();
            let method = Method::from_bytes(token.as_bytes())
                .map_err(|_e| RouterError::InvalidMethod { path: path.clone(), method: token.to_string() })?;
            if !allowed_methods.contains(&method) {
                allowed_methods.push(method);
            }
        }

        if allowed_methods.is_empty() {
            return Err(RouterError::EmptyMethods { path });
        }

        Ok(self.insert(path, type_name::<H>(), allowed_methods, handler.into_route_handler()))
    }

    fn insert(mut self, path: String, name: &'static str, allowed_methods: Vec<Method>, handler: RouteHandler) -> Self {
        if self.routes.contains_key(&path) {
            warn!(path = %path, "route registered twice, replacing the previous handler");
        }

        let entry = RouteEntry { path: path.clone(), name, allowed_methods, handler };
        self.routes.insert(path, entry);
        self
    }

    pub fn build(self) -> Router {
        Router { routes: self.routes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aquarius_http::protocol::{EncodedResponse, RequestLine, Response, SendError};
    use bytes::Bytes;
    use http::{HeaderMap, Version};

    fn test_handler(request: &Request) -> Result<EncodedResponse, SendError> {
        request.to_response("/test")
    }

    async fn status_handler(_request: Request) -> Response {
        Response::text("up")
    }

    fn broken_handler(_request: &Request) -> Result<Response, std::io::Error> {
        Err(std::io::Error::other("broken"))
    }

    fn request(method: Method, target: &str) -> Request {
        Request::from_parts(RequestLine::new(method, target, Version::HTTP_11), HeaderMap::new(), Bytes::new())
    }

    fn router() -> Router {
        Router::builder()
            .route_with_methods("/test/", test_handler, ["GET"])
            .unwrap()
            .route("/status", status_handler)
            .route("/broken", broken_handler)
            .build()
    }

    #[test]
    fn resolves_exact_paths_only() {
        let router = router();
        assert_eq!(router.len(), 3);
        assert_eq!(router.resolve("/test/").unwrap().path(), "/test/");
        assert!(router.resolve("/test").is_none());
        assert!(router.resolve("/test/x").is_none());
        assert!(router.resolve("/").is_none());
    }

    #[test]
    fn default_and_explicit_methods() {
        let router = router();
        assert_eq!(router.resolve("/status").unwrap().allowed_methods(), &DEFAULT_METHODS[..]);
        assert_eq!(router.resolve("/test/").unwrap().allowed_methods(), &[Method::GET][..]);
        assert!(!router.resolve("/test/").unwrap().allows(&Method::POST));
    }

    #[test]
    fn suspension_follows_handler_shape() {
        let router = router();
        assert!(!router.resolve("/test/").unwrap().suspends());
        assert!(router.resolve("/status").unwrap().suspends());
    }

    #[test]
    fn invalid_method_sets_are_rejected() {
        let empty: [&str; 0] = [];
        let result = Router::builder().route_with_methods("/a", test_handler, empty);
        assert_eq!(result.unwrap_err(), RouterError::EmptyMethods { path: "/a".into() });

        let result = Router::builder().route_with_methods("/a", test_handler, ["GET", "BAD METHOD"]);
        assert_eq!(result.unwrap_err(), RouterError::InvalidMethod { path: "/a".into(), method: "BAD METHOD".into() });
    }

    #[test]
    fn later_registration_wins() {
        let router = Router::builder().route("/a", test_handler).route("/a", status_handler).build();
        assert_eq!(router.len(), 1);
        assert!(router.resolve("/a").unwrap().suspends());
    }

    #[test]
    fn listing_shows_every_route() {
        let listing = router().to_string();
        let lines = listing.lines().collect::<Vec<_>>();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("/broken  "));
        assert!(lines[1].starts_with("/status  ") && lines[1].contains("status_handler") && lines[1].ends_with("async"));
        assert!(lines[2].starts_with("/test/  ") && lines[2].contains("test_handler") && lines[2].ends_with("  sync"));
    }

    #[tokio::test]
    async fn dispatch_outcomes() {
        let router = router();

        let Dispatch::Response(response) = router.call(request(Method::GET, "/test/?a=1")).await else {
            panic!("expected a response");
        };
        assert_eq!(response, Response::text("/test").encode().unwrap());

        assert!(matches!(router.call(request(Method::POST, "/test/")).await, Dispatch::MethodNotAllowed));
        assert!(matches!(router.call(request(Method::GET, "/nowhere")).await, Dispatch::NotFound));
        assert!(matches!(router.call(request(Method::GET, "/broken")).await, Dispatch::Failed(_)));
        assert!(matches!(router.call(request(Method::PATCH, "/status")).await, Dispatch::MethodNotAllowed));
    }
}
