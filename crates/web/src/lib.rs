//! A minimal HTTP/1.x server with exact path routing.
//!
//! Handlers are plain functions bound to exact paths on a [`Router`]. The
//! [`Server`] accepts connections and runs each one with the protocol engine from
//! `aquarius-http`, whose request and response types are re-exported in [`protocol`].
//!
//! ```no_run
//! use aquarius::protocol::{EncodedResponse, Request, SendError};
//! use aquarius::{Router, Server, ServerConfig};
//!
//! fn test(request: &Request) -> Result<EncodedResponse, SendError> {
//!     request.to_response("/test")
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::builder().route_with_methods("/test/", test, ["GET"])?.build();
//!
//!     Server::builder().router(router).config(ServerConfig::from_env()?).build()?.start().await?;
//!     Ok(())
//! }
//! ```
//!
//! Besides serving, the crate carries the collaborators handlers tend to need:
//! [`fetch`] for outbound requests, [`rpc`] for calls over a message queue and
//! [`logging`] for installing a log subscriber.

pub mod config;
pub mod fetch;
pub mod handler;
pub mod logging;
pub mod router;
pub mod rpc;
pub mod server;

pub use aquarius_http::protocol;

pub use config::ServerConfig;
pub use fetch::FetchClient;
pub use handler::IntoHandlerResult;
pub use handler::RouteHandler;
pub use logging::LogSettings;
pub use router::Router;
pub use server::Server;
