//! The protocol engine of the aquarius HTTP server
//!
//! This crate turns the raw bytes of a client connection into requests, hands each
//! request to a [`handler::Handler`] and writes the encoded answers back. It is
//! built on top of tokio and `tokio_util::codec`.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tracing::{error, info, warn};
//! use aquarius_http::connection::HttpConnection;
//! use aquarius_http::handler::{make_handler, Dispatch};
//! use aquarius_http::protocol::Request;
//!
//! #[tokio::main]
//! async fn main() {
//!     info!(port = 8080, "start listening");
//!     let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
//!         Ok(tcp_listener) => tcp_listener,
//!         Err(e) => {
//!             error!(cause = %e, "bind server error");
//!             return;
//!         }
//!     };
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!
//!     loop {
//!         let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
//!             Ok(stream_and_addr) => stream_and_addr,
//!             Err(e) => {
//!                 warn!(cause = %e, "failed to accept");
//!                 continue;
//!             }
//!         };
//!
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = tcp_stream.into_split();
//!             let connection = HttpConnection::new(reader, writer);
//!             if let Err(e) = connection.process(handler).await {
//!                 error!(cause = %e, "connection shutdown with error");
//!             }
//!         });
//!     }
//! }
//!
//! async fn hello_world(request: Request) -> Dispatch {
//!     match request.to_response("Hello World!") {
//!         Ok(response) => Dispatch::Response(response),
//!         Err(e) => Dispatch::Failed(e.into()),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`codec`]: the wire parser emitting parse events and the response encoder
//! - [`protocol`]: requests, responses, parse events and errors
//! - [`connection`]: the per-connection controller and its request accumulator
//! - [`handler`]: the seam a routing layer plugs into
//!
//! # Connection lifecycle
//!
//! One request is in flight per connection. After its response is written the
//! connection closes if the request was HTTP/1.0 and waits for the next message
//! otherwise. A refused method or a failing handler closes the connection without
//! writing anything, an unknown path gets the fixed not-found response.
//!
//! # Limitations
//!
//! - HTTP/1.0 and HTTP/1.1 only
//! - Request bodies are framed by `Content-Length` only, no chunked encoding
//! - No TLS support (use a reverse proxy for HTTPS)
//! - Maximum header size: 8KB
//! - Maximum number of headers: 64

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
