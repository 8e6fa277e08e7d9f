//! HTTP connection handling module
//!
//! This module ties the codec and a [`Handler`](crate::handler::Handler) together
//! for one client connection.
//!
//! # Components
//!
//! - [`HttpConnection`]: the connection controller, it
//!   - pulls parse events and accumulates them into requests
//!   - dispatches each request exactly once
//!   - writes responses in request order
//!   - closes after HTTP/1.0 responses, refused methods and failed handlers
//! - [`RequestAccumulator`]: folds parse events into a [`Request`](crate::protocol::Request)
//! - [`ResponseWriter`]: writes and flushes encoded responses
//! - [`ConnectionOptions`]: malformed input policy, idle timeout and buffer size

mod http_connection;
mod request_accumulator;
mod response_writer;

pub use http_connection::ACCESS_LOG_TARGET;
pub use http_connection::ConnectionOptions;
pub use http_connection::HttpConnection;
pub use request_accumulator::RequestAccumulator;
pub use response_writer::ResponseWriter;
