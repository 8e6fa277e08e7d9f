//! Core HTTP protocol abstractions.
//!
//! This module holds the values that flow through the protocol engine:
//!
//! - **Parse events** ([`message`]): what the wire parser emits while consuming bytes
//!   - [`ParseEvent`]: start line, header field, end of headers, body fragment, end of message
//!   - [`RequestLine`]: method, raw request-target and version
//!
//! - **Requests** ([`request`]): the materialized [`Request`], with a lazily parsed
//!   query mapping
//!
//! - **Responses** ([`response`]): the [`Response`] a handler builds, its [`Content`] and
//!   [`Cookie`]s, and the [`EncodedResponse`] bytes that are finally written
//!
//! - **Errors** ([`error`]):
//!   - [`HttpError`]: Top-level error type
//!   - [`ParseError`]: Request parsing errors
//!   - [`SendError`]: Response sending errors

mod message;
pub use message::ParseEvent;
pub use message::RequestLine;
pub use message::version_str;

mod request;
pub use request::Request;
pub use request::parse_query;

mod response;
pub use response::Content;
pub use response::Cookie;
pub use response::EncodedResponse;
pub use response::NOT_FOUND_RESPONSE;
pub use response::Response;

mod error;
pub use error::BoxError;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
