//! HTTP codec module for decoding requests and encoding responses
//!
//! Both directions plug into `tokio_util::codec`:
//!
//! - Request handling:
//!   - [`RequestDecoder`]: turns connection bytes into [`ParseEvent`](crate::protocol::ParseEvent)s
//!   - head parsing is delegated to an internal `httparse` based decoder
//!   - body bytes are framed by `Content-Length` only
//!
//! - Response handling:
//!   - [`ResponseEncoder`]: serializes a complete [`Response`](crate::protocol::Response)
//!
//! # Example
//!
//! ```
//! use aquarius_http::codec::ResponseEncoder;
//! use aquarius_http::protocol::Response;
//! use tokio_util::codec::Encoder;
//! use bytes::BytesMut;
//!
//! let mut buffer = BytesMut::new();
//! ResponseEncoder::new().encode(Response::text("hi"), &mut buffer).unwrap();
//! assert!(buffer.starts_with(b"HTTP/1.1 200\r\n"));
//! ```

mod header_decoder;
mod length_decoder;
mod request_decoder;
mod response_encoder;

pub use request_decoder::MalformedPolicy;
pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
pub use response_encoder::SERVER_NAME;
