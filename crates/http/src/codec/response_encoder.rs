//! HTTP response encoder
//!
//! Serializes a [`Response`] into the exact bytes written to the peer:
//!
//! ```text
//! HTTP/1.1 {code}\r\n
//! Content-Type: {type}; charset=utf-8\r\n
//! Server: aquarius 1.0\r\n
//! Set-Cookie: {key}={value}; path={path}\r\n      (one per cookie)
//! Content-Length:{body length}\r\n
//! \r\n
//! {body}\r\n
//! \r\n
//! ```
//!
//! The trailing `\r\n\r\n` after the body is not counted in `Content-Length`.

use std::borrow::Cow;
use std::io;
use std::io::Write;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{Content, Response, SendError};

/// Value of the `Server` header of every encoded response
pub const SERVER_NAME: &str = "aquarius 1.0";

/// Bytes reserved for the head on top of the body length
const INIT_HEAD_SIZE: usize = 256;

const BODY_TRAILER: &[u8] = b"\r\n\r\n";

/// Encoder for complete responses implementing the [`Encoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<Response> for ResponseEncoder {
    type Error = SendError;

    /// # Errors
    ///
    /// Returns [`SendError::Serialize`] if structured content can't be rendered as json.
    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body: Cow<'_, [u8]> = match item.content() {
            Content::Text(text) => Cow::Borrowed(text.as_bytes()),
            Content::Json(value) => Cow::Owned(serde_json::to_vec(value)?),
        };

        dst.reserve(INIT_HEAD_SIZE + body.len() + BODY_TRAILER.len());

        write!(FastWrite(dst), "HTTP/1.1 {}\r\n", item.status().as_str())?;
        write!(FastWrite(dst), "Content-Type: {}; charset=utf-8\r\n", item.content().content_type())?;
        write!(FastWrite(dst), "Server: {SERVER_NAME}\r\n")?;
        for cookie in item.cookies() {
            write!(FastWrite(dst), "Set-Cookie: {}={}; path={}\r\n", cookie.key, cookie.value, cookie.path)?;
        }
        write!(FastWrite(dst), "Content-Length:{}\r\n\r\n", body.len())?;

        dst.put_slice(&body);
        dst.put_slice(BODY_TRAILER);
        Ok(())
    }
}

/// Writer appending to a `BytesMut` whose capacity was reserved up front.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
