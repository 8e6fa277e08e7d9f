//! HTTP response building.
//!
//! A [`Response`] is built by a handler from its return value, turned into wire
//! bytes by the [`ResponseEncoder`](crate::codec::ResponseEncoder) and discarded.
//! What the connection writes is the resulting [`EncodedResponse`].

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use mime::Mime;
use serde::Serialize;
use tokio_util::codec::Encoder;

use crate::codec::ResponseEncoder;
use crate::protocol::SendError;

/// The fixed response written when no route matches the request path.
///
/// It does not go through the response encoder.
pub const NOT_FOUND_RESPONSE: &[u8] = b"HTTP/1.1 404 Not Found\r\nServer: aquarius\r\nContent-Length:9\r\n\r\nNot Found\r\n\r\n";

/// The body of a response, its kind decides the content type.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// Passed through as is, served as `text/html`
    Text(String),
    /// Serialized to compact json, served as `application/json`
    Json(serde_json::Value),
}

impl Content {
    /// Serializes any value into structured content.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, SendError> {
        Ok(Content::Json(serde_json::to_value(value)?))
    }

    pub fn content_type(&self) -> Mime {
        match self {
            Content::Text(_) => mime::TEXT_HTML,
            Content::Json(_) => mime::APPLICATION_JSON,
        }
    }
}

impl From<String> for Content {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

impl From<&str> for Content {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl From<serde_json::Value> for Content {
    fn from(value: serde_json::Value) -> Self {
        Content::Json(value)
    }
}

/// A cookie rendered as one `Set-Cookie` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub key: String,
    pub value: String,
    pub path: String,
}

/// A response before encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    content: Content,
    cookies: Vec<Cookie>,
}

impl Response {
    /// Creates a `200 OK` response.
    pub fn new(content: impl Into<Content>) -> Self {
        Self { status: StatusCode::OK, content: content.into(), cookies: Vec::new() }
    }

    /// Creates a `200 OK` text response.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Content::Text(text.into()))
    }

    /// Creates a `200 OK` json response from any serializable value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, SendError> {
        Ok(Self::new(Content::json(value)?))
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a cookie scoped to `/`.
    pub fn set_cookie(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_cookie_with_path(key, value, "/")
    }

    pub fn set_cookie_with_path(mut self, key: impl Into<String>, value: impl Into<String>, path: impl Into<String>) -> Self {
        self.cookies.push(Cookie { key: key.into(), value: value.into(), path: path.into() });
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    /// Encodes this response into its wire bytes.
    pub fn encode(self) -> Result<EncodedResponse, SendError> {
        let status = self.status;
        let mut buffer = BytesMut::new();
        ResponseEncoder::new().encode(self, &mut buffer)?;
        Ok(EncodedResponse { status, bytes: buffer.freeze() })
    }
}

/// The wire bytes of one response together with the status they carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedResponse {
    status: StatusCode,
    bytes: Bytes,
}

impl EncodedResponse {
    /// Wraps bytes that were encoded elsewhere.
    pub fn from_raw(status: StatusCode, bytes: Bytes) -> Self {
        Self { status, bytes }
    }

    /// The fixed not-found response.
    pub fn not_found() -> Self {
        Self { status: StatusCode::NOT_FOUND, bytes: Bytes::from_static(NOT_FOUND_RESPONSE) }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_type_by_kind() {
        assert_eq!(Content::from("hi").content_type(), mime::TEXT_HTML);
        assert_eq!(Content::from(json!({"a": 1})).content_type().as_ref(), "application/json");
        assert_eq!(Content::json(&vec![1, 2]).unwrap(), Content::Json(json!([1, 2])));
    }

    #[test]
    fn builder_keeps_cookie_order() {
        let response = Response::text("ok").set_cookie("a", "1").set_cookie_with_path("b", "2", "/admin");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.cookies().len(), 2);
        assert_eq!(response.cookies()[0], Cookie { key: "a".into(), value: "1".into(), path: "/".into() });
        assert_eq!(response.cookies()[1].path, "/admin");
    }

    #[test]
    fn not_found_has_nine_byte_body() {
        let response = EncodedResponse::not_found();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.as_bytes().ends_with(b"Content-Length:9\r\n\r\nNot Found\r\n\r\n"));
    }
}
