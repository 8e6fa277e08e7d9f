use bytes::Bytes;
use http::{HeaderName, HeaderValue, Method, Version};
use std::fmt;

/// A discrete signal produced by the wire parser while it consumes bytes.
///
/// For one message the parser always emits, in this order:
/// `StartLine`, zero or more `Header`, `HeadersComplete`, zero or more `Body`,
/// and finally `MessageComplete`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// The request line: method, request-target and version
    StartLine(RequestLine),
    /// One header field
    Header(HeaderName, HeaderValue),
    /// The empty line terminating the header block has been seen
    HeadersComplete,
    /// A fragment of the body, as it arrived on the wire
    Body(Bytes),
    /// The message is complete, the next event belongs to a new message
    MessageComplete,
}

impl ParseEvent {
    /// Returns true if this event terminates a message
    #[inline]
    pub fn is_message_complete(&self) -> bool {
        matches!(self, ParseEvent::MessageComplete)
    }

    /// Returns true if this event carries body bytes
    #[inline]
    pub fn is_body(&self) -> bool {
        matches!(self, ParseEvent::Body(_))
    }
}

/// The start line of a request.
///
/// The request-target is kept exactly as received, it is never percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Method,
    target: String,
    version: Version,
}

impl RequestLine {
    pub fn new(method: Method, target: impl Into<String>, version: Version) -> Self {
        Self { method, target: target.into(), version }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn version(&self) -> Version {
        self.version
    }
}

/// Renders the line the way access logs quote it: `GET /index?a=1 HTTP/1.1`
impl fmt::Display for RequestLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} HTTP/{}", self.method, self.target, version_str(self.version))
    }
}

/// Returns the bare version number, `"1.0"` or `"1.1"`.
pub fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_10 => "1.0",
        Version::HTTP_11 => "1.1",
        Version::HTTP_09 => "0.9",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "unknown",
    }
}
