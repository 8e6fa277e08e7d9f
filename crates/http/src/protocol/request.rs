//! HTTP request handling implementation.
//!
//! A [`Request`] is materialized by the connection's request accumulator once a
//! whole message has been parsed. It keeps the request-target exactly as it was
//! received and derives the routing path and the query parameters from it.

use std::collections::HashMap;

use bytes::Bytes;
use http::{HeaderMap, Method, Version};
use once_cell::sync::OnceCell;

use crate::protocol::message::version_str;
use crate::protocol::{Content, EncodedResponse, RequestLine, Response, SendError};

/// A complete HTTP request.
#[derive(Debug)]
pub struct Request {
    line: RequestLine,
    headers: HeaderMap,
    body: Bytes,
    query_parameters: OnceCell<HashMap<String, String>>,
}

impl Request {
    /// Assembles a request from its start line, header fields and body.
    pub fn from_parts(line: RequestLine, headers: HeaderMap, body: Bytes) -> Self {
        Self { line, headers, body, query_parameters: OnceCell::new() }
    }

    /// Returns the start line this request was parsed from.
    pub fn request_line(&self) -> &RequestLine {
        &self.line
    }

    pub fn method(&self) -> &Method {
        self.line.method()
    }

    /// Returns the raw request-target, query included.
    pub fn uri(&self) -> &str {
        self.line.target()
    }

    /// Returns the request-target with the query component stripped.
    ///
    /// This is the key used for routing.
    pub fn path(&self) -> &str {
        match self.uri().split_once('?') {
            Some((path, _)) => path,
            None => self.uri(),
        }
    }

    /// Returns the raw query component, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.uri().split_once('?').map(|(_, query)| query)
    }

    /// Returns the query parameters, parsed on first access.
    ///
    /// The last occurrence of a repeated name wins and a name without `=` maps to
    /// an empty string. Names and values are not percent-decoded.
    pub fn query_parameters(&self) -> &HashMap<String, String> {
        self.query_parameters.get_or_init(|| self.query().map(parse_query).unwrap_or_default())
    }

    pub fn version(&self) -> Version {
        self.line.version()
    }

    /// Returns the bare version number, `"1.0"` or `"1.1"`.
    pub fn version_str(&self) -> &'static str {
        version_str(self.version())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as text, if present and visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Encodes a `200` response carrying `content`.
    ///
    /// Text becomes `text/html`, structured values become `application/json`.
    pub fn to_response(&self, content: impl Into<Content>) -> Result<EncodedResponse, SendError> {
        Response::new(content).encode()
    }
}

/// Splits a query string into a name to value mapping.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut parameters = HashMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        parameters.insert(name.to_string(), value.to_string());
    }
    parameters
}
