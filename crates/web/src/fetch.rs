//! Outbound HTTP fetches over a raw TCP connection.
//!
//! A [`FetchClient`] is built once, with the port to connect to and a timeout
//! covering the whole exchange, and passed to whatever needs it. Each fetch sends
//! a bare HTTP/1.0 request, so the peer closes the connection after answering.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

const DEFAULT_PORT: u16 = 80;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Read buffer size
const BUFFER_SIZE: usize = 8 * 1024;

const MAX_RESPONSE_HEADERS: usize = 64;

/// Largest body accepted unless the client is told otherwise
pub const DEFAULT_MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("invalid response: {reason}")]
    InvalidResponse { reason: String },

    #[error("response body truncated, expected {expected} bytes but received {received}")]
    Truncated { expected: usize, received: usize },

    #[error("response body exceeds the limit of {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("can't decode body: {source}")]
    Decode {
        #[from]
        source: serde_json::Error,
    },
}

impl FetchError {
    fn invalid_response<S: ToString>(reason: S) -> Self {
        Self::InvalidResponse { reason: reason.to_string() }
    }
}

/// A received response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl FetchResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, invalid UTF-8 sequences are replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

#[derive(Debug, Clone)]
pub struct FetchClient {
    port: u16,
    timeout: Duration,
    max_body_size: usize,
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new(DEFAULT_PORT)
    }
}

impl FetchClient {
    pub fn new(port: u16) -> Self {
        Self { port, timeout: DEFAULT_TIMEOUT, max_body_size: DEFAULT_MAX_BODY_SIZE }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Fetches `path` from `host`.
    ///
    /// The body is `Content-Length` bytes when the response declares it, otherwise
    /// everything received until the peer closes. Either way a body larger than
    /// [`max_body_size`](Self::max_body_size) fails with [`FetchError::BodyTooLarge`].
    pub async fn fetch(&self, host: &str, path: &str, method: &Method) -> Result<FetchResponse, FetchError> {
        tokio::time::timeout(self.timeout, self.exchange(host, path, method))
            .await
            .map_err(|_elapsed| FetchError::Timeout(self.timeout))?
    }

    /// Fetches a `host/path` location, everything after the last `/` is the path.
    pub async fn fetch_uri(&self, uri: &str, method: &Method) -> Result<FetchResponse, FetchError> {
        let (host, path) = uri.rsplit_once('/').unwrap_or((uri, ""));
        self.fetch(host, path, method).await
    }

    async fn exchange(&self, host: &str, path: &str, method: &Method) -> Result<FetchResponse, FetchError> {
        let mut stream = TcpStream::connect((host, self.port)).await?;
        debug!(host, port = self.port, %method, path, "fetching");

        let request = format!("{method} /{path} HTTP/1.0\r\nHost: {host}\r\n\r\n", path = path.trim_start_matches('/'));
        stream.write_all(request.as_bytes()).await?;
        stream.flush().await?;

        let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);
        let (head_size, status, headers) = loop {
            if let Some(head) = parse_head(&buffer)? {
                break head;
            }
            if stream.read_buf(&mut buffer).await? == 0 {
                return Err(FetchError::invalid_response("connection closed before the end of the response head"));
            }
        };

        let limit = self.max_body_size;
        let mut body = buffer.split_off(head_size);
        match content_length(&headers)? {
            Some(expected) if expected > limit => return Err(FetchError::BodyTooLarge { limit }),
            Some(expected) => {
                while body.len() < expected {
                    if stream.read_buf(&mut body).await? == 0 {
                        return Err(FetchError::Truncated { expected, received: body.len() });
                    }
                }
                body.truncate(expected);
            }
            None => loop {
                if body.len() > limit {
                    return Err(FetchError::BodyTooLarge { limit });
                }
                if stream.read_buf(&mut body).await? == 0 {
                    break;
                }
            },
        }

        Ok(FetchResponse { status, headers, body: body.freeze() })
    }
}

/// Parses the status line and headers, `None` while they are incomplete.
fn parse_head(buffer: &[u8]) -> Result<Option<(usize, StatusCode, HeaderMap)>, FetchError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut headers);

    let head_size = match response.parse(buffer).map_err(FetchError::invalid_response)? {
        httparse::Status::Complete(head_size) => head_size,
        httparse::Status::Partial => return Ok(None),
    };

    let code = response.code.ok_or_else(|| FetchError::invalid_response("missing status code"))?;
    let status = StatusCode::from_u16(code).map_err(FetchError::invalid_response)?;

    let mut header_map = HeaderMap::with_capacity(response.headers.len());
    for field in response.headers.iter() {
        let name = HeaderName::from_bytes(field.name.as_bytes()).map_err(FetchError::invalid_response)?;
        let value = HeaderValue::from_bytes(field.value).map_err(FetchError::invalid_response)?;
        header_map.append(name, value);
    }

    Ok(Some((head_size, status, header_map)))
}

fn content_length(headers: &HeaderMap) -> Result<Option<usize>, FetchError> {
    let Some(value) = headers.get(header::CONTENT_LENGTH) else {
        return Ok(None);
    };

    let text = value.to_str().map_err(FetchError::invalid_response)?;
    let length = text.trim().parse::<usize>().map_err(FetchError::invalid_response)?;
    Ok(Some(length))
}
