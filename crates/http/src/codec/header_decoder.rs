//! HTTP request head decoder
//!
//! Parses the start line and the header block of a request with `httparse` and
//! decides how many body bytes follow.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 8KB
//! - Only HTTP/1.0 and HTTP/1.1
//!
//! Body framing is `Content-Length` only. A request carrying `Transfer-Encoding`
//! is rejected, chunked decoding is not supported.

use std::mem::MaybeUninit;

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Method, Version, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, RequestLine};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the start line plus the header block
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// A parsed request head.
#[derive(Debug)]
pub(crate) struct RequestHead {
    pub(crate) line: RequestLine,
    pub(crate) headers: Vec<(HeaderName, HeaderValue)>,
    pub(crate) content_length: u64,
}

/// Decoder for the request head implementing the [`Decoder`] trait.
///
/// On success the head bytes are consumed from the buffer and whatever follows
/// (body bytes, or the next pipelined request) is left in place.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = RequestHead;
    type Error = ParseError;

    /// Returns `Ok(None)` while the head is incomplete and leaves the buffer untouched.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut headers = [const { MaybeUninit::<httparse::Header<'_>>::uninit() }; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut []);

        let parsed = req.parse_with_uninit_headers(src, &mut headers).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            Error::Version => ParseError::InvalidVersion(None),
            e => ParseError::invalid_header(e),
        })?;

        let head_size = match parsed {
            Status::Complete(head_size) => head_size,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(head_size, "parsed request head");
        ensure!(head_size <= MAX_HEADER_BYTES, ParseError::too_large_header(head_size, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let method = req.method.ok_or(ParseError::InvalidMethod)?;
        let method = Method::from_bytes(method.as_bytes()).map_err(|_e| ParseError::InvalidMethod)?;
        let target = req.path.ok_or(ParseError::InvalidUri)?;
        let line = RequestLine::new(method, target, version);

        let mut fields = Vec::with_capacity(req.headers.len());
        for field in req.headers.iter() {
            let name = HeaderName::from_bytes(field.name.as_bytes()).map_err(ParseError::invalid_header)?;
            let value = HeaderValue::from_bytes(field.value).map_err(ParseError::invalid_header)?;
            fields.push((name, value));
        }

        let content_length = parse_content_length(&fields)?;

        src.advance(head_size);
        Ok(Some(RequestHead { line, headers: fields, content_length }))
    }
}

/// Reads the body length from the header fields.
///
/// A missing `Content-Length` means no body. Repeated fields must agree.
fn parse_content_length(fields: &[(HeaderName, HeaderValue)]) -> Result<u64, ParseError> {
    let mut length = None;
    for (name, value) in fields {
        if name == header::TRANSFER_ENCODING {
            return Err(ParseError::UnsupportedTransferEncoding);
        }

        if name != header::CONTENT_LENGTH {
            continue;
        }

        let text = value.to_str().map_err(|_e| ParseError::invalid_content_length("value can't to_str"))?;
        let parsed =
            text.trim().parse::<u64>().map_err(|_e| ParseError::invalid_content_length(format!("value {text} is not u64")))?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ParseError::invalid_content_length(format!("conflicting values {previous} and {parsed}")));
            }
            _ => length = Some(parsed),
        }
    }
    Ok(length.unwrap_or(0))
}
