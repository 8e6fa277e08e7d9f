//! HTTP request decoder module
//!
//! Turns the raw bytes of a connection into a stream of [`ParseEvent`]s. Bytes may
//! arrive in fragments of any size: the decoder buffers until a decision can be
//! made and emits exactly the same events whatever the fragmentation.
//!
//! # Example
//!
//! ```
//! use aquarius_http::codec::RequestDecoder;
//! use aquarius_http::protocol::ParseEvent;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from(&b"GET / HTTP/1.1\r\n\r\n"[..]);
//!
//! assert!(matches!(decoder.decode(&mut buffer), Ok(Some(ParseEvent::StartLine(_)))));
//! assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(ParseEvent::HeadersComplete));
//! assert_eq!(decoder.decode(&mut buffer).unwrap(), Some(ParseEvent::MessageComplete));
//! ```

use std::collections::VecDeque;

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::{debug, warn};

use crate::codec::header_decoder::HeaderDecoder;
use crate::codec::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, ParseEvent};

/// What the decoder does when the input can't be parsed as HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Log the error, drop every further byte and keep the connection open
    #[default]
    Discard,
    /// Report the error, which ends the event stream and the connection
    Close,
}

#[derive(Debug)]
enum State {
    Head,
    Body(LengthDecoder),
    Failed,
}

/// A decoder emitting one [`ParseEvent`] per call.
///
/// # State Machine
///
/// - `Head`: waiting for a complete start line and header block
/// - `Body`: handing out body fragments until `Content-Length` bytes were read
/// - `Failed`: the input was malformed, everything that follows is dropped
///
/// A single head produces several events at once, they are queued and handed
/// out by the following calls before any more input is looked at.
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    state: State,
    pending: VecDeque<ParseEvent>,
    policy: MalformedPolicy,
}

impl RequestDecoder {
    /// Creates a decoder with the [`MalformedPolicy::Discard`] policy
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_policy(policy: MalformedPolicy) -> Self {
        Self { policy, ..Default::default() }
    }

    pub fn policy(&self) -> MalformedPolicy {
        self.policy
    }

    /// Returns true once malformed input has been seen
    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed)
    }

    fn advance(&mut self, src: &mut BytesMut) -> Result<(), ParseError> {
        match &mut self.state {
            State::Head => {
                let Some(head) = self.header_decoder.decode(src)? else {
                    return Ok(());
                };

                self.pending.push_back(ParseEvent::StartLine(head.line));
                for (name, value) in head.headers {
                    self.pending.push_back(ParseEvent::Header(name, value));
                }
                self.pending.push_back(ParseEvent::HeadersComplete);

                if head.content_length == 0 {
                    self.pending.push_back(ParseEvent::MessageComplete);
                } else {
                    self.state = State::Body(LengthDecoder::new(head.content_length));
                }
            }

            State::Body(length_decoder) => {
                if let Some(chunk) = length_decoder.decode(src)? {
                    self.pending.push_back(ParseEvent::Body(chunk));
                }

                if length_decoder.is_finished() {
                    self.pending.push_back(ParseEvent::MessageComplete);
                    self.state = State::Head;
                }
            }

            State::Failed => src.clear(),
        }
        Ok(())
    }

    fn fail(&mut self, e: ParseError, src: &mut BytesMut) -> Result<Option<ParseEvent>, ParseError> {
        src.clear();
        self.pending.clear();
        self.state = State::Failed;

        match self.policy {
            MalformedPolicy::Discard => {
                warn!(cause = %e, "malformed request, discarding further input on this connection");
                Ok(None)
            }
            MalformedPolicy::Close => Err(e),
        }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self {
            header_decoder: HeaderDecoder,
            state: State::Head,
            pending: VecDeque::new(),
            policy: MalformedPolicy::default(),
        }
    }
}

impl Decoder for RequestDecoder {
    type Item = ParseEvent;
    type Error = ParseError;

    /// Attempts to produce the next event from the buffer
    ///
    /// # Returns
    ///
    /// - `Ok(Some(event))`: the next event, in wire order
    /// - `Ok(None)`: more data is needed, or the input is being discarded
    /// - `Err(_)`: malformed input under [`MalformedPolicy::Close`]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        match self.advance(src) {
            Ok(()) => Ok(self.pending.pop_front()),
            Err(e) => self.fail(e, src),
        }
    }

    /// A peer closing in the middle of a message is not an error, the partial
    /// message is dropped.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(event) = self.decode(src)? {
            return Ok(Some(event));
        }

        if !src.is_empty() {
            debug!(remaining = src.len(), "peer closed in the middle of a message, dropping it");
            src.clear();
        }
        Ok(None)
    }
}
