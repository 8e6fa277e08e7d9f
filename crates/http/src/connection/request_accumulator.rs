use std::mem;

use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use tracing::warn;

use crate::protocol::{ParseEvent, Request, RequestLine};

/// Folds the parse events of one connection into complete [`Request`]s.
///
/// Exactly one request is in progress at a time. Once a message completes the
/// accumulator is back to its blank state, ready for the next message on the
/// same connection.
#[derive(Debug, Default)]
pub struct RequestAccumulator {
    line: Option<RequestLine>,
    headers: HeaderMap,
    body: Vec<Bytes>,
}

impl RequestAccumulator {
    pub fn new() -> Self {
        Default::default()
    }

    /// Returns true if no message is in progress
    pub fn is_idle(&self) -> bool {
        self.line.is_none()
    }

    /// Applies one event, returning the request it completes, if any.
    pub fn accept(&mut self, event: ParseEvent) -> Option<Request> {
        match event {
            ParseEvent::StartLine(line) => {
                if let Some(previous) = self.line.replace(line) {
                    warn!(request = %previous, "new start line before end of message, dropping the previous message");
                    self.headers.clear();
                    self.body.clear();
                }
                None
            }

            // the last value of a repeated field wins
            ParseEvent::Header(name, value) if !self.is_idle() => {
                self.headers.insert(name, value);
                None
            }

            ParseEvent::HeadersComplete => None,

            ParseEvent::Body(bytes) if !self.is_idle() => {
                self.body.push(bytes);
                None
            }

            ParseEvent::MessageComplete if !self.is_idle() => {
                let line = self.line.take()?;
                let headers = mem::take(&mut self.headers);
                let body = concat(mem::take(&mut self.body));
                Some(Request::from_parts(line, headers, body))
            }

            event => {
                warn!(?event, "event without a start line, ignoring it");
                None
            }
        }
    }
}

fn concat(mut fragments: Vec<Bytes>) -> Bytes {
    if fragments.len() <= 1 {
        return fragments.pop().unwrap_or_default();
    }

    let mut body = BytesMut::with_capacity(fragments.iter().map(Bytes::len).sum());
    for fragment in &fragments {
        body.extend_from_slice(fragment);
    }
    body.freeze()
}
