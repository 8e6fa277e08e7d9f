//! Body decoder for messages framed by `Content-Length`.

use std::cmp;

use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::protocol::ParseError;

/// Tracks how many body bytes are still expected and hands out fragments as they arrive.
///
/// Bytes beyond the declared length are never consumed, they belong to the next
/// message on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub(crate) fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    #[inline]
    pub(crate) fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

impl Decoder for LengthDecoder {
    type Item = Bytes;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 || src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.remaining, src.len() as u64);
        let bytes = src.split_to(len as usize).freeze();

        self.remaining -= bytes.len() as u64;
        Ok(Some(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_declared_length() {
        let mut buffer = BytesMut::from(&b"1012345678GET / HTTP/1.1\r\n\r\n"[..]);

        let mut decoder = LengthDecoder::new(10);
        let bytes = decoder.decode(&mut buffer).unwrap().unwrap();

        assert_eq!(&bytes[..], b"1012345678");
        assert_eq!(&buffer[..], b"GET / HTTP/1.1\r\n\r\n");
        assert!(decoder.is_finished());
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn hands_out_fragments() {
        let mut decoder = LengthDecoder::new(6);

        let mut buffer = BytesMut::from(&b"abc"[..]);
        assert_eq!(&decoder.decode(&mut buffer).unwrap().unwrap()[..], b"abc");
        assert!(!decoder.is_finished());
        assert!(decoder.decode(&mut buffer).unwrap().is_none());

        buffer.extend_from_slice(b"def");
        assert_eq!(&decoder.decode(&mut buffer).unwrap().unwrap()[..], b"def");
        assert!(decoder.is_finished());
    }
}
