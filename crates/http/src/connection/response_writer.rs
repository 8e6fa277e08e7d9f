use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::protocol::{EncodedResponse, SendError};

/// The socket side of a connection.
///
/// Every response is written in full and flushed before the next request is read.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write(&mut self, response: &EncodedResponse) -> Result<(), SendError> {
        self.writer.write_all(response.as_bytes()).await?;
        Ok(self.writer.flush().await?)
    }

    /// Shuts down the write side, the peer sees end of stream.
    pub async fn shutdown(&mut self) -> Result<(), SendError> {
        Ok(self.writer.shutdown().await?)
    }
}
