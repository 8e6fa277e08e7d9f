use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use http::Version;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, warn};

use crate::codec::{MalformedPolicy, RequestDecoder};
use crate::connection::{RequestAccumulator, ResponseWriter};
use crate::handler::{Dispatch, Handler};
use crate::protocol::{EncodedResponse, HttpError, Request, RequestLine};

/// Target of the one-line-per-request access log
pub const ACCESS_LOG_TARGET: &str = "aquarius::access";

/// Per-connection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionOptions {
    /// What happens on input that can't be parsed
    pub malformed: MalformedPolicy,
    /// Closes a connection that doesn't complete its next message in time, off when `None`
    pub idle_timeout: Option<Duration>,
    /// Initial capacity of the read buffer
    pub read_capacity: usize,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { malformed: MalformedPolicy::Discard, idle_timeout: None, read_capacity: 8 * 1024 }
    }
}

/// An HTTP connection serving one request at a time
///
/// `HttpConnection` drives the full lifecycle of a connection:
/// - pulling parse events from the [`RequestDecoder`] until a request is complete
/// - handing the request to the [`Handler`] and awaiting its outcome
/// - writing the response, then closing for HTTP/1.0 or waiting for the next message
///
/// The next event is not pulled until the current response has been written,
/// pipelined requests stay in the read buffer and are served in order.
///
/// # Type Parameters
///
/// * `R`: The async readable stream type
/// * `W`: The async writable stream type
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: ResponseWriter<W>,
    accumulator: RequestAccumulator,
    idle_timeout: Option<Duration>,
}

impl<R, W> fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoder = self.framed_read.decoder();
        f.debug_struct("HttpConnection")
            .field("malformed", &decoder.policy())
            .field("failed", &decoder.is_failed())
            .field("idle", &self.accumulator.is_idle())
            .field("idle_timeout", &self.idle_timeout)
            .finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_options(reader, writer, ConnectionOptions::default())
    }

    pub fn with_options(reader: R, writer: W, options: ConnectionOptions) -> Self {
        let decoder = RequestDecoder::with_policy(options.malformed);
        Self {
            framed_read: FramedRead::with_capacity(reader, decoder, options.read_capacity),
            writer: ResponseWriter::new(writer),
            accumulator: RequestAccumulator::new(),
            idle_timeout: options.idle_timeout,
        }
    }

    /// Serves requests until the peer closes, the lifecycle policy closes, or an error occurs.
    ///
    /// Returns `Ok(())` for every orderly close, including the ones triggered by a
    /// refused method or a failing handler.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler + ?Sized,
    {
        loop {
            let Some(request) = self.next_request().await? else {
                debug!("no more requests, connection shutdown");
                return Ok(());
            };

            let line = request.request_line().clone();
            let response = match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
                Ok(Dispatch::Response(response)) => response,
                Ok(Dispatch::NotFound) => EncodedResponse::not_found(),
                Ok(Dispatch::MethodNotAllowed) => {
                    warn!(request = %line, "method not allowed, closing connection");
                    return self.close().await;
                }
                Ok(Dispatch::Failed(e)) => {
                    error!(request = %line, cause = %e, "handler failed, closing connection");
                    return self.close().await;
                }
                Err(panic) => {
                    error!(request = %line, cause = panic_message(&*panic), "handler panicked, closing connection");
                    return self.close().await;
                }
            };

            self.writer.write(&response).await?;
            access_log(&line, &response);

            if line.version() == Version::HTTP_10 {
                return self.close().await;
            }
        }
    }

    async fn next_request(&mut self) -> Result<Option<Request>, HttpError> {
        let Some(idle_timeout) = self.idle_timeout else {
            return self.read_request().await;
        };

        match tokio::time::timeout(idle_timeout, self.read_request()).await {
            Ok(result) => result,
            Err(_elapsed) => {
                info!(timeout = ?idle_timeout, "connection idle, closing");
                Ok(None)
            }
        }
    }

    async fn read_request(&mut self) -> Result<Option<Request>, HttpError> {
        while let Some(event) = self.framed_read.next().await {
            if let Some(request) = self.accumulator.accept(event?) {
                return Ok(Some(request));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), HttpError> {
        if let Err(e) = self.writer.shutdown().await {
            debug!(cause = %e, "can't shutdown the write side");
        }
        Ok(())
    }
}

fn access_log(line: &RequestLine, response: &EncodedResponse) {
    info!(target: ACCESS_LOG_TARGET, "\"{}\" {}", line, response.status().as_u16());
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use http::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::task::JoinHandle;

    use crate::protocol::{NOT_FOUND_RESPONSE, Response};

    #[derive(Default)]
    struct TestHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Handler for TestHandler {
        async fn call(&self, request: Request) -> Dispatch {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match request.path() {
                "/test/" if *request.method() == Method::GET => request.to_response("/test").unwrap().into(),
                "/test/" => Dispatch::MethodNotAllowed,
                "/echo" => {
                    let body = String::from_utf8(request.body().to_vec()).unwrap();
                    request.to_response(body).unwrap().into()
                }
                "/fail" => Dispatch::Failed("boom".into()),
                "/panic" => panic!("handler exploded"),
                _ => Dispatch::NotFound,
            }
        }
    }

    fn serve(options: ConnectionOptions) -> (DuplexStream, Arc<TestHandler>, JoinHandle<Result<(), HttpError>>) {
        let (client, server) = tokio::io::duplex(64 * 1024);
        let (reader, writer) = tokio::io::split(server);
        let handler = Arc::new(TestHandler::default());
        let connection = HttpConnection::with_options(reader, writer, options);
        let task = tokio::spawn(connection.process(Arc::clone(&handler)));
        (client, handler, task)
    }

    fn test_response() -> Vec<u8> {
        Response::text("/test").encode().unwrap().into_bytes().to_vec()
    }

    async fn read_exact(client: &mut DuplexStream, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        client.read_exact(&mut buf).await.unwrap();
        buf
    }

    async fn assert_stays_silent(client: &mut DuplexStream) {
        let mut buf = [0u8; 64];
        let read = tokio::time::timeout(Duration::from_millis(50), client.read(&mut buf)).await;
        assert!(read.is_err(), "expected no bytes and an open connection");
    }

    #[tokio::test]
    async fn keep_alive_for_http_11() {
        let (mut client, handler, task) = serve(ConnectionOptions::default());
        let expected = test_response();

        client.write_all(b"GET /test/ HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
        assert_eq!(read_exact(&mut client, expected.len()).await, expected);

        client.write_all(b"GET /test/?a=1 HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();
        assert_eq!(read_exact(&mut client, expected.len()).await, expected);
        assert!(!task.is_finished());

        drop(client);
        task.await.unwrap().unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn close_after_http_10() {
        let (mut client, _handler, task) = serve(ConnectionOptions::default());

        client.write_all(b"GET /test/ HTTP/1.0\r\n\r\n").await.unwrap();
        let mut received = vec![];
        client.read_to_end(&mut received).await.unwrap();

        assert_eq!(received, test_response());
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn unknown_path_gets_fixed_not_found() {
        let (mut client, _handler, _task) = serve(ConnectionOptions::default());

        client.write_all(b"GET /missing HTTP/1.1\r\n\r\n").await.unwrap();
        assert_eq!(read_exact(&mut client, NOT_FOUND_RESPONSE.len()).await, NOT_FOUND_RESPONSE);
    }

    #[tokio::test]
    async fn refused_method_closes_without_bytes() {
        let (mut client, handler, task) = serve(ConnectionOptions::default());

        client.write_all(b"POST /test/ HTTP/1.1\r\n\r\n").await.unwrap();
        let mut received = vec![];
        client.read_to_end(&mut received).await.unwrap();

        assert!(received.is_empty());
        task.await.unwrap().unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_handler_closes_without_bytes() {
        for target in ["/fail", "/panic"] {
            let (mut client, _handler, task) = serve(ConnectionOptions::default());

            client.write_all(format!("GET {target} HTTP/1.1\r\n\r\n").as_bytes()).await.unwrap();
            let mut received = vec![];
            client.read_to_end(&mut received).await.unwrap();

            assert!(received.is_empty(), "{target}");
            task.await.unwrap().unwrap();
        }
    }

    #[tokio::test]
    async fn pipelined_requests_answered_in_order() {
        let (mut client, handler, _task) = serve(ConnectionOptions::default());

        client.write_all(b"GET /test/ HTTP/1.1\r\n\r\nGET /missing HTTP/1.1\r\n\r\n").await.unwrap();

        let mut expected = test_response();
        expected.extend_from_slice(NOT_FOUND_RESPONSE);
        assert_eq!(read_exact(&mut client, expected.len()).await, expected);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn fragmented_body_is_reassembled() {
        let (mut client, _handler, _task) = serve(ConnectionOptions::default());

        let input = b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world";
        for piece in input.chunks(3) {
            client.write_all(piece).await.unwrap();
            client.flush().await.unwrap();
            tokio::task::yield_now().await;
        }

        let expected = Response::text("hello world").encode().unwrap().into_bytes().to_vec();
        assert_eq!(read_exact(&mut client, expected.len()).await, expected);
    }

    #[tokio::test]
    async fn malformed_input_discarded_by_default() {
        let (mut client, handler, task) = serve(ConnectionOptions::default());

        client.write_all(b"\x01\x02 garbage\r\n\r\n").await.unwrap();
        assert_stays_silent(&mut client).await;

        client.write_all(b"GET /test/ HTTP/1.1\r\n\r\n").await.unwrap();
        assert_stays_silent(&mut client).await;
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn malformed_input_closes_when_asked() {
        let options = ConnectionOptions { malformed: MalformedPolicy::Close, ..Default::default() };
        let (mut client, _handler, task) = serve(options);

        client.write_all(b"\x01\x02 garbage\r\n\r\n").await.unwrap();
        let mut received = vec![];
        client.read_to_end(&mut received).await.unwrap();

        assert!(received.is_empty());
        assert!(matches!(task.await.unwrap(), Err(HttpError::RequestError { .. })));
    }

    #[tokio::test]
    async fn idle_connection_is_closed() {
        let options = ConnectionOptions { idle_timeout: Some(Duration::from_millis(20)), ..Default::default() };
        let (mut client, _handler, task) = serve(options);

        let mut received = vec![];
        client.read_to_end(&mut received).await.unwrap();

        assert!(received.is_empty());
        task.await.unwrap().unwrap();
    }

    #[test]
    fn panic_payload_is_readable() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(&*payload), "static message");

        let payload: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(&*payload), "owned message");

        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(&*payload), "unknown panic");
    }

    #[test]
    fn debug_shows_connection_state() {
        let (_client, server) = tokio::io::duplex(64);
        let (reader, writer) = tokio::io::split(server);
        let options = ConnectionOptions { malformed: MalformedPolicy::Close, idle_timeout: Some(Duration::from_secs(3)), ..Default::default() };
        let connection = HttpConnection::with_options(reader, writer, options);

        let debug = format!("{connection:?}");
        assert!(debug.starts_with("HttpConnection {"));
        assert!(debug.contains("malformed: Close"));
        assert!(debug.contains("failed: false"));
        assert!(debug.contains("idle: true"));
        assert!(debug.contains("idle_timeout: Some(3s)"));
    }
}
