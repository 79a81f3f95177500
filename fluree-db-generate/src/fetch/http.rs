//! HTTP(S) document fetcher
//!
//! Issues a GET with the request's ACCEPT value as `Accept` header. Any
//! transport error or non-success status answers `None`.
//!
//! The body is not buffered: a task pumps response chunks into a bounded
//! channel and the returned stream reads them as they arrive. Reading
//! blocks, so the stream must be consumed on the blocking pool. Dropping
//! the stream stops the pump and releases the connection.

use super::{content_type_essence, DocumentFetcher, LookUpRequest, TypedStream};
use crate::error::{GenerateError, Result};
use async_trait::async_trait;
use bytes::{Buf, Bytes};
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::io::{self, Read};
use std::time::Duration;
use tokio::sync::mpsc;

/// Response chunks buffered ahead of the reader
const BODY_CHUNKS: usize = 8;

/// HTTP document fetcher backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with a request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GenerateError::Configuration(format!("http client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn is_http(location: &str) -> bool {
        location.starts_with("http://") || location.starts_with("https://")
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn open(&self, request: &LookUpRequest) -> Option<TypedStream> {
        if !Self::is_http(&request.location) {
            return None;
        }

        let response = match self
            .client
            .get(&request.location)
            .header(ACCEPT, &request.accept)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(request = %request, error = %e, "http fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::info!(request = %request, status = %status, "http fetch returned no document");
            return None;
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(content_type_essence);

        tracing::debug!(
            request = %request,
            status = %status,
            media_type = ?media_type,
            "http response streaming"
        );
        let reader = BodyReader::spawn(response, request.clone());
        Some(TypedStream::new(Box::new(reader), media_type))
    }
}

/// Blocking reader over a response body pumped by a background task
struct BodyReader {
    rx: mpsc::Receiver<io::Result<Bytes>>,
    chunk: Bytes,
}

impl BodyReader {
    fn spawn(response: reqwest::Response, request: LookUpRequest) -> Self {
        let (tx, rx) = mpsc::channel(BODY_CHUNKS);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut bytes = 0usize;
            while let Some(chunk) = body.next().await {
                let chunk = chunk.map_err(|e| {
                    tracing::warn!(request = %request, bytes, error = %e, "http body read failed");
                    io::Error::other(e)
                });
                let failed = chunk.is_err();
                if let Ok(chunk) = &chunk {
                    bytes += chunk.len();
                }
                if tx.send(chunk).await.is_err() {
                    tracing::debug!(request = %request, bytes, "http body abandoned by reader");
                    return;
                }
                if failed {
                    return;
                }
            }
            tracing::debug!(request = %request, bytes, "http fetch complete");
        });
        Self::from_channel(rx)
    }

    fn from_channel(rx: mpsc::Receiver<io::Result<Bytes>>) -> Self {
        Self {
            rx,
            chunk: Bytes::new(),
        }
    }
}

impl Read for BodyReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.chunk.is_empty() {
            match self.rx.blocking_recv() {
                Some(Ok(chunk)) => self.chunk = chunk,
                Some(Err(e)) => return Err(e),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(self.chunk.len());
        buf[..n].copy_from_slice(&self.chunk[..n]);
        self.chunk.advance(n);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    /// Serve one HTTP response on a local port, returning the document URL
    fn serve_once(status: &'static str, content_type: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut conn, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = conn.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            write!(
                conn,
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
        });
        format!("http://{addr}/doc.json")
    }

    #[tokio::test]
    async fn test_streams_response_body() {
        let url = serve_once("200 OK", "application/json; charset=utf-8", r#"{"a":[1,2,3]}"#);
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        let stream = fetcher
            .open(&LookUpRequest::new(url, "application/json"))
            .await
            .unwrap();
        assert_eq!(stream.media_type(), Some("application/json"));

        let text = tokio::task::spawn_blocking(move || stream.read_to_string())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(text, r#"{"a":[1,2,3]}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_none() {
        let url = serve_once("404 Not Found", "text/plain", "missing");
        let fetcher = HttpFetcher::new(Duration::from_secs(5)).unwrap();
        assert!(fetcher.open(&LookUpRequest::new(url, "*/*")).await.is_none());
    }

    #[test]
    fn test_body_reader_joins_chunks() {
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(Ok(Bytes::from_static(b"[1,"))).unwrap();
        tx.try_send(Ok(Bytes::new())).unwrap();
        tx.try_send(Ok(Bytes::from_static(b"2]"))).unwrap();
        drop(tx);

        let mut text = String::new();
        BodyReader::from_channel(rx).read_to_string(&mut text).unwrap();
        assert_eq!(text, "[1,2]");
    }

    #[test]
    fn test_body_reader_reports_transport_error() {
        let (tx, rx) = mpsc::channel(4);
        tx.try_send(Ok(Bytes::from_static(b"[1,"))).unwrap();
        tx.try_send(Err(io::Error::other("connection reset"))).unwrap();

        let mut out = Vec::new();
        let err = BodyReader::from_channel(rx).read_to_end(&mut out).unwrap_err();
        assert_eq!(err.to_string(), "connection reset");
        assert_eq!(out, b"[1,");
    }

    #[test]
    fn test_dropping_reader_closes_channel() {
        let (tx, rx) = mpsc::channel::<io::Result<Bytes>>(1);
        let reader = BodyReader::from_channel(rx);
        assert!(!tx.is_closed());
        drop(reader);
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_non_http_location_is_none() {
        let fetcher = HttpFetcher::new(Duration::from_millis(100)).unwrap();
        assert!(fetcher
            .open(&LookUpRequest::new("urn:example:doc", "*/*"))
            .await
            .is_none());
        assert!(fetcher
            .open(&LookUpRequest::new("file:///tmp/x.json", "*/*"))
            .await
            .is_none());
    }
}
