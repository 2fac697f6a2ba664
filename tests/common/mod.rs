//! Shared fixtures for end-to-end relay tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use page_relay::{Config, PageRelay};
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// API server bound to an ephemeral port
pub struct TestServer {
    pub relay: Arc<PageRelay>,
    pub address: SocketAddr,
    pub handle: JoinHandle<page_relay::Result<()>>,
}

impl TestServer {
    pub async fn start(config: Config) -> Self {
        let relay = Arc::new(PageRelay::new(config).unwrap());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let handle = tokio::spawn(page_relay::api::serve(listener, relay.clone()));
        Self {
            relay,
            address,
            handle,
        }
    }

    /// Address of the SSE stream relaying `target`
    pub fn download_url(&self, target: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
        format!("http://{}/api/download?url={}", self.address, encoded)
    }

    /// Poll until no relay is running
    pub async fn wait_until_idle(&self, timeout: Duration) -> bool {
        wait_for(timeout, || self.relay.active_relays() == 0).await
    }
}

pub async fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Origin that dribbles a fixed-length HTML body out chunk by chunk
///
/// Serves a single connection and records whether the client hung up before
/// the body was complete.
pub struct SlowOrigin {
    pub address: SocketAddr,
    aborted: Arc<AtomicBool>,
    _task: JoinHandle<()>,
}

impl SlowOrigin {
    pub async fn start(chunk: &[u8], count: usize, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let aborted = Arc::new(AtomicBool::new(false));
        let flag = aborted.clone();
        let chunk = chunk.to_vec();

        let task = tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };

            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }

            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                chunk.len() * count
            );
            if socket.write_all(header.as_bytes()).await.is_err() {
                flag.store(true, Ordering::SeqCst);
                return;
            }

            for _ in 0..count {
                tokio::time::sleep(delay).await;
                if socket.write_all(&chunk).await.is_err() || socket.flush().await.is_err() {
                    flag.store(true, Ordering::SeqCst);
                    return;
                }
            }
        });

        Self {
            address,
            aborted,
            _task: task,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/slow", self.address)
    }

    /// Wait until a write to the client failed
    pub async fn wait_for_abort(&self, timeout: Duration) -> bool {
        wait_for(timeout, || self.aborted.load(Ordering::SeqCst)).await
    }
}

/// Incremental reader of an SSE response body
pub struct SseReader {
    pub status: reqwest::StatusCode,
    pub content_type: Option<String>,
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    buffer: Vec<u8>,
}

impl SseReader {
    pub async fn open(url: &str) -> Self {
        let response = reqwest::get(url).await.unwrap();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Self {
            status: response.status(),
            content_type,
            stream: response.bytes_stream().boxed(),
            buffer: Vec::new(),
        }
    }

    /// Next `data` message as JSON, `None` once the stream ended
    pub async fn next_message(&mut self) -> Option<Value> {
        loop {
            if let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
                let frame: Vec<u8> = self.buffer.drain(..end + 2).collect();
                let frame = String::from_utf8(frame).unwrap();
                let data: Vec<&str> = frame
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();
                if data.is_empty() {
                    // keep-alive comment
                    continue;
                }
                return Some(serde_json::from_str(&data.join("\n")).unwrap());
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(&chunk),
                _ => return None,
            }
        }
    }

    /// Read every remaining message
    pub async fn drain(mut self) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Some(message) = self.next_message().await {
            messages.push(message);
        }
        messages
    }
}
