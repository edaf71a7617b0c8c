//! Slow-streaming HTTP server for synthesis tests.
//!
//! wiremock answers with a complete body at once; these tests need the body
//! delivered piece by piece over time, and need to know when the client hung
//! up mid-stream. Every connection gets one `200` chunked response, one HTTP
//! chunk per entry, each preceded by `delay`.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

#[derive(Default)]
struct Counters {
    requests: AtomicUsize,
    completed: AtomicUsize,
    disconnects: AtomicUsize,
}

pub struct TrickleServer {
    pub base_url: String,
    counters: Arc<Counters>,
    handle: JoinHandle<()>,
}

impl TrickleServer {
    /// Start on an ephemeral localhost port
    pub async fn start<I, S>(chunks: I, delay: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Vec<u8>>,
    {
        let chunks: Arc<Vec<Vec<u8>>> = Arc::new(chunks.into_iter().map(Into::into).collect());
        let listener = TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().unwrap();
        let counters = Arc::new(Counters::default());

        let shared = Arc::clone(&counters);
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let chunks = Arc::clone(&chunks);
                let counters = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = serve(socket, chunks, delay, counters).await;
                });
            }
        });

        Self {
            base_url: format!("http://{addr}/"),
            counters,
            handle,
        }
    }

    pub fn requests(&self) -> usize {
        self.counters.requests.load(Ordering::SeqCst)
    }

    /// Responses written to the end
    pub fn completed(&self) -> usize {
        self.counters.completed.load(Ordering::SeqCst)
    }

    /// True once some client closed its connection before the body ended
    pub async fn saw_disconnect(&self, within: Duration) -> bool {
        tokio::time::timeout(within, async {
            while self.counters.disconnects.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }
}

impl Drop for TrickleServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(
    socket: TcpStream,
    chunks: Arc<Vec<Vec<u8>>>,
    delay: Duration,
    counters: Arc<Counters>,
) -> std::io::Result<()> {
    let (mut rd, mut wr) = socket.into_split();

    // Headers plus the (small, content-length) JSON body of the request
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        let n = rd.read(&mut tmp).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + len {
                break;
            }
        }
    }
    counters.requests.fetch_add(1, Ordering::SeqCst);

    // A read completing (or a write failing) mid-body means the client went away
    tokio::select! {
        r = write_body(&mut wr, &chunks, delay) => match r {
            Ok(()) => {
                counters.completed.fetch_add(1, Ordering::SeqCst);
            }
            Err(_) => {
                counters.disconnects.fetch_add(1, Ordering::SeqCst);
            }
        },
        _ = rd.read(&mut tmp) => {
            counters.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }
    Ok(())
}

async fn write_body(wr: &mut OwnedWriteHalf, chunks: &[Vec<u8>], delay: Duration) -> std::io::Result<()> {
    wr.write_all(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
    )
    .await?;
    wr.flush().await?;
    for chunk in chunks.iter().filter(|c| !c.is_empty()) {
        tokio::time::sleep(delay).await;
        wr.write_all(format!("{:x}\r\n", chunk.len()).as_bytes()).await?;
        wr.write_all(chunk).await?;
        wr.write_all(b"\r\n").await?;
        wr.flush().await?;
    }
    wr.write_all(b"0\r\n\r\n").await?;
    wr.flush().await?;
    wr.shutdown().await
}
