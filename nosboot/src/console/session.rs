//! Expect/send session over a byte stream.

use super::pattern::Pattern;
use super::telnet::TelnetFilter;
use crate::runtime::constants::console::LINE_TERMINATOR;
use nosboot_shared::{NosbootError, NosbootResult};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::Instant;

/// Unmatched output kept between `expect` calls.
pub const MAX_BUFFERED_BYTES: usize = 64 * 1024;

const READ_CHUNK: usize = 4096;

/// Result of one `expect` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectOutcome {
    /// Index into the pattern list of the pattern that matched.
    pub matched: Option<usize>,
    /// On a match: the bytes consumed up to the end of the match.
    /// On timeout: the bytes that arrived during this call.
    pub raw: Vec<u8>,
}

impl ExpectOutcome {
    pub fn is_match(&self) -> bool {
        self.matched.is_some()
    }

    pub fn saw_output(&self) -> bool {
        !self.raw.is_empty()
    }
}

/// Bidirectional text session with a device console.
///
/// Owns the only accumulated output buffer in the bootstrap path. Generic
/// over the stream so tests can drive it through `tokio::io::duplex`.
pub struct ConsoleSession<S> {
    stream: S,
    buffer: Vec<u8>,
    telnet: TelnetFilter,
    closed: bool,
}

impl ConsoleSession<TcpStream> {
    /// Connect to a TCP serial console, retrying until `timeout` elapses.
    ///
    /// QEMU opens its listening socket a moment after the process starts.
    pub async fn connect<A>(addr: A, timeout: Duration) -> NosbootResult<Self>
    where
        A: ToSocketAddrs + std::fmt::Display + Clone,
    {
        let stream = crate::util::connect_with_retry(addr.clone(), timeout)
            .await
            .map_err(|e| NosbootError::Console(format!("Failed to connect to {}: {}", addr, e)))?;
        tracing::debug!(addr = %addr, "Console connected");
        Ok(Self::new(stream))
    }
}

impl<S> ConsoleSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::new(),
            telnet: TelnetFilter::new(),
            closed: false,
        }
    }

    /// Write `line` followed by the line terminator. Does not wait for a reply.
    pub async fn send(&mut self, line: &str) -> NosbootResult<()> {
        self.send_bytes(line.as_bytes()).await
    }

    /// Like [`send`](Self::send), for lines that are not necessarily UTF-8.
    pub async fn send_bytes(&mut self, line: &[u8]) -> NosbootResult<()> {
        if self.closed {
            return Err(NosbootError::InvalidState(
                "console session already closed".into(),
            ));
        }

        tracing::trace!(line = %line.escape_ascii(), "Console write");
        let mut payload = Vec::with_capacity(line.len() + LINE_TERMINATOR.len());
        payload.extend_from_slice(line);
        payload.extend_from_slice(LINE_TERMINATOR.as_bytes());

        self.stream
            .write_all(&payload)
            .await
            .map_err(|e| NosbootError::Console(format!("write failed: {}", e)))?;
        self.stream
            .flush()
            .await
            .map_err(|e| NosbootError::Console(format!("flush failed: {}", e)))?;
        Ok(())
    }

    /// Wait up to `timeout` for any of `patterns`.
    ///
    /// Patterns are tried in order; the first one found in the buffer wins.
    /// Running out of time is a normal outcome, not an error. The peer closing
    /// the stream is an error.
    pub async fn expect(
        &mut self,
        patterns: &[Pattern],
        timeout: Duration,
    ) -> NosbootResult<ExpectOutcome> {
        let deadline = Instant::now() + timeout;
        let mut seen = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some((index, end)) = self.search(patterns) {
                let raw: Vec<u8> = self.buffer.drain(..end).collect();
                tracing::trace!(pattern = %patterns[index], "Console match");
                return Ok(ExpectOutcome {
                    matched: Some(index),
                    raw,
                });
            }

            let read = match tokio::time::timeout_at(deadline, self.stream.read(&mut chunk)).await {
                Ok(read) => read,
                Err(_) => {
                    return Ok(ExpectOutcome {
                        matched: None,
                        raw: seen,
                    });
                }
            };

            let n = read.map_err(|e| NosbootError::Console(format!("read failed: {}", e)))?;
            if n == 0 {
                return Err(NosbootError::Console("console closed by peer".into()));
            }

            let mut data = Vec::with_capacity(n);
            let mut replies = Vec::new();
            self.telnet.feed(&chunk[..n], &mut data, &mut replies);

            if !replies.is_empty() {
                self.stream
                    .write_all(&replies)
                    .await
                    .map_err(|e| NosbootError::Console(format!("negotiation failed: {}", e)))?;
            }

            seen.extend_from_slice(&data);
            self.buffer.extend_from_slice(&data);
            if self.buffer.len() > MAX_BUFFERED_BYTES {
                let excess = self.buffer.len() - MAX_BUFFERED_BYTES;
                self.buffer.drain(..excess);
            }
        }
    }

    /// Shut down the write side. Further `send` calls fail.
    pub async fn close(&mut self) -> NosbootResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .shutdown()
            .await
            .map_err(|e| NosbootError::Console(format!("shutdown failed: {}", e)))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Output received but not consumed by a match yet.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    fn search(&self, patterns: &[Pattern]) -> Option<(usize, usize)> {
        patterns
            .iter()
            .enumerate()
            .find_map(|(index, pattern)| pattern.find(&self.buffer).map(|r| (index, r.end)))
    }
}
