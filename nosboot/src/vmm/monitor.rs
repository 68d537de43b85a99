//! QEMU human monitor over TCP: the side channel used to eject boot media.

use crate::bootstrap::ControlChannel;
use crate::console::{ConsoleSession, Pattern};
use crate::runtime::constants::{console::MEDIA_DEVICE, timing};
use nosboot_shared::{NosbootError, NosbootResult};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

const MONITOR_PROMPT: &str = "(qemu)";

/// Reply fragments QEMU prints when a command fails, lowercase.
const FAILURE_MARKERS: &[&str] = &[
    "error",
    "could not",
    "not found",
    "unknown command",
    "is locked",
];

fn reports_failure(reply: &str) -> bool {
    let reply = reply.to_ascii_lowercase();
    FAILURE_MARKERS.iter().any(|marker| reply.contains(marker))
}

/// Monitor connection reusing the console expect machinery.
pub struct MonitorChannel<S> {
    session: ConsoleSession<S>,
    reply_timeout: Duration,
}

impl MonitorChannel<TcpStream> {
    /// Connect to the monitor socket and consume the greeting.
    pub async fn connect(addr: &str, timeout: Duration) -> NosbootResult<Self> {
        let stream = crate::util::connect_with_retry(addr, timeout)
            .await
            .map_err(|e| NosbootError::Monitor(format!("Failed to connect to {}: {}", addr, e)))?;
        tracing::debug!(addr = %addr, "Monitor connected");
        Self::attach(stream, timing::MONITOR_REPLY_TIMEOUT).await
    }
}

impl<S> MonitorChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Wrap an open stream; waits for the first prompt.
    pub async fn attach(stream: S, reply_timeout: Duration) -> NosbootResult<Self> {
        let mut channel = Self {
            session: ConsoleSession::new(stream),
            reply_timeout,
        };
        channel.read_reply("greeting").await?;
        Ok(channel)
    }

    /// Run one monitor command and return its reply text.
    ///
    /// Fails when no prompt comes back in time or the reply reports an error.
    pub async fn command(&mut self, command: &str) -> NosbootResult<String> {
        tracing::debug!(command = %command, "Monitor command");
        self.session.send(command).await.map_err(into_monitor_error)?;

        let reply = self.read_reply(command).await?;
        if reports_failure(&reply) {
            return Err(NosbootError::Monitor(format!(
                "{:?} failed: {}",
                command,
                reply.trim()
            )));
        }
        Ok(reply)
    }

    async fn read_reply(&mut self, what: &str) -> NosbootResult<String> {
        let outcome = self
            .session
            .expect(&[Pattern::literal(MONITOR_PROMPT)], self.reply_timeout)
            .await
            .map_err(into_monitor_error)?;
        if !outcome.is_match() {
            return Err(NosbootError::Monitor(format!(
                "no monitor prompt after {:?} within {:?}",
                what, self.reply_timeout
            )));
        }

        let text = String::from_utf8_lossy(&outcome.raw);
        Ok(text
            .strip_suffix(MONITOR_PROMPT)
            .unwrap_or(&text)
            .to_string())
    }
}

fn into_monitor_error(err: NosbootError) -> NosbootError {
    match err {
        NosbootError::Console(msg) => NosbootError::Monitor(msg),
        other => other,
    }
}

#[async_trait::async_trait]
impl<S> ControlChannel for MonitorChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn eject_media(&mut self) -> NosbootResult<()> {
        self.command(&format!("eject -f {}", MEDIA_DEVICE)).await?;
        tracing::info!(device = MEDIA_DEVICE, "Boot media ejected");
        Ok(())
    }

    async fn close(&mut self) -> NosbootResult<()> {
        self.session.close().await.map_err(into_monitor_error)
    }
}
