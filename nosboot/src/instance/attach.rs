use crate::bootstrap::ControlChannel;
use crate::console::ConsoleSession;
use crate::vmm::{InstanceSpec, MonitorChannel};
use async_trait::async_trait;
use nosboot_shared::NosbootResult;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Opens the console and control channel of a freshly started VM.
#[async_trait]
pub trait DeviceAttach: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;
    type Control: ControlChannel;

    async fn attach(
        &self,
        spec: &InstanceSpec,
    ) -> NosbootResult<(ConsoleSession<Self::Stream>, Self::Control)>;
}

/// Attach over the QEMU serial and monitor TCP sockets.
#[derive(Debug, Clone)]
pub struct TcpAttach {
    timeout: Duration,
}

impl TcpAttach {
    /// `timeout` bounds the connect retries for each socket.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DeviceAttach for TcpAttach {
    type Stream = TcpStream;
    type Control = MonitorChannel<TcpStream>;

    async fn attach(
        &self,
        spec: &InstanceSpec,
    ) -> NosbootResult<(ConsoleSession<TcpStream>, MonitorChannel<TcpStream>)> {
        let console = ConsoleSession::connect(spec.serial_addr(), self.timeout).await?;
        let monitor = MonitorChannel::connect(&spec.monitor_addr(), self.timeout).await?;
        tracing::debug!(
            serial = %spec.serial_addr(),
            monitor = %spec.monitor_addr(),
            "Attached to VM"
        );
        Ok((console, monitor))
    }
}
