//! QEMU-backed VM controller.

use super::spawn::spawn_qemu;
use super::{VmmController, VmmHandler};
use crate::runtime::constants::timing;
use crate::util::terminate_process;
use crate::vmm::InstanceSpec;
use nosboot_shared::{NosbootError, NosbootResult};
use std::time::Duration;
use tokio::process::Child;

/// Spawns QEMU child processes.
#[derive(Debug, Default)]
pub struct QemuController;

impl QemuController {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl VmmController for QemuController {
    async fn start(&mut self, spec: &InstanceSpec) -> NosbootResult<Box<dyn VmmHandler>> {
        let child = spawn_qemu(spec)?;
        let pid = child.id().ok_or_else(|| {
            NosbootError::Engine("QEMU exited before its PID could be read".into())
        })?;

        tracing::info!(pid, "VM process started");

        Ok(Box::new(QemuHandler {
            child,
            pid,
            stop_grace: timing::STOP_GRACE,
        }))
    }
}

/// Handle on a running QEMU child.
pub struct QemuHandler {
    child: Child,
    pid: u32,
    stop_grace: Duration,
}

impl QemuHandler {
    /// Wrap an already spawned child process.
    pub fn from_child(child: Child, stop_grace: Duration) -> NosbootResult<Self> {
        let pid = child
            .id()
            .ok_or_else(|| NosbootError::Engine("child process already reaped".into()))?;
        Ok(Self {
            child,
            pid,
            stop_grace,
        })
    }
}

#[async_trait::async_trait]
impl VmmHandler for QemuHandler {
    async fn stop(&mut self) -> NosbootResult<()> {
        if !self.is_running() {
            return Ok(());
        }

        terminate_process(self.pid);
        match tokio::time::timeout(self.stop_grace, self.child.wait()).await {
            Ok(status) => {
                let status = status?;
                tracing::info!(pid = self.pid, %status, "VM process stopped");
            }
            Err(_) => {
                tracing::warn!(
                    pid = self.pid,
                    "VM did not exit within {:?}, killing",
                    self.stop_grace
                );
                self.child.kill().await?;
            }
        }
        Ok(())
    }

    async fn wait(&mut self) -> NosbootResult<()> {
        let status = self.child.wait().await?;
        tracing::warn!(pid = self.pid, %status, "VM process exited");
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    fn pid(&self) -> u32 {
        self.pid
    }
}
