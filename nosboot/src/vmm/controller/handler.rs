//! VmmHandler - Runtime operations on a running VM.

use nosboot_shared::NosbootResult;

/// Runtime operations on a running VM.
///
/// Separates runtime operations (stop, wait) from spawning (VmmController).
#[async_trait::async_trait]
pub trait VmmHandler: Send {
    /// Stop the VM and reap the process.
    async fn stop(&mut self) -> NosbootResult<()>;

    /// Resolve when the VM process exits on its own.
    async fn wait(&mut self) -> NosbootResult<()>;

    /// Check if the VM is still running.
    fn is_running(&mut self) -> bool;

    /// Process ID of the running VM.
    fn pid(&self) -> u32;
}
