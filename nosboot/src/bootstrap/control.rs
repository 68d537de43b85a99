use async_trait::async_trait;
use nosboot_shared::NosbootResult;

/// Out-of-band channel to the hypervisor hosting the device.
///
/// The bootstrap only needs to pull the boot media once the base
/// configuration is in place and to hang up when it is done.
#[async_trait]
pub trait ControlChannel: Send {
    /// Eject the boot media. Fails unless the hypervisor confirms it.
    async fn eject_media(&mut self) -> NosbootResult<()>;

    async fn close(&mut self) -> NosbootResult<()>;
}
