//! VM process management.
//!
//! ## Architecture
//!
//! - **VmmController**: spawning operations (creates a VmmHandler)
//! - **VmmHandler**: runtime operations on the running VM (stop, wait, pid)
//!
//! The Instance Controller owns exactly one handler at a time and replaces it
//! on every power cycle.

mod handler;
mod qemu;
mod spawn;

pub use handler::VmmHandler;
pub use qemu::{QemuController, QemuHandler};
pub use spawn::build_qemu_args;

use crate::vmm::InstanceSpec;
use nosboot_shared::NosbootResult;

/// Trait for spawning VMs.
#[async_trait::async_trait]
pub trait VmmController: Send {
    /// Spawn a new VM and return a handler for runtime operations.
    async fn start(&mut self, spec: &InstanceSpec) -> NosbootResult<Box<dyn VmmHandler>>;
}
