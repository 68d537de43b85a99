//! nosboot: first-boot provisioning of a virtual Catalyst 9000 switch under QEMU.
//!
//! A launch builds boot media carrying a fresh device identity, starts the VM,
//! and drives the serial console through login, base configuration and the
//! user's startup configuration until the device is reachable.

pub mod bootstrap;
pub mod console;
pub mod identity;
pub mod instance;
pub mod launch;
pub mod logging;
pub mod media;
pub mod pipeline;
pub mod runtime;
pub mod util;
pub mod vmm;

pub use bootstrap::{BootReport, BootstrapState, Bootstrapper, StepOutcome};
pub use identity::{Identity, generate_identity};
pub use launch::{LaunchOutcome, Launcher};
pub use nosboot_shared::{NosbootError, NosbootResult};
pub use runtime::{LaunchMode, LaunchOptions};
