//! Hypervisor collaborator: QEMU process, monitor side channel, NIC wiring.
//!
//! The bootstrap core only sees the `VmmController` / `VmmHandler` traits and
//! the `MonitorChannel`; everything QEMU-specific stays in this module.

pub mod controller;
mod monitor;
mod net;

pub use monitor::MonitorChannel;
pub use net::{ConnectionMode, data_nic_args, mac_address, mgmt_nic_args};

use crate::runtime::LaunchOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// NIC model presented to the switch.
pub const NIC_MODEL: &str = "e1000";

/// Everything needed to start one VM instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub qemu_binary: PathBuf,
    pub cpus: u8,
    pub memory_mib: u32,
    pub disk_image: PathBuf,
    /// Boot media attached as CD-ROM; absent in install mode.
    pub boot_media: Option<PathBuf>,
    pub nics: usize,
    pub nic_model: String,
    pub connection_mode: ConnectionMode,
    pub serial_port: u16,
    pub monitor_port: u16,
    pub tftp_dir: PathBuf,
}

impl InstanceSpec {
    pub fn from_options(
        options: &LaunchOptions,
        disk_image: PathBuf,
        boot_media: Option<PathBuf>,
    ) -> Self {
        Self {
            qemu_binary: options.qemu_binary.clone(),
            cpus: options.cpus,
            memory_mib: options.memory_mib,
            disk_image,
            boot_media,
            nics: options.nics,
            nic_model: NIC_MODEL.to_string(),
            connection_mode: options.connection_mode,
            serial_port: options.serial_port,
            monitor_port: options.monitor_port,
            tftp_dir: options.tftp_dir.clone(),
        }
    }

    /// Address of the serial console socket.
    pub fn serial_addr(&self) -> String {
        format!("127.0.0.1:{}", self.serial_port)
    }

    /// Address of the monitor socket.
    pub fn monitor_addr(&self) -> String {
        format!("127.0.0.1:{}", self.monitor_port)
    }
}
