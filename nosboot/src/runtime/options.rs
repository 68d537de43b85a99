//! Launch options.
//!
//! Built once by the launcher from command-line flags and passed by reference
//! to every component. Never mutated after `sanitize()`.

use crate::runtime::constants::{paths, ports, timing};
use crate::vmm::ConnectionMode;
use nosboot_shared::{NosbootError, NosbootResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Highest number of data-plane NICs the launcher will wire up.
pub const MAX_NICS: usize = 64;

/// Boot sequencing variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Build boot media, configure the device and keep it running.
    #[default]
    Run,
    /// Boot the bare image without boot media, wait for the login banner, stop.
    Install,
}

impl LaunchMode {
    pub fn is_install(&self) -> bool {
        matches!(self, LaunchMode::Install)
    }
}

/// Device credentials and identity applied by the base configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceOptions {
    pub hostname: String,
    pub username: String,
    pub password: String,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            hostname: "CAT9KV".to_string(),
            username: "vrnetlab".to_string(),
            password: "VR-netlab9".to_string(),
        }
    }
}

/// Everything a launch needs, resolved up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub mode: LaunchMode,
    pub device: DeviceOptions,

    // === Virtual hardware ===
    /// Number of data-plane NICs (management NIC not included).
    pub nics: usize,
    pub connection_mode: ConnectionMode,
    pub cpus: u8,
    pub memory_mib: u32,
    pub qemu_binary: PathBuf,

    // === Filesystem ===
    /// Explicit disk image; discovered in `image_dir` when absent.
    pub disk_image: Option<PathBuf>,
    pub image_dir: PathBuf,
    pub tftp_dir: PathBuf,
    pub startup_config: PathBuf,
    pub staging_dir: PathBuf,
    pub boot_media: PathBuf,
    pub iso_tool: PathBuf,

    // === Host ports ===
    pub serial_port: u16,
    pub monitor_port: u16,

    // === Bootstrap timing ===
    pub spin_budget: u32,
    pub poll_timeout: Duration,
    pub prompt_timeout: Duration,
    pub attach_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            mode: LaunchMode::Run,
            device: DeviceOptions::default(),
            nics: 9,
            connection_mode: ConnectionMode::Vrxcon,
            cpus: 4,
            memory_mib: 18432,
            qemu_binary: PathBuf::from("qemu-system-x86_64"),
            disk_image: None,
            image_dir: PathBuf::from(paths::IMAGE_DIR),
            tftp_dir: PathBuf::from(paths::TFTP_DIR),
            startup_config: PathBuf::from(paths::STARTUP_CONFIG),
            staging_dir: PathBuf::from(paths::STAGING_DIR),
            boot_media: PathBuf::from(paths::BOOT_MEDIA),
            iso_tool: PathBuf::from("genisoimage"),
            serial_port: ports::SERIAL,
            monitor_port: ports::MONITOR,
            spin_budget: timing::SPIN_BUDGET,
            poll_timeout: timing::POLL_TIMEOUT,
            prompt_timeout: timing::PROMPT_TIMEOUT,
            attach_timeout: timing::ATTACH_TIMEOUT,
        }
    }
}

impl LaunchOptions {
    /// Validate options before any side effect happens.
    pub fn sanitize(&self) -> NosbootResult<()> {
        let device = &self.device;
        if device.hostname.is_empty() || device.hostname.chars().any(char::is_whitespace) {
            return Err(NosbootError::Config(format!(
                "hostname must be a single non-empty word, got {:?}",
                device.hostname
            )));
        }
        if device.username.is_empty() || device.username.chars().any(char::is_whitespace) {
            return Err(NosbootError::Config(format!(
                "username must be a single non-empty word, got {:?}",
                device.username
            )));
        }
        if device.password.is_empty() {
            return Err(NosbootError::Config("password must not be empty".into()));
        }
        if self.nics > MAX_NICS {
            return Err(NosbootError::Config(format!(
                "at most {} NICs are supported, got {}",
                MAX_NICS, self.nics
            )));
        }
        if self.cpus == 0 || self.memory_mib == 0 {
            return Err(NosbootError::Config(
                "cpus and memory_mib must be non-zero".into(),
            ));
        }
        if self.serial_port == 0 || self.monitor_port == 0 {
            return Err(NosbootError::Config("host ports must be non-zero".into()));
        }
        if self.serial_port == self.monitor_port {
            return Err(NosbootError::Config(format!(
                "serial and monitor ports must differ, both are {}",
                self.serial_port
            )));
        }
        if self.spin_budget == 0 {
            return Err(NosbootError::Config("spin_budget must be non-zero".into()));
        }
        if self.poll_timeout.is_zero() {
            return Err(NosbootError::Config("poll_timeout must be non-zero".into()));
        }
        Ok(())
    }
}
