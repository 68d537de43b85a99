//! Runtime constants.
//!
//! Centralized location for ports, paths and console patterns.

/// Well-known filesystem locations inside the launcher container.
pub mod paths {
    /// Startup configuration supplied by the user (optional).
    pub const STARTUP_CONFIG: &str = "/config/startup-config.cfg";

    /// Directory scanned for the switch disk image and license files.
    pub const IMAGE_DIR: &str = "/";

    /// TFTP root exposed to the management NIC.
    pub const TFTP_DIR: &str = "/tftpboot";

    /// Staging directory packaged into the boot media.
    pub const STAGING_DIR: &str = "/vswitch";

    /// Boot media image handed to QEMU as CD-ROM.
    pub const BOOT_MEDIA: &str = "/config.iso";
}

/// File names inside the staging directory and image directory.
pub mod filenames {
    /// Subdirectory holding the first-boot artifacts.
    pub const CONF_DIR: &str = "conf";

    /// First-boot command script picked up by IOS-XE.
    pub const FIRST_BOOT_SCRIPT: &str = "iosxe_config.txt";

    /// Identity and port topology document.
    pub const IDENTITY_DOCUMENT: &str = "vswitch.xml";

    /// License file name expected by the device under the TFTP root.
    pub const LICENSE: &str = "license.lic";

    /// Extension of the switch disk image.
    pub const DISK_EXTENSION: &str = "qcow2";

    /// Extension of license files dropped next to the disk image.
    pub const LICENSE_EXTENSION: &str = "license";

    /// Boot report written once the device is ready.
    pub const BOOT_REPORT: &str = "boot-report.json";
}

/// Host-side TCP ports exposed by QEMU.
pub mod ports {
    /// Serial console (telnet framing).
    pub const SERIAL: u16 = 5000;

    /// Human monitor protocol.
    pub const MONITOR: u16 = 4000;

    /// First listen port for `vrxcon` data NICs; NIC `i` listens on `BASE + i`.
    pub const DATAPLANE_BASE: u16 = 10000;
}

/// Device console dialogue.
pub mod console {
    /// Banner printed once IOS-XE is ready to accept a login.
    pub const LOGIN_BANNER: &str = "Press RETURN to get started!";

    /// User EXEC prompt suffix.
    pub const USER_PROMPT: &str = ">";

    /// Privileged EXEC and configuration prompt suffix.
    pub const PRIVILEGED_PROMPT: &str = "#";

    /// Destination filename confirmation on `delete`.
    pub const FILENAME_CONFIRM: &str = "]?";

    /// Generic `[confirm]` prompt.
    pub const CONFIRM: &str = "[confirm]";

    /// Line terminator used when writing to the console.
    pub const LINE_TERMINATOR: &str = "\r";

    /// QEMU device name of the CD-ROM drive holding the boot media.
    pub const MEDIA_DEVICE: &str = "ide1-cd0";
}

/// Management network between the host and the device.
pub mod mgmt {
    /// Address configured on GigabitEthernet0/0.
    pub const DEVICE_ADDRESS: &str = "10.0.0.15";

    /// Netmask of the management network.
    pub const NETMASK: &str = "255.255.255.0";

    /// User-mode network gateway.
    pub const GATEWAY: &str = "10.0.0.2";

    /// User-mode network DNS.
    pub const NAME_SERVER: &str = "10.0.0.3";

    /// User-mode network CIDR.
    pub const NETWORK: &str = "10.0.0.0/24";
}

/// Bootstrap timing defaults.
pub mod timing {
    use std::time::Duration;

    /// Login banner poll window; also the polling cadence.
    pub const POLL_TIMEOUT: Duration = Duration::from_secs(1);

    /// Upper bound for waiting on a prompt before writing a line anyway.
    pub const PROMPT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Silent polls tolerated before the instance is power-cycled.
    pub const SPIN_BUDGET: u32 = 1500;

    /// How long to keep retrying the console/monitor TCP connect after VM start.
    pub const ATTACH_TIMEOUT: Duration = Duration::from_secs(60);

    /// Grace period between SIGTERM and SIGKILL when stopping the VM.
    pub const STOP_GRACE: Duration = Duration::from_secs(10);

    /// Wait for the monitor prompt after a command.
    pub const MONITOR_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
}
