//! nosboot-launch: boot and provision one virtual switch.

use anyhow::Context;
use clap::Parser;
use nosboot::Launcher;
use nosboot::logging::init_logging;
use nosboot::runtime::constants::{paths, timing};
use nosboot::runtime::{DeviceOptions, LaunchMode, LaunchOptions};
use nosboot::vmm::ConnectionMode;
use std::path::PathBuf;
use tokio::signal::unix::{SignalKind, signal};

#[derive(Debug, Parser)]
#[command(name = "nosboot-launch", version, about = "Boot and provision a virtual Catalyst 9000 switch")]
struct Cli {
    /// Log at trace level, including raw console output
    #[arg(long)]
    trace: bool,

    /// Username created on the device
    #[arg(long, default_value = "vrnetlab")]
    username: String,

    /// Password of the created user
    #[arg(long, default_value = "VR-netlab9")]
    password: String,

    /// Boot the bare image until login, then stop
    #[arg(long)]
    install: bool,

    /// Device hostname
    #[arg(long, default_value = "CAT9KV")]
    hostname: String,

    /// Number of data-plane NICs
    #[arg(long, default_value_t = 9)]
    nics: usize,

    /// Data-plane NIC backend: vrxcon or tc
    #[arg(long, default_value = "vrxcon")]
    connection_mode: ConnectionMode,

    /// Disk image to boot; the first *.qcow2 in --image-dir when absent
    #[arg(long)]
    disk_image: Option<PathBuf>,

    #[arg(long, default_value = paths::IMAGE_DIR)]
    image_dir: PathBuf,

    /// Startup configuration applied after the base configuration
    #[arg(long, default_value = paths::STARTUP_CONFIG)]
    startup_config: PathBuf,

    #[arg(long, default_value = paths::STAGING_DIR)]
    staging_dir: PathBuf,

    #[arg(long, default_value = "qemu-system-x86_64")]
    qemu_binary: PathBuf,

    /// genisoimage-compatible tool used to build the boot media
    #[arg(long, default_value = "genisoimage")]
    iso_tool: PathBuf,

    /// Silent console polls tolerated before the VM is restarted
    #[arg(long, default_value_t = timing::SPIN_BUDGET)]
    spin_budget: u32,

    /// Also write daily rolling log files here
    #[arg(long, env = "NOSBOOT_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn into_options(self) -> LaunchOptions {
        LaunchOptions {
            mode: if self.install {
                LaunchMode::Install
            } else {
                LaunchMode::Run
            },
            device: DeviceOptions {
                hostname: self.hostname,
                username: self.username,
                password: self.password,
            },
            nics: self.nics,
            connection_mode: self.connection_mode,
            qemu_binary: self.qemu_binary,
            disk_image: self.disk_image,
            image_dir: self.image_dir,
            startup_config: self.startup_config,
            staging_dir: self.staging_dir,
            iso_tool: self.iso_tool,
            spin_budget: self.spin_budget,
            ..LaunchOptions::default()
        }
    }
}

/// Resolve on SIGTERM or SIGINT, naming the signal.
async fn shutdown_signal() -> std::io::Result<&'static str> {
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = terminate.recv() => Ok("SIGTERM"),
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.trace, cli.log_dir.as_deref())?;

    let launcher = Launcher::new(cli.into_options()).context("invalid launch options")?;
    let install = launcher.options().mode.is_install();

    // Dropping the launch future kills the QEMU child.
    let outcome = tokio::select! {
        outcome = launcher.run() => outcome.context("launch failed")?,
        signal = shutdown_signal() => {
            tracing::info!(signal = signal?, "Shutting down during launch");
            return Ok(());
        }
    };

    tracing::info!(
        hostname = %outcome.report.hostname,
        serial = ?outcome.report.serial,
        restarts = outcome.report.restarts,
        duration_ms = outcome.report.total_duration_ms as u64,
        "Device ready"
    );
    if install {
        return Ok(());
    }

    let mut instance = outcome.instance;
    tokio::select! {
        result = instance.wait() => {
            result?;
            anyhow::bail!("VM exited unexpectedly");
        }
        signal = shutdown_signal() => {
            tracing::info!(signal = signal?, "Shutting down");
            instance.stop().await?;
        }
    }

    Ok(())
}
