//! QEMU command line and subprocess spawning.

use crate::vmm::{InstanceSpec, data_nic_args, mgmt_nic_args};
use nosboot_shared::{NosbootError, NosbootResult};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};

/// Build the QEMU argument vector for `spec`.
///
/// # Arguments
/// * `spec` - Instance to start
/// * `kvm` - Whether hardware acceleration is available
pub fn build_qemu_args(spec: &InstanceSpec, kvm: bool) -> Vec<String> {
    let mut args = Vec::new();

    if kvm {
        args.push("-enable-kvm".to_string());
    }
    args.extend([
        "-display".to_string(),
        "none".to_string(),
        "-machine".to_string(),
        "pc".to_string(),
        "-m".to_string(),
        spec.memory_mib.to_string(),
        "-smp".to_string(),
        spec.cpus.to_string(),
        "-serial".to_string(),
        format!("telnet:0.0.0.0:{},server,nowait", spec.serial_port),
        "-monitor".to_string(),
        format!("tcp:0.0.0.0:{},server,nowait", spec.monitor_port),
        "-drive".to_string(),
        format!("if=ide,file={}", spec.disk_image.display()),
    ]);

    if let Some(media) = &spec.boot_media {
        args.push("-cdrom".to_string());
        args.push(media.display().to_string());
    }

    args.extend(mgmt_nic_args(&spec.nic_model, &spec.tftp_dir));
    for index in 1..=spec.nics {
        args.extend(data_nic_args(spec.connection_mode, &spec.nic_model, index));
    }

    args
}

/// Spawn QEMU with piped output forwarded to the log.
///
/// The child is killed if its handle is dropped, so a launcher exiting on a
/// signal never leaves a VM behind.
pub(crate) fn spawn_qemu(spec: &InstanceSpec) -> NosbootResult<Child> {
    let kvm = std::path::Path::new("/dev/kvm").exists();
    let args = build_qemu_args(spec, kvm);

    tracing::debug!(
        binary = %spec.qemu_binary.display(),
        args = %args.join(" "),
        "Starting QEMU"
    );

    let mut cmd = Command::new(&spec.qemu_binary);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        let err_msg = format!(
            "Failed to spawn VM subprocess at {}: {}",
            spec.qemu_binary.display(),
            e
        );
        tracing::error!("{}", err_msg);
        NosbootError::Engine(err_msg)
    })?;

    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_output(stdout, "stdout"));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_output(stderr, "stderr"));
    }

    Ok(child)
}

async fn forward_output<R>(reader: R, stream: &'static str)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "qemu", stream, "{}", line);
    }
}
