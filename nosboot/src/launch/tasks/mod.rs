//! Launch tasks.

mod boot_media;
mod bootstrap;
mod prepare_disk;
mod vmm_spawn;

pub use boot_media::BootMediaTask;
pub use bootstrap::BootstrapTask;
pub use prepare_disk::PrepareDiskTask;
pub use vmm_spawn::VmmSpawnTask;

use super::types::LaunchCtx;
use nosboot_shared::NosbootError;

/// Log the task start and return the hostname for later log lines.
async fn task_start(ctx: &LaunchCtx, task_name: &str) -> String {
    let hostname = ctx.lock().await.options.device.hostname.clone();
    tracing::debug!(hostname = %hostname, task = task_name, "Task starting");
    hostname
}

fn log_task_error(hostname: &str, task_name: &str, err: &NosbootError) {
    tracing::error!(hostname = %hostname, task = task_name, error = %err, "Task failed");
}
