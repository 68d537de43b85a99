//! Task: locate the switch disk image and stage the license file.

use super::{LaunchCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use crate::runtime::layout::{discover_disk_image, stage_license};
use async_trait::async_trait;
use nosboot_shared::{NosbootError, NosbootResult};

pub struct PrepareDiskTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for PrepareDiskTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> NosbootResult<()> {
        let task_name = self.name();
        let hostname = task_start(&ctx, task_name).await;

        let (explicit, image_dir, tftp_dir) = {
            let ctx = ctx.lock().await;
            (
                ctx.options.disk_image.clone(),
                ctx.options.image_dir.clone(),
                ctx.options.tftp_dir.clone(),
            )
        };

        let disk_image = match explicit {
            Some(path) if path.is_file() => Ok(path),
            Some(path) => Err(NosbootError::Config(format!(
                "disk image {} does not exist",
                path.display()
            ))),
            None => discover_disk_image(&image_dir),
        }
        .inspect_err(|e| log_task_error(&hostname, task_name, e))?;

        let license_present = stage_license(&image_dir, &tftp_dir)
            .inspect_err(|e| log_task_error(&hostname, task_name, e))?;

        tracing::info!(
            disk = %disk_image.display(),
            license = license_present,
            "Disk image ready"
        );

        let mut ctx = ctx.lock().await;
        ctx.disk_image = Some(disk_image);
        ctx.license_present = license_present;
        Ok(())
    }

    fn name(&self) -> &str {
        "prepare_disk"
    }
}
