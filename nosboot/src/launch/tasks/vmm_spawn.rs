//! Task: start the VM with the prepared disk and boot media.

use super::{LaunchCtx, log_task_error, task_start};
use crate::instance::{InstanceController, TcpAttach};
use crate::pipeline::PipelineTask;
use crate::vmm::InstanceSpec;
use async_trait::async_trait;
use nosboot_shared::{NosbootError, NosbootResult};

pub struct VmmSpawnTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for VmmSpawnTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> NosbootResult<()> {
        let task_name = self.name();
        let hostname = task_start(&ctx, task_name).await;

        let (vmm, spec, attach_timeout) = {
            let mut ctx = ctx.lock().await;
            let disk_image = ctx
                .disk_image
                .clone()
                .ok_or_else(|| NosbootError::Internal("prepare_disk task must run first".into()))?;
            let boot_media = match (&ctx.boot_media, ctx.options.mode.is_install()) {
                (Some(media), _) => Some(media.path.clone()),
                (None, true) => None,
                (None, false) => {
                    return Err(NosbootError::Internal(
                        "boot_media task must run first".into(),
                    ));
                }
            };
            let vmm = ctx
                .vmm
                .take()
                .ok_or_else(|| NosbootError::InvalidState("VM controller already used".into()))?;
            (
                vmm,
                InstanceSpec::from_options(&ctx.options, disk_image, boot_media),
                ctx.options.attach_timeout,
            )
        };

        let mut instance = InstanceController::new(vmm, TcpAttach::new(attach_timeout), spec);
        let pid = instance
            .start()
            .await
            .inspect_err(|e| log_task_error(&hostname, task_name, e))?;
        tracing::debug!(pid, "VM spawned");

        ctx.lock().await.instance = Some(instance);
        Ok(())
    }

    fn name(&self) -> &str {
        "vmm_spawn"
    }
}
