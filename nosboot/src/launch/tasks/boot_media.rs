//! Task: draw a fresh identity and build the boot media around it.

use super::{LaunchCtx, log_task_error, task_start};
use crate::identity::generate_identity;
use crate::media::BootMediaBuilder;
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use nosboot_shared::NosbootResult;

pub struct BootMediaTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for BootMediaTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> NosbootResult<()> {
        let task_name = self.name();
        let hostname = task_start(&ctx, task_name).await;

        let (builder, out_path) = {
            let ctx = ctx.lock().await;
            (
                BootMediaBuilder::new(ctx.options.iso_tool.clone(), ctx.layout.clone()),
                ctx.options.boot_media.clone(),
            )
        };

        let identity = generate_identity();
        let media = builder
            .build(&identity, &out_path)
            .await
            .inspect_err(|e| log_task_error(&hostname, task_name, e))?;

        let mut ctx = ctx.lock().await;
        ctx.identity = Some(identity);
        ctx.boot_media = Some(media);
        Ok(())
    }

    fn name(&self) -> &str {
        "boot_media"
    }
}
