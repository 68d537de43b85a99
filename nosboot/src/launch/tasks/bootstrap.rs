//! Task: drive the console until the device is ready, then write the report.

use super::{LaunchCtx, log_task_error, task_start};
use crate::bootstrap::{BootReport, Bootstrapper};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use nosboot_shared::{NosbootError, NosbootResult};

pub struct BootstrapTask;

#[async_trait]
impl PipelineTask<LaunchCtx> for BootstrapTask {
    async fn run(self: Box<Self>, ctx: LaunchCtx) -> NosbootResult<()> {
        let task_name = self.name();
        let hostname = task_start(&ctx, task_name).await;

        let (mut instance, mut bootstrapper, serial, license_present, report_path) = {
            let mut ctx = ctx.lock().await;
            let instance = ctx
                .instance
                .take()
                .ok_or_else(|| NosbootError::Internal("vmm_spawn task must run first".into()))?;
            (
                instance,
                Bootstrapper::new(&ctx.options),
                ctx.identity.as_ref().map(|identity| identity.serial.clone()),
                ctx.license_present,
                ctx.layout.boot_report_path(),
            )
        };

        let duration = instance
            .run_bootstrap(&mut bootstrapper)
            .await
            .inspect_err(|e| log_task_error(&hostname, task_name, e))?;

        let report = BootReport::new(
            &hostname,
            serial,
            license_present,
            bootstrapper.metrics(),
            duration,
        );
        if let Some(parent) = report_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        report
            .write_to(&report_path)
            .await
            .inspect_err(|e| log_task_error(&hostname, task_name, e))?;

        let mut ctx = ctx.lock().await;
        ctx.instance = Some(instance);
        ctx.report = Some(report);
        Ok(())
    }

    fn name(&self) -> &str {
        "bootstrap"
    }
}
