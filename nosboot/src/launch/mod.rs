//! Launch orchestration.
//!
//! ## Plans
//!
//! ```text
//! Run:
//!   1. PrepareDisk ─┬─  (locate disk image, stage license)
//!      BootMedia   ─┘   (fresh identity, build ISO)
//!   2. VmmSpawn         (start QEMU with disk and media)
//!   3. Bootstrap        (console dialogue until ready, write report)
//!
//! Install:
//!   1. PrepareDisk
//!   2. VmmSpawn         (no boot media)
//!   3. Bootstrap        (wait for the login banner only)
//!   then the VM is stopped.
//! ```

mod tasks;
mod types;

use crate::bootstrap::BootReport;
use crate::instance::{InstanceController, TcpAttach};
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineExecutor, PipelineMetrics, Stage};
use crate::runtime::{LaunchMode, LaunchOptions};
use crate::vmm::controller::{QemuController, VmmController};
use nosboot_shared::{NosbootError, NosbootResult};
use std::sync::Arc;
use tokio::sync::Mutex;

use tasks::{BootMediaTask, BootstrapTask, PrepareDiskTask, VmmSpawnTask};
pub use types::{LaunchCtx, LaunchState};

/// Stages for `mode`.
pub fn get_launch_plan(mode: LaunchMode) -> ExecutionPlan<LaunchCtx> {
    let stages: Vec<Stage<BoxedTask<LaunchCtx>>> = match mode {
        LaunchMode::Run => vec![
            Stage::parallel(vec![Box::new(PrepareDiskTask), Box::new(BootMediaTask)]),
            Stage::sequential(vec![Box::new(VmmSpawnTask)]),
            Stage::sequential(vec![Box::new(BootstrapTask)]),
        ],
        LaunchMode::Install => vec![
            Stage::sequential(vec![Box::new(PrepareDiskTask)]),
            Stage::sequential(vec![Box::new(VmmSpawnTask)]),
            Stage::sequential(vec![Box::new(BootstrapTask)]),
        ],
    };

    ExecutionPlan::new(stages)
}

/// Result of a successful launch.
pub struct LaunchOutcome {
    pub report: BootReport,
    pub metrics: PipelineMetrics,
    /// The configured VM. Already stopped in install mode.
    pub instance: InstanceController<TcpAttach>,
}

/// Runs the launch plan for one device.
pub struct Launcher {
    options: LaunchOptions,
    vmm: Box<dyn VmmController>,
}

impl Launcher {
    /// Launcher backed by QEMU. Fails on invalid options.
    pub fn new(options: LaunchOptions) -> NosbootResult<Self> {
        Self::with_vmm(options, Box::new(QemuController::new()))
    }

    pub fn with_vmm(options: LaunchOptions, vmm: Box<dyn VmmController>) -> NosbootResult<Self> {
        options.sanitize()?;
        Ok(Self { options, vmm })
    }

    pub fn options(&self) -> &LaunchOptions {
        &self.options
    }

    pub async fn run(self) -> NosbootResult<LaunchOutcome> {
        let mode = self.options.mode;
        tracing::info!(
            hostname = %self.options.device.hostname,
            ?mode,
            nics = self.options.nics,
            connection_mode = %self.options.connection_mode,
            "Launching device"
        );

        let ctx: LaunchCtx = Arc::new(Mutex::new(LaunchState::new(self.options, self.vmm)));
        let metrics = PipelineExecutor::execute(get_launch_plan(mode), Arc::clone(&ctx)).await?;
        metrics.log_summary();

        let mut state = ctx.lock().await;
        let mut instance = state
            .instance
            .take()
            .ok_or_else(|| NosbootError::Internal("vmm_spawn task must run first".into()))?;
        let report = state
            .report
            .take()
            .ok_or_else(|| NosbootError::Internal("bootstrap task must run first".into()))?;

        if mode.is_install() {
            instance.stop().await?;
            tracing::info!("Install complete");
        }

        Ok(LaunchOutcome {
            report,
            metrics,
            instance,
        })
    }
}
