//! Shared state of the launch pipeline.

use crate::bootstrap::BootReport;
use crate::identity::Identity;
use crate::instance::{InstanceController, TcpAttach};
use crate::media::BootMedia;
use crate::runtime::{LaunchOptions, StagingLayout};
use crate::vmm::controller::VmmController;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Context handed to every launch task.
pub type LaunchCtx = Arc<Mutex<LaunchState>>;

/// Inputs plus the outputs tasks leave for later stages.
pub struct LaunchState {
    pub options: LaunchOptions,
    pub layout: StagingLayout,
    /// Consumed by the VM spawn task.
    pub vmm: Option<Box<dyn VmmController>>,

    // === Task outputs ===
    pub disk_image: Option<PathBuf>,
    pub license_present: bool,
    pub identity: Option<Identity>,
    pub boot_media: Option<BootMedia>,
    pub instance: Option<InstanceController<TcpAttach>>,
    pub report: Option<BootReport>,
}

impl LaunchState {
    pub fn new(options: LaunchOptions, vmm: Box<dyn VmmController>) -> Self {
        let layout = StagingLayout::new(options.staging_dir.clone());
        Self {
            options,
            layout,
            vmm: Some(vmm),
            disk_image: None,
            license_present: false,
            identity: None,
            boot_media: None,
            instance: None,
            report: None,
        }
    }
}
