//! Filesystem layout of a launch.
//!
//! ```text
//! <staging_dir>/
//!   conf/
//!     iosxe_config.txt    first-boot command script
//!     vswitch.xml         identity document
//!   boot-report.json      written once the device is ready
//! ```

use crate::runtime::constants::filenames;
use nosboot_shared::{NosbootError, NosbootResult};
use std::path::{Path, PathBuf};

/// Paths of the boot media staging tree.
#[derive(Debug, Clone)]
pub struct StagingLayout {
    root: PathBuf,
}

impl StagingLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.root.join(filenames::CONF_DIR)
    }

    pub fn first_boot_script_path(&self) -> PathBuf {
        self.conf_dir().join(filenames::FIRST_BOOT_SCRIPT)
    }

    pub fn identity_document_path(&self) -> PathBuf {
        self.conf_dir().join(filenames::IDENTITY_DOCUMENT)
    }

    pub fn boot_report_path(&self) -> PathBuf {
        self.root.join(filenames::BOOT_REPORT)
    }

    /// Create the directory tree.
    pub fn prepare(&self) -> NosbootResult<()> {
        std::fs::create_dir_all(self.conf_dir()).map_err(|e| {
            NosbootError::Storage(format!(
                "Failed to create staging directory {}: {}",
                self.conf_dir().display(),
                e
            ))
        })
    }
}

/// Find the switch disk image in `dir`.
///
/// Picks the lexically first `*.qcow2` so repeated launches are stable.
pub fn discover_disk_image(dir: &Path) -> NosbootResult<PathBuf> {
    let mut candidates = files_with_extension(dir, filenames::DISK_EXTENSION)?;
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        NosbootError::Config(format!(
            "no .{} disk image found in {}",
            filenames::DISK_EXTENSION,
            dir.display()
        ))
    })
}

/// Move any `*.license` file from `image_dir` to `<tftp_dir>/license.lic`.
///
/// Returns whether a license is present under the TFTP root afterwards.
pub fn stage_license(image_dir: &Path, tftp_dir: &Path) -> NosbootResult<bool> {
    let target = tftp_dir.join(filenames::LICENSE);

    for license in files_with_extension(image_dir, filenames::LICENSE_EXTENSION)? {
        std::fs::create_dir_all(tftp_dir).map_err(|e| {
            NosbootError::Storage(format!(
                "Failed to create TFTP directory {}: {}",
                tftp_dir.display(),
                e
            ))
        })?;
        std::fs::rename(&license, &target).map_err(|e| {
            NosbootError::Storage(format!(
                "Failed to move license {} to {}: {}",
                license.display(),
                target.display(),
                e
            ))
        })?;
        tracing::debug!(
            from = %license.display(),
            to = %target.display(),
            "Staged license file"
        );
    }

    Ok(target.is_file())
}

fn files_with_extension(dir: &Path, extension: &str) -> NosbootResult<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        NosbootError::Storage(format!("Failed to read directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    Ok(files)
}
