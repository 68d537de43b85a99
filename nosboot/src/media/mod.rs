//! Boot media: first-boot script and identity document packaged as an ISO.
//!
//! IOS-XE picks up `conf/iosxe_config.txt` and `conf/vswitch.xml` from an
//! attached CD-ROM on first boot. The script switches the console to serial,
//! raises the license level and reloads; the XML hands the device its serial
//! number and port layout.
//!
//! The image tool runs as an awaited child process. The media is complete
//! (or the build has failed) by the time `build` returns.

use crate::identity::Identity;
use crate::runtime::StagingLayout;
use nosboot_shared::{NosbootError, NosbootResult};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Commands executed by the device on its very first boot.
const FIRST_BOOT_COMMANDS: &[&str] = &[
    "hostname cat9kv",
    "platform console serial",
    "license boot level network-advantage addon dna-advantage",
    "license smart off",
    "do wr",
    "do reload",
];

/// A built boot media image.
#[derive(Debug, Clone)]
pub struct BootMedia {
    pub path: PathBuf,
    pub serial: String,
}

/// Renders the staging tree and packages it with an ISO tool.
#[derive(Debug, Clone)]
pub struct BootMediaBuilder {
    tool: PathBuf,
    layout: StagingLayout,
}

impl BootMediaBuilder {
    /// # Arguments
    /// * `tool` - genisoimage-compatible binary (`-l -o <out> <dir>`)
    /// * `layout` - Staging tree to render into
    pub fn new(tool: impl Into<PathBuf>, layout: StagingLayout) -> Self {
        Self {
            tool: tool.into(),
            layout,
        }
    }

    /// Render both artifacts and package them at `out_path`.
    ///
    /// # Errors
    /// * `Storage` - staging files could not be written
    /// * `MediaBuild` - the tool could not be spawned, exited non-zero, or
    ///   left no image behind
    pub async fn build(&self, identity: &Identity, out_path: &Path) -> NosbootResult<BootMedia> {
        tracing::info!(
            serial = %identity.serial,
            out = %out_path.display(),
            "Creating bootstrap media"
        );

        self.layout.prepare()?;
        write_artifact(
            &self.layout.first_boot_script_path(),
            render_first_boot_script(),
        )
        .await?;
        write_artifact(
            &self.layout.identity_document_path(),
            render_identity_document(identity)?,
        )
        .await?;

        self.package(out_path).await?;

        Ok(BootMedia {
            path: out_path.to_path_buf(),
            serial: identity.serial.clone(),
        })
    }

    async fn package(&self, out_path: &Path) -> NosbootResult<()> {
        // A stale image from a previous launch must not pass the existence check.
        match tokio::fs::remove_file(out_path).await {
            Ok(()) => tracing::debug!(path = %out_path.display(), "Removed stale boot media"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(NosbootError::Storage(format!(
                    "Failed to remove stale boot media {}: {}",
                    out_path.display(),
                    e
                )));
            }
        }

        let output = Command::new(&self.tool)
            .arg("-l")
            .arg("-o")
            .arg(out_path)
            .arg(self.layout.root())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                NosbootError::MediaBuild(format!(
                    "Failed to run {}: {}",
                    self.tool.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(NosbootError::MediaBuild(format!(
                "{} exited with {}: {}",
                self.tool.display(),
                output.status,
                stderr.trim()
            )));
        }

        if !out_path.is_file() {
            return Err(NosbootError::MediaBuild(format!(
                "{} succeeded but produced no image at {}",
                self.tool.display(),
                out_path.display()
            )));
        }

        tracing::debug!(path = %out_path.display(), "Boot media packaged");
        Ok(())
    }
}

async fn write_artifact(path: &Path, contents: String) -> NosbootResult<()> {
    tokio::fs::write(path, contents).await.map_err(|e| {
        NosbootError::Storage(format!("Failed to write {}: {}", path.display(), e))
    })
}

/// First-boot command script, CRLF line endings with a blank line per command.
pub fn render_first_boot_script() -> String {
    let mut script = String::new();
    for command in FIRST_BOOT_COMMANDS {
        script.push_str(command);
        script.push_str("\r\n\r\n");
    }
    script.push_str("\r\n");
    script
}

/// Identity document in the schema the virtual switch expects.
pub fn render_identity_document(identity: &Identity) -> NosbootResult<String> {
    let mut xml = String::new();
    write_identity_document(&mut xml, identity).map_err(|e| {
        NosbootError::Internal(format!("Failed to render identity document: {}", e))
    })?;
    Ok(xml)
}

fn write_identity_document(
    out: &mut impl std::fmt::Write,
    identity: &Identity,
) -> std::fmt::Result {
    let topology = &identity.topology;

    writeln!(out, r#"<?xml version="1.0"?>"#)?;
    writeln!(out, "<!-- Virtual Cat9k configuration information -->")?;
    writeln!(out, "<switch>")?;
    writeln!(out, "  <board_id>{}</board_id>", topology.board_id)?;
    writeln!(
        out,
        "  <prod_serial_number>{}</prod_serial_number>",
        identity.serial
    )?;
    writeln!(out, "  <port_count>{}</port_count>", topology.port_count)?;
    for port in &topology.ports {
        writeln!(out, r#"  <port lpn="{}">"#, port.lpn)?;
        writeln!(out, "    <asic_id>{}</asic_id>", port.asic_id)?;
        writeln!(out, "    <asic_ifg>{}</asic_ifg>", port.asic_ifg)?;
        writeln!(out, "    <asic_slice>{}</asic_slice>", port.asic_slice)?;
        writeln!(out, "  </port>")?;
    }
    writeln!(out, "</switch>")
}
