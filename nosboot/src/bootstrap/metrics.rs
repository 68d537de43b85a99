//! Boot timings and the report written once the device is ready.

use super::state::BootstrapState;
use chrono::{DateTime, Utc};
use nosboot_shared::{NosbootError, NosbootResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMetrics {
    pub phase: BootstrapState,
    pub duration_ms: u128,
}

/// Timings of the current boot attempt plus the restart count.
#[derive(Debug, Clone)]
pub struct BootMetrics {
    boot_start: Instant,
    phase_start: Instant,
    phases: Vec<PhaseMetrics>,
    restarts: u32,
}

impl BootMetrics {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            boot_start: now,
            phase_start: now,
            phases: Vec::new(),
            restarts: 0,
        }
    }

    /// Close the timing of `phase`.
    pub fn finish_phase(&mut self, phase: BootstrapState) {
        let now = Instant::now();
        self.phases.push(PhaseMetrics {
            phase,
            duration_ms: now.duration_since(self.phase_start).as_millis(),
        });
        self.phase_start = now;
    }

    /// Start a fresh attempt after a power cycle.
    pub fn record_restart(&mut self) {
        let now = Instant::now();
        self.restarts += 1;
        self.boot_start = now;
        self.phase_start = now;
        self.phases.clear();
    }

    /// Time since the current attempt started.
    pub fn elapsed(&self) -> Duration {
        self.boot_start.elapsed()
    }

    pub fn restarts(&self) -> u32 {
        self.restarts
    }

    pub fn phases(&self) -> &[PhaseMetrics] {
        &self.phases
    }

    pub fn phase_duration_ms(&self, phase: BootstrapState) -> Option<u128> {
        self.phases
            .iter()
            .find(|p| p.phase == phase)
            .map(|p| p.duration_ms)
    }

    pub fn log_phases(&self) {
        for phase in &self.phases {
            tracing::info!(
                phase = %phase.phase,
                duration_ms = phase.duration_ms,
                "Bootstrap phase complete"
            );
        }
    }
}

impl Default for BootMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON summary of a completed bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootReport {
    pub hostname: String,
    /// Absent in install mode, where no identity is injected.
    pub serial: Option<String>,
    pub restarts: u32,
    /// Whether a license file was staged under the TFTP root.
    pub license_present: bool,
    pub phases: Vec<PhaseMetrics>,
    pub total_duration_ms: u128,
    pub completed_at: DateTime<Utc>,
}

impl BootReport {
    pub fn new(
        hostname: impl Into<String>,
        serial: Option<String>,
        license_present: bool,
        metrics: &BootMetrics,
        total: Duration,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            serial,
            restarts: metrics.restarts(),
            license_present,
            phases: metrics.phases().to_vec(),
            total_duration_ms: total.as_millis(),
            completed_at: Utc::now(),
        }
    }

    pub async fn write_to(&self, path: &Path) -> NosbootResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| NosbootError::Internal(format!("Failed to encode boot report: {}", e)))?;
        tokio::fs::write(path, json).await.map_err(|e| {
            NosbootError::Storage(format!(
                "Failed to write boot report {}: {}",
                path.display(),
                e
            ))
        })?;
        tracing::debug!(path = %path.display(), "Boot report written");
        Ok(())
    }
}
