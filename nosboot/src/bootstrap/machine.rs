//! Bootstrap step function.

use super::control::ControlChannel;
use super::metrics::BootMetrics;
use super::sequence::{ConsoleLine, base_sequence, save_sequence, user_sequence};
use super::state::BootstrapState;
use super::user_config::load_user_config;
use crate::console::{ConsoleSession, Pattern};
use crate::runtime::constants::console::LOGIN_BANNER;
use crate::runtime::{DeviceOptions, LaunchMode, LaunchOptions};
use nosboot_shared::NosbootResult;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};

/// What the caller should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Keep stepping.
    Pending,
    /// The console stayed silent past the spin budget. Power-cycle the VM,
    /// re-attach and keep stepping.
    Stalled,
    /// Bootstrap finished; carries the boot duration of the last attempt.
    Ready(Duration),
}

/// Drives one device through its first boot.
pub struct Bootstrapper {
    mode: LaunchMode,
    device: DeviceOptions,
    startup_config: PathBuf,
    spin_budget: u32,
    poll_timeout: Duration,
    prompt_timeout: Duration,
    state: BootstrapState,
    spins: u32,
    metrics: BootMetrics,
    boot_duration: Option<Duration>,
}

impl Bootstrapper {
    pub fn new(options: &LaunchOptions) -> Self {
        Self {
            mode: options.mode,
            device: options.device.clone(),
            startup_config: options.startup_config.clone(),
            spin_budget: options.spin_budget,
            poll_timeout: options.poll_timeout,
            prompt_timeout: options.prompt_timeout,
            state: BootstrapState::WaitingLogin,
            spins: 0,
            metrics: BootMetrics::new(),
            boot_duration: None,
        }
    }

    pub fn state(&self) -> BootstrapState {
        self.state
    }

    pub fn spins(&self) -> u32 {
        self.spins
    }

    pub fn metrics(&self) -> &BootMetrics {
        &self.metrics
    }

    /// Back to `WaitingLogin` for a power-cycled VM.
    pub fn reset(&mut self) {
        self.state = BootstrapState::WaitingLogin;
        self.spins = 0;
        self.boot_duration = None;
        self.metrics.record_restart();
    }

    /// Do the work of the current state.
    ///
    /// Console and control channel errors are fatal and returned as is.
    pub async fn step<S, C>(
        &mut self,
        console: &mut ConsoleSession<S>,
        control: &mut C,
    ) -> NosbootResult<StepOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
        C: ControlChannel + ?Sized,
    {
        match self.state {
            BootstrapState::WaitingLogin => self.wait_for_login(console).await,
            BootstrapState::BaseConfig => {
                tracing::info!(hostname = %self.device.hostname, "Applying bootstrap configuration");
                self.write_lines(console, &base_sequence(&self.device))
                    .await?;
                control.eject_media().await?;
                self.advance(BootstrapState::UserConfig);
                Ok(StepOutcome::Pending)
            }
            BootstrapState::UserConfig => {
                match load_user_config(&self.startup_config).await? {
                    Some(lines) => {
                        tracing::info!(
                            path = %self.startup_config.display(),
                            lines = lines.len(),
                            "Writing startup configuration"
                        );
                        self.write_lines(console, &user_sequence(&lines)).await?;
                    }
                    None => {
                        tracing::trace!("No startup configuration, skipping");
                    }
                }
                self.advance(BootstrapState::Saving);
                Ok(StepOutcome::Pending)
            }
            BootstrapState::Saving => {
                self.write_lines(console, &save_sequence()).await?;
                self.advance(BootstrapState::Detached);
                Ok(StepOutcome::Pending)
            }
            BootstrapState::Detached => {
                console.close().await?;
                control.close().await?;

                let elapsed = self.metrics.elapsed();
                self.advance(BootstrapState::Ready);
                self.boot_duration = Some(elapsed);
                tracing::info!(
                    duration_ms = elapsed.as_millis() as u64,
                    restarts = self.metrics.restarts(),
                    "Startup complete"
                );
                Ok(StepOutcome::Ready(elapsed))
            }
            BootstrapState::Ready => Ok(StepOutcome::Ready(self.boot_duration.unwrap_or_default())),
        }
    }

    async fn wait_for_login<S>(
        &mut self,
        console: &mut ConsoleSession<S>,
    ) -> NosbootResult<StepOutcome>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let outcome = console
            .expect(&[Pattern::literal(LOGIN_BANNER)], self.poll_timeout)
            .await?;

        if outcome.is_match() {
            tracing::debug!("Matched login banner");
            console.send("").await?;
            self.spins = 0;
            let next = if self.mode.is_install() {
                tracing::info!("Install boot reached login, skipping configuration");
                BootstrapState::Detached
            } else {
                BootstrapState::BaseConfig
            };
            self.advance(next);
            return Ok(StepOutcome::Pending);
        }

        if outcome.saw_output() {
            tracing::trace!(output = %String::from_utf8_lossy(&outcome.raw), "Console output");
            self.spins = 0;
            return Ok(StepOutcome::Pending);
        }

        self.spins += 1;
        if self.spins > self.spin_budget {
            tracing::warn!(
                spins = self.spins,
                budget = self.spin_budget,
                "No console output within spin budget"
            );
            self.spins = 0;
            self.state = BootstrapState::WaitingLogin;
            return Ok(StepOutcome::Stalled);
        }
        Ok(StepOutcome::Pending)
    }

    async fn write_lines<S>(
        &self,
        console: &mut ConsoleSession<S>,
        lines: &[ConsoleLine],
    ) -> NosbootResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        for line in lines {
            if let Some(prompt) = line.wait_for {
                let outcome = console
                    .expect(&[Pattern::literal(prompt)], self.prompt_timeout)
                    .await?;
                if !outcome.is_match() {
                    tracing::warn!(
                        prompt = %prompt,
                        line = %line.display().escape_debug(),
                        "Prompt not seen, writing anyway"
                    );
                }
            }
            tracing::debug!(line = %line.display().escape_debug(), "Writing console line");
            console.send_bytes(&line.text).await?;
        }
        Ok(())
    }

    fn advance(&mut self, next: BootstrapState) {
        self.metrics.finish_phase(self.state);
        tracing::debug!(from = %self.state, to = %next, "Bootstrap transition");
        self.state = next;
        if next.is_ready() {
            self.metrics.log_phases();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nosboot_shared::NosbootError;
    use tempfile::TempDir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    #[derive(Default)]
    struct RecordingControl {
        ejects: usize,
        closed: bool,
        fail_eject: bool,
    }

    #[async_trait]
    impl ControlChannel for RecordingControl {
        async fn eject_media(&mut self) -> NosbootResult<()> {
            if self.fail_eject {
                return Err(NosbootError::Monitor("Device 'ide1-cd0' not found".into()));
            }
            self.ejects += 1;
            Ok(())
        }

        async fn close(&mut self) -> NosbootResult<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn options(dir: &TempDir, spin_budget: u32) -> LaunchOptions {
        LaunchOptions {
            startup_config: dir.path().join("startup-config.cfg"),
            spin_budget,
            prompt_timeout: Duration::from_millis(200),
            ..LaunchOptions::default()
        }
    }

    /// Scripted switch console: prints the banner, answers every line with a
    /// prompt and returns the non-empty lines it received once the console
    /// hangs up.
    async fn fake_switch(mut device: DuplexStream) -> Vec<String> {
        device
            .write_all(b"\r\nPress RETURN to get started!\r\n")
            .await
            .unwrap();

        let mut received = Vec::new();
        let mut current = Vec::new();
        let mut enabled = false;
        let mut delete_stage = 0;
        let mut byte = [0u8; 1];

        while let Ok(n) = device.read(&mut byte).await {
            if n == 0 {
                break;
            }
            if byte[0] != b'\r' {
                current.push(byte[0]);
                continue;
            }

            let line = String::from_utf8(std::mem::take(&mut current)).unwrap();
            let reply: &[u8] = if line == "enable" {
                enabled = true;
                b"\r\nSwitch#"
            } else if line.starts_with("delete ") {
                delete_stage = 1;
                b"\r\nDelete filename [iosxe_config.txt]?"
            } else if delete_stage == 1 {
                delete_stage = 2;
                b"\r\nDelete bootflash:/iosxe_config.txt? [confirm]"
            } else if enabled {
                b"\r\nSwitch#"
            } else {
                b"\r\nSwitch>"
            };
            if !line.is_empty() {
                received.push(line);
            }
            if device.write_all(reply).await.is_err() {
                break;
            }
        }
        received
    }

    async fn run_to_ready(
        bootstrapper: &mut Bootstrapper,
        console: &mut ConsoleSession<DuplexStream>,
        control: &mut RecordingControl,
    ) -> Vec<BootstrapState> {
        let mut visited = vec![bootstrapper.state()];
        for _ in 0..20 {
            let outcome = bootstrapper.step(console, control).await.unwrap();
            visited.push(bootstrapper.state());
            if let StepOutcome::Ready(_) = outcome {
                return visited;
            }
        }
        panic!("bootstrap did not reach Ready: {:?}", visited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_console_stalls_after_budget() {
        let dir = TempDir::new().unwrap();
        let (client, _device) = duplex(1024);
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let mut bootstrapper = Bootstrapper::new(&options(&dir, 5));

        for poll in 1..=5 {
            let outcome = bootstrapper.step(&mut console, &mut control).await.unwrap();
            assert_eq!(outcome, StepOutcome::Pending, "poll {poll}");
            assert_eq!(bootstrapper.spins(), poll);
        }

        let outcome = bootstrapper.step(&mut console, &mut control).await.unwrap();
        assert_eq!(outcome, StepOutcome::Stalled);
        assert_eq!(bootstrapper.spins(), 0);
        assert_eq!(bootstrapper.state(), BootstrapState::WaitingLogin);
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_keeps_resetting_spins() {
        let dir = TempDir::new().unwrap();
        let (client, mut device) = duplex(64 * 1024);
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let mut bootstrapper = Bootstrapper::new(&options(&dir, 2));

        for _ in 0..20 {
            device.write_all(b"Initializing Hardware ...\r\n").await.unwrap();
            let outcome = bootstrapper.step(&mut console, &mut control).await.unwrap();
            assert_eq!(outcome, StepOutcome::Pending);
            assert_eq!(bootstrapper.spins(), 0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaches_ready_without_startup_config() {
        let dir = TempDir::new().unwrap();
        let (client, device) = duplex(64 * 1024);
        let switch = tokio::spawn(fake_switch(device));
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let mut bootstrapper = Bootstrapper::new(&options(&dir, 5));

        let visited = run_to_ready(&mut bootstrapper, &mut console, &mut control).await;
        assert_eq!(
            visited,
            vec![
                BootstrapState::WaitingLogin,
                BootstrapState::BaseConfig,
                BootstrapState::UserConfig,
                BootstrapState::Saving,
                BootstrapState::Detached,
                BootstrapState::Ready,
            ]
        );
        assert_eq!(control.ejects, 1);
        assert!(control.closed);
        assert!(console.is_closed());

        let received = switch.await.unwrap();
        let configure_count = received.iter().filter(|l| *l == "configure terminal").count();
        assert_eq!(configure_count, 1);
        assert_eq!(received.last().map(String::as_str), Some("wr"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_base_lines_sent_before_user_config() {
        let dir = TempDir::new().unwrap();
        let (client, device) = duplex(64 * 1024);
        let switch = tokio::spawn(fake_switch(device));
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let opts = options(&dir, 5);
        let mut bootstrapper = Bootstrapper::new(&opts);

        while bootstrapper.state() != BootstrapState::UserConfig {
            bootstrapper.step(&mut console, &mut control).await.unwrap();
        }
        assert_eq!(control.ejects, 1);
        console.close().await.unwrap();

        let expected: Vec<String> = base_sequence(&opts.device)
            .into_iter()
            .map(|l| l.display().into_owned())
            .filter(|t| !t.trim_matches('\r').is_empty())
            .collect();
        assert_eq!(switch.await.unwrap(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_lines_between_configure_and_end() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("startup-config.cfg"),
            "interface Loopback0\nip address 1.1.1.1 255.255.255.255\nno shut\n",
        )
        .unwrap();
        let (client, device) = duplex(64 * 1024);
        let switch = tokio::spawn(fake_switch(device));
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let mut bootstrapper = Bootstrapper::new(&options(&dir, 5));

        run_to_ready(&mut bootstrapper, &mut console, &mut control).await;

        let received = switch.await.unwrap();
        let start = received
            .iter()
            .rposition(|l| l == "configure terminal")
            .unwrap();
        assert_eq!(
            &received[start + 1..start + 5],
            &[
                "interface Loopback0",
                "ip address 1.1.1.1 255.255.255.255",
                "no shut",
                "end"
            ]
        );
        assert_eq!(&received[start + 5..], &["wr"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_mode_skips_configuration() {
        let dir = TempDir::new().unwrap();
        let (client, device) = duplex(64 * 1024);
        let switch = tokio::spawn(fake_switch(device));
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let opts = LaunchOptions {
            mode: LaunchMode::Install,
            ..options(&dir, 5)
        };
        let mut bootstrapper = Bootstrapper::new(&opts);

        let visited = run_to_ready(&mut bootstrapper, &mut console, &mut control).await;
        assert_eq!(
            visited,
            vec![
                BootstrapState::WaitingLogin,
                BootstrapState::Detached,
                BootstrapState::Ready,
            ]
        );
        assert_eq!(control.ejects, 0);
        assert!(switch.await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eject_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let (client, device) = duplex(64 * 1024);
        tokio::spawn(fake_switch(device));
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl {
            fail_eject: true,
            ..RecordingControl::default()
        };
        let mut bootstrapper = Bootstrapper::new(&options(&dir, 5));

        bootstrapper.step(&mut console, &mut control).await.unwrap();
        let err = bootstrapper
            .step(&mut console, &mut control)
            .await
            .unwrap_err();
        assert!(matches!(err, NosbootError::Monitor(_)));
        assert_eq!(bootstrapper.state(), BootstrapState::BaseConfig);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_is_sticky_and_reset_restarts() {
        let dir = TempDir::new().unwrap();
        let (client, device) = duplex(64 * 1024);
        tokio::spawn(fake_switch(device));
        let mut console = ConsoleSession::new(client);
        let mut control = RecordingControl::default();
        let mut bootstrapper = Bootstrapper::new(&options(&dir, 5));

        run_to_ready(&mut bootstrapper, &mut console, &mut control).await;
        let again = bootstrapper.step(&mut console, &mut control).await.unwrap();
        assert!(matches!(again, StepOutcome::Ready(_)));

        bootstrapper.reset();
        assert_eq!(bootstrapper.state(), BootstrapState::WaitingLogin);
        assert_eq!(bootstrapper.metrics().restarts(), 1);
    }
}
