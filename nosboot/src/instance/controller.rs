//! Instance Controller.
//!
//! Owns the handler of the running VM and polls the bootstrap until the
//! device is ready. A stalled bootstrap power-cycles the VM; there is no
//! upper bound on restarts.

use super::attach::DeviceAttach;
use crate::bootstrap::{Bootstrapper, StepOutcome};
use crate::vmm::InstanceSpec;
use crate::vmm::controller::{VmmController, VmmHandler};
use nosboot_shared::{NosbootError, NosbootResult};
use std::time::Duration;

pub struct InstanceController<A> {
    vmm: Box<dyn VmmController>,
    attach: A,
    spec: InstanceSpec,
    handler: Option<Box<dyn VmmHandler>>,
}

impl<A: DeviceAttach> InstanceController<A> {
    pub fn new(vmm: Box<dyn VmmController>, attach: A, spec: InstanceSpec) -> Self {
        Self {
            vmm,
            attach,
            spec,
            handler: None,
        }
    }

    /// PID of the running VM, if any.
    pub fn pid(&self) -> Option<u32> {
        self.handler.as_ref().map(|h| h.pid())
    }

    /// Start the VM. Fails if one is already running.
    pub async fn start(&mut self) -> NosbootResult<u32> {
        if self.handler.is_some() {
            return Err(NosbootError::InvalidState("VM already started".into()));
        }
        let handler = self.vmm.start(&self.spec).await?;
        let pid = handler.pid();
        self.handler = Some(handler);
        Ok(pid)
    }

    /// Stop the VM if one is running.
    pub async fn stop(&mut self) -> NosbootResult<()> {
        if let Some(mut handler) = self.handler.take() {
            tracing::info!(pid = handler.pid(), "Stopping VM");
            handler.stop().await?;
        }
        Ok(())
    }

    /// Power-cycle the VM.
    pub async fn restart(&mut self) -> NosbootResult<u32> {
        self.stop().await?;
        self.start().await
    }

    /// Resolve when the VM exits on its own.
    pub async fn wait(&mut self) -> NosbootResult<()> {
        match self.handler.as_mut() {
            Some(handler) => handler.wait().await,
            None => Err(NosbootError::InvalidState("VM not started".into())),
        }
    }

    /// Step `bootstrapper` until the device is ready.
    ///
    /// Returns the boot duration of the successful attempt.
    pub async fn run_bootstrap(&mut self, bootstrapper: &mut Bootstrapper) -> NosbootResult<Duration> {
        if self.handler.is_none() {
            return Err(NosbootError::InvalidState(
                "VM must be started before bootstrap".into(),
            ));
        }

        loop {
            let (mut console, mut control) = self.attach.attach(&self.spec).await?;

            let outcome = loop {
                match bootstrapper.step(&mut console, &mut control).await? {
                    StepOutcome::Pending => continue,
                    outcome => break outcome,
                }
            };

            match outcome {
                StepOutcome::Ready(duration) => return Ok(duration),
                _ => {
                    drop(console);
                    drop(control);
                    tracing::warn!(
                        restarts = bootstrapper.metrics().restarts() + 1,
                        "Bootstrap stalled, restarting VM"
                    );
                    let pid = self.restart().await?;
                    bootstrapper.reset();
                    tracing::info!(pid, "VM restarted");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{BootstrapState, ControlChannel};
    use crate::console::ConsoleSession;
    use crate::runtime::LaunchOptions;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;
    use tokio::io::{AsyncWriteExt, DuplexStream, duplex};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Counters {
        starts: AtomicUsize,
        stops: AtomicUsize,
        attaches: AtomicUsize,
    }

    struct FakeHandler {
        pid: u32,
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl VmmHandler for FakeHandler {
        async fn stop(&mut self) -> NosbootResult<()> {
            self.counters.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn wait(&mut self) -> NosbootResult<()> {
            Ok(())
        }

        fn is_running(&mut self) -> bool {
            true
        }

        fn pid(&self) -> u32 {
            self.pid
        }
    }

    struct FakeVmm {
        counters: Arc<Counters>,
    }

    #[async_trait]
    impl VmmController for FakeVmm {
        async fn start(&mut self, _spec: &InstanceSpec) -> NosbootResult<Box<dyn VmmHandler>> {
            let n = self.counters.starts.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeHandler {
                pid: 1000 + n as u32,
                counters: Arc::clone(&self.counters),
            }))
        }
    }

    struct NullControl;

    #[async_trait]
    impl ControlChannel for NullControl {
        async fn eject_media(&mut self) -> NosbootResult<()> {
            Ok(())
        }

        async fn close(&mut self) -> NosbootResult<()> {
            Ok(())
        }
    }

    /// The first `silent_boots` attaches see a console that never prints;
    /// later ones print the login banner and then stay quiet.
    struct ScriptedAttach {
        silent_boots: usize,
        counters: Arc<Counters>,
        devices: Mutex<Vec<DuplexStream>>,
    }

    #[async_trait]
    impl DeviceAttach for ScriptedAttach {
        type Stream = DuplexStream;
        type Control = NullControl;

        async fn attach(
            &self,
            _spec: &InstanceSpec,
        ) -> NosbootResult<(ConsoleSession<DuplexStream>, NullControl)> {
            let n = self.counters.attaches.fetch_add(1, Ordering::SeqCst);
            let (client, mut device) = duplex(64 * 1024);
            if n >= self.silent_boots {
                device
                    .write_all(b"Press RETURN to get started!\r\n")
                    .await
                    .unwrap();
            }
            self.devices.lock().await.push(device);
            Ok((ConsoleSession::new(client), NullControl))
        }
    }

    fn spec() -> InstanceSpec {
        InstanceSpec::from_options(
            &LaunchOptions::default(),
            PathBuf::from("/cat9kv.qcow2"),
            Some(PathBuf::from("/config.iso")),
        )
    }

    fn controller(silent_boots: usize) -> (InstanceController<ScriptedAttach>, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let controller = InstanceController::new(
            Box::new(FakeVmm {
                counters: Arc::clone(&counters),
            }),
            ScriptedAttach {
                silent_boots,
                counters: Arc::clone(&counters),
                devices: Mutex::new(Vec::new()),
            },
            spec(),
        );
        (controller, counters)
    }

    fn bootstrapper(dir: &TempDir) -> Bootstrapper {
        Bootstrapper::new(&LaunchOptions {
            startup_config: dir.path().join("startup-config.cfg"),
            spin_budget: 3,
            prompt_timeout: Duration::from_millis(100),
            ..LaunchOptions::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_restarts_on_stall_then_ready() {
        let dir = TempDir::new().unwrap();
        let (mut instance, counters) = controller(2);
        let mut bootstrapper = bootstrapper(&dir);

        assert_eq!(instance.start().await.unwrap(), 1000);
        instance.run_bootstrap(&mut bootstrapper).await.unwrap();

        assert_eq!(bootstrapper.state(), BootstrapState::Ready);
        assert_eq!(bootstrapper.metrics().restarts(), 2);
        assert_eq!(counters.starts.load(Ordering::SeqCst), 3);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 2);
        assert_eq!(counters.attaches.load(Ordering::SeqCst), 3);
        assert_eq!(instance.pid(), Some(1002));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_restart_when_console_answers() {
        let dir = TempDir::new().unwrap();
        let (mut instance, counters) = controller(0);
        let mut bootstrapper = bootstrapper(&dir);

        instance.start().await.unwrap();
        instance.run_bootstrap(&mut bootstrapper).await.unwrap();

        assert_eq!(counters.starts.load(Ordering::SeqCst), 1);
        assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_bootstrap_requires_started_vm() {
        let dir = TempDir::new().unwrap();
        let (mut instance, _counters) = controller(0);
        let mut bootstrapper = bootstrapper(&dir);

        let err = instance.run_bootstrap(&mut bootstrapper).await.unwrap_err();
        assert!(matches!(err, NosbootError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let (mut instance, counters) = controller(0);
        instance.start().await.unwrap();
        assert!(instance.start().await.is_err());

        instance.stop().await.unwrap();
        instance.stop().await.unwrap();
        assert_eq!(counters.stops.load(Ordering::SeqCst), 1);
        assert_eq!(instance.pid(), None);
    }
}
