//! Scanner event loop.
//!
//! Reads key events from the claimed scanner, assembles codes and submits
//! every completed code with the kind the Status Store currently expects.
//! The store is read fresh for each code because the engine (another
//! process) moves it between identity and artifact.
//!
//! Delivery is best effort: a code scanned while no session is active is
//! dropped, and a code the control plane cannot take is logged and lost.

use checkin_core::{StatusStore, Submission};
use checkin_hardware::keymap::{CodeAssembler, KeyOutcome};
use checkin_hardware::{HardwareError, KeyEvent, ScannerDevice};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::submitter::Submitter;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("Scanner failed: {0}")]
    Hardware(#[from] HardwareError),
}

/// Counters kept over one listener run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerStats {
    /// Codes completed by the assembler.
    pub codes: u64,
    /// Codes the control plane accepted.
    pub accepted: u64,
    /// Codes the control plane answered with a rejection.
    pub rejected: u64,
    /// Codes dropped because no session was active.
    pub dropped: u64,
    /// Codes lost because the control plane could not be reached.
    pub undelivered: u64,
    /// Transient read errors.
    pub read_errors: u64,
}

pub struct ScanListener<D, S> {
    device: D,
    submitter: S,
    store: StatusStore,
    assembler: CodeAssembler,
    stats: ListenerStats,
}

impl<D: ScannerDevice, S: Submitter> ScanListener<D, S> {
    pub fn new(device: D, submitter: S, store: StatusStore) -> Self {
        Self {
            device,
            submitter,
            store,
            assembler: CodeAssembler::new(),
            stats: ListenerStats::default(),
        }
    }

    /// Run until `shutdown` fires or the scanner goes away.
    ///
    /// The scanner is released on every exit path.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Hardware`] when the scanner reports a fatal
    /// error such as a disconnect.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<ListenerStats, ListenerError> {
        if let Err(e) = self.store.ensure_exists() {
            warn!(path = %self.store.path().display(), error = %e, "Could not create status file");
        }

        match self.device.info().await {
            Ok(info) => info!(device = %info.name, path = ?info.path, "Listening for scans"),
            Err(e) => debug!(error = %e, "Scanner info unavailable"),
        }

        let result = self.event_loop(&shutdown).await;

        if let Err(e) = self.device.release().await {
            error!(error = %e, "Failed to release scanner");
        } else {
            debug!("Scanner released");
        }

        info!(
            codes = self.stats.codes,
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            dropped = self.stats.dropped,
            undelivered = self.stats.undelivered,
            "Listener stopped"
        );

        result.map(|()| self.stats)
    }

    async fn event_loop(&mut self, shutdown: &CancellationToken) -> Result<(), ListenerError> {
        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                event = self.device.read_event() => event,
            };

            match event {
                Ok(event) => self.on_event(event).await,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Scanner lost");
                    return Err(e.into());
                }
                Err(e) => {
                    self.stats.read_errors += 1;
                    warn!(error = %e, "Scanner read failed, continuing");
                }
            }
        }
    }

    async fn on_event(&mut self, event: KeyEvent) {
        match self.assembler.push(event) {
            KeyOutcome::Completed(code) => self.on_code(code).await,
            KeyOutcome::Ignored(keycode) => trace!(keycode, "Key not in table"),
            KeyOutcome::Buffered(_) | KeyOutcome::Empty | KeyOutcome::Skipped => {}
        }
    }

    async fn on_code(&mut self, code: String) {
        self.stats.codes += 1;

        let status = self.store.read();
        let (Some(session_id), Some(kind)) = (
            status.active_session_id,
            status.expected_kind.as_code_kind(),
        ) else {
            self.stats.dropped += 1;
            warn!(code = %code, "No active session, scan dropped");
            return;
        };

        debug!(code = %code, kind = %kind, session_id, "Submitting scan");
        match self
            .submitter
            .submit(Submission::new(code.clone(), kind, session_id))
            .await
        {
            Ok(response) if response.success => {
                self.stats.accepted += 1;
                info!(code = %code, kind = %kind, session_id, "{}", response.message);
            }
            Ok(response) => {
                self.stats.rejected += 1;
                warn!(
                    code = %code,
                    kind = %kind,
                    session_id,
                    error = ?response.error,
                    "Scan rejected: {}",
                    response.message
                );
            }
            Err(e) => {
                self.stats.undelivered += 1;
                error!(code = %code, session_id, error = %e, "Control plane unavailable, scan lost");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::{CodeKind, ErrorKind, ScanStatus};
    use checkin_hardware::mock::{MockScanner, MockScannerHandle};
    use checkin_network::{ControlError, ControlResponse};
    use std::sync::{Arc, Mutex};
    use tokio::sync::mpsc;

    /// Records submissions; fails while `offline` is set.
    #[derive(Clone)]
    struct FakeSubmitter {
        tx: mpsc::UnboundedSender<Submission>,
        offline: Arc<Mutex<bool>>,
    }

    impl Submitter for FakeSubmitter {
        async fn submit(&self, submission: Submission) -> Result<ControlResponse, ControlError> {
            let offline = *self.offline.lock().unwrap();
            let _ = self.tx.send(submission.clone());
            if offline {
                return Err(ControlError::ConnectionLost("server down".into()));
            }
            if submission.code == "ZZZZZ" {
                return Ok(ControlResponse::failure(ErrorKind::NotFound, "not found"));
            }
            Ok(ControlResponse::ok("ok", None))
        }
    }

    struct Harness {
        _dir: tempfile::TempDir,
        store: StatusStore,
        handle: MockScannerHandle,
        submissions: mpsc::UnboundedReceiver<Submission>,
        offline: Arc<Mutex<bool>>,
        shutdown: CancellationToken,
        task: tokio::task::JoinHandle<Result<ListenerStats, ListenerError>>,
    }

    fn start() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("scan_status.json"));
        let (scanner, handle) = MockScanner::new();
        let (tx, submissions) = mpsc::unbounded_channel();
        let offline = Arc::new(Mutex::new(false));
        let submitter = FakeSubmitter {
            tx,
            offline: offline.clone(),
        };
        let shutdown = CancellationToken::new();

        let listener = ScanListener::new(scanner, submitter, store.clone());
        let task = tokio::spawn(listener.run(shutdown.clone()));

        Harness {
            _dir: dir,
            store,
            handle,
            submissions,
            offline,
            shutdown,
            task,
        }
    }

    #[tokio::test]
    async fn test_submits_with_expected_kind() {
        let mut h = start();
        h.store
            .write(ScanStatus::awaiting_identity(1, "Physics 101"))
            .unwrap();

        h.handle.type_code("S100").await.unwrap();
        let submission = h.submissions.recv().await.unwrap();
        assert_eq!(submission, Submission::new("S100", CodeKind::Identity, 1));

        h.store
            .write(ScanStatus::awaiting_artifact(1, "Physics 101", 42, "Ada"))
            .unwrap();
        h.handle.type_code("BK001").await.unwrap();
        let submission = h.submissions.recv().await.unwrap();
        assert_eq!(submission, Submission::new("BK001", CodeKind::Artifact, 1));

        h.shutdown.cancel();
        let stats = h.task.await.unwrap().unwrap();
        assert_eq!(stats.codes, 2);
        assert_eq!(stats.accepted, 2);
        assert!(h.handle.is_released());
    }

    #[tokio::test]
    async fn test_drops_codes_without_active_session() {
        let mut h = start();

        h.handle.type_code("S100").await.unwrap();
        h.handle.disconnect().await.unwrap();

        let err = h.task.await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            ListenerError::Hardware(HardwareError::Disconnected { .. })
        ));
        assert!(h.submissions.try_recv().is_err());
        assert!(h.handle.is_released());
    }

    #[tokio::test]
    async fn test_creates_status_file_on_start() {
        let h = start();
        h.handle.disconnect().await.unwrap();
        let _ = h.task.await.unwrap();

        assert!(h.store.path().exists());
        assert!(!h.store.read().is_active());
    }

    #[tokio::test]
    async fn test_transient_errors_do_not_stop_loop() {
        let mut h = start();
        h.store.write(ScanStatus::awaiting_identity(3, "Maths")).unwrap();

        h.handle.send_read_error("usb hiccup").await.unwrap();
        *h.offline.lock().unwrap() = true;
        h.handle.type_code("S100").await.unwrap();
        assert_eq!(h.submissions.recv().await.unwrap().code, "S100");

        *h.offline.lock().unwrap() = false;
        h.handle.type_code("ZZZZZ").await.unwrap();
        assert_eq!(h.submissions.recv().await.unwrap().code, "ZZZZZ");
        h.handle.type_code("S200").await.unwrap();
        assert_eq!(h.submissions.recv().await.unwrap().code, "S200");

        h.shutdown.cancel();
        let stats = h.task.await.unwrap().unwrap();
        assert_eq!(
            stats,
            ListenerStats {
                codes: 3,
                accepted: 1,
                rejected: 1,
                dropped: 0,
                undelivered: 1,
                read_errors: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_enter_without_code_submits_nothing() {
        let mut h = start();
        h.store.write(ScanStatus::awaiting_identity(1, "Art")).unwrap();

        h.handle
            .send_key(checkin_hardware::keymap::KEY_ENTER)
            .await
            .unwrap();
        h.handle.type_code("S1").await.unwrap();

        assert_eq!(h.submissions.recv().await.unwrap().code, "S1");
        h.shutdown.cancel();
        assert_eq!(h.task.await.unwrap().unwrap().codes, 1);
    }
}
