//! Scan Processing Engine.
//!
//! The engine owns the scan-phase machine and is the only writer of the
//! Status Store. Every mutation goes through `&mut self`; the server keeps
//! the engine behind a `tokio::sync::Mutex` so requests apply one at a time.
//!
//! A rejected submission never changes the phase, the store or the
//! database, except for the state-loss recovery on the artifact step, which
//! forces the kiosk back to the identity step.

use std::collections::VecDeque;
use std::fmt;

use checkin_core::{
    CodeKind, ExpectedKind, ParticipantId, ScanCode, ScanStatus, SessionId, SessionStatus,
    StatusStore, Submission,
};
use checkin_feedback::{DisplayMessages, FeedbackDisplay};
use checkin_storage::models::{NewScanRecord, Session};
use checkin_storage::repositories::{
    EligibilityRepository, ParticipantRepository, ScanRecordRepository, SessionRepository,
    SqliteEligibilityRepository, SqliteParticipantRepository, SqliteScanRecordRepository,
    SqliteSessionRepository,
};
use checkin_storage::{Database, transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{ScanError, ScanResult};
use crate::issuer::{ArtifactIssuer, IssuerConfig};
use crate::policy::EligibilityPolicy;
use crate::state_machine::{ScanPhase, StateMachine, StateTransition};

/// Engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub eligibility_policy: EligibilityPolicy,
    /// Mint and print a booklet at every identity step when set.
    pub issuer: Option<IssuerConfig>,
}

impl EngineConfig {
    pub fn with_policy(mut self, policy: EligibilityPolicy) -> Self {
        self.eligibility_policy = policy;
        self
    }

    pub fn with_issuer(mut self, issuer: IssuerConfig) -> Self {
        self.issuer = Some(issuer);
        self
    }
}

/// What an accepted scan did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ScanOutcome {
    IdentityVerified {
        participant_id: ParticipantId,
        participant_name: String,
        /// Booklet code minted for the participant, if an issuer is configured.
        issued_code: Option<String>,
    },
    ArtifactRecorded {
        record_id: i64,
        participant_id: ParticipantId,
        participant_name: String,
        artifact_code: String,
    },
}

/// Successful submission: the outcome plus the Status Store record it left.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanAccepted {
    pub outcome: ScanOutcome,
    pub status: ScanStatus,
}

impl fmt::Display for ScanAccepted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ScanOutcome::IdentityVerified {
                participant_name,
                issued_code: Some(code),
                ..
            } => write!(f, "{participant_name} verified, booklet {code} issued"),
            ScanOutcome::IdentityVerified {
                participant_name, ..
            } => write!(f, "{participant_name} verified, scan booklet"),
            ScanOutcome::ArtifactRecorded {
                participant_name,
                artifact_code,
                ..
            } => write!(f, "{artifact_code} recorded for {participant_name}"),
        }
    }
}

pub struct ScanEngine {
    database: Database,
    sessions: SqliteSessionRepository,
    participants: SqliteParticipantRepository,
    eligibility: SqliteEligibilityRepository,
    records: SqliteScanRecordRepository,
    store: StatusStore,
    display: FeedbackDisplay,
    policy: EligibilityPolicy,
    issuer: Option<ArtifactIssuer>,
    machine: StateMachine,
}

impl ScanEngine {
    /// Build the engine and reconcile the Status Store with the database.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Persistence`] if the database cannot be read or
    /// the Status Store cannot be written.
    pub async fn start(
        database: Database,
        store: StatusStore,
        display: FeedbackDisplay,
        config: EngineConfig,
    ) -> ScanResult<Self> {
        let pool = database.pool().clone();
        let mut engine = Self {
            sessions: SqliteSessionRepository::new(pool.clone()),
            participants: SqliteParticipantRepository::new(pool.clone()),
            eligibility: SqliteEligibilityRepository::new(pool.clone()),
            records: SqliteScanRecordRepository::new(pool),
            database,
            store,
            display,
            policy: config.eligibility_policy,
            issuer: config.issuer.map(ArtifactIssuer::new),
            machine: StateMachine::new(),
        };

        engine.reconcile().await?;
        Ok(engine)
    }

    pub fn phase(&self) -> ScanPhase {
        *self.machine.current_state()
    }

    pub fn history(&self) -> &VecDeque<StateTransition> {
        self.machine.history()
    }

    /// Current Status Store record.
    pub fn status(&self) -> ScanStatus {
        self.store.read()
    }

    pub fn policy(&self) -> EligibilityPolicy {
        self.policy
    }

    /// Align the store and the phase with the active session in storage.
    async fn reconcile(&mut self) -> ScanResult<()> {
        let Some(session) = self.sessions.find_active().await? else {
            self.store.clear()?;
            self.machine = StateMachine::new();
            self.display.show_idle().await;
            info!("No active session at startup");
            return Ok(());
        };

        let status = self.store.read();
        let status = if status.active_session_id == Some(session.id) && status.is_active() {
            if status.expected_kind == ExpectedKind::Artifact
                && status.verified_participant().is_none()
            {
                warn!(session_id = session.id, "Artifact expected without verified identity, resetting to identity");
                self.store
                    .write(ScanStatus::awaiting_identity(session.id, &session.name))?
            } else {
                status
            }
        } else {
            info!(
                session_id = session.id,
                stored_session = ?status.active_session_id,
                "Status store out of date, rewriting for active session"
            );
            self.store
                .write(ScanStatus::awaiting_identity(session.id, &session.name))?
        };

        let phase = ScanPhase::from_expected(status.expected_kind);
        self.machine = StateMachine::restored(phase);
        self.show_phase(&status).await;

        info!(session_id = session.id, phase = %phase, "Engine reconciled");
        Ok(())
    }

    /// Arm `session_id` for check-ins.
    ///
    /// Re-activating the active session restarts the cycle at the identity
    /// step.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NotFound`] for an unknown session
    /// - [`ScanError::SessionAlreadyActive`] if another session is active
    /// - [`ScanError::Persistence`] on storage failure
    pub async fn activate_session(&mut self, session_id: SessionId) -> ScanResult<ScanStatus> {
        let session = self.find_session(session_id).await?;

        if let Some(active) = self.sessions.find_active().await? {
            if active.id != session_id {
                warn!(session_id, active_id = active.id, "Activation refused, another session is active");
                return Err(ScanError::SessionAlreadyActive {
                    active_id: active.id,
                });
            }
        } else if let Err(e) = self
            .sessions
            .set_status(session_id, SessionStatus::AuthenticationActive)
            .await
        {
            if e.is_unique_violation() {
                if let Some(active) = self.sessions.find_active().await? {
                    return Err(ScanError::SessionAlreadyActive {
                        active_id: active.id,
                    });
                }
            }
            return Err(e.into());
        }

        let status = self
            .store
            .write(ScanStatus::awaiting_identity(session.id, &session.name))?;
        self.machine.ensure_state(ScanPhase::AwaitingIdentity)?;
        self.display
            .show_feedback(&session.name, DisplayMessages::SCAN_ID_CARD)
            .await;

        info!(session_id, session = %session.name, "Session activated");
        Ok(status)
    }

    /// Close `session_id` for check-ins.
    ///
    /// Idempotent. Check-in records are never touched. The store is cleared
    /// and the display returns to idle on every call, whatever the session
    /// id names.
    ///
    /// # Errors
    ///
    /// - [`ScanError::NotFound`] for an unknown session, after clearing
    /// - [`ScanError::Persistence`] on storage failure
    pub async fn deactivate_session(&mut self, session_id: SessionId) -> ScanResult<ScanStatus> {
        let lookup = self.sessions.find_by_id(session_id).await;

        let status = self.store.clear()?;
        self.machine.ensure_state(ScanPhase::NoActiveSession)?;
        self.display.show_idle().await;

        match lookup? {
            Some(session) if session.is_active() => {
                self.sessions
                    .set_status(session_id, SessionStatus::Finished)
                    .await?;
                info!(session_id, session = %session.name, "Session finished");
            }
            Some(session) => {
                debug!(session_id, status = %session.status_text, "Deactivating inactive session");
            }
            None => {
                warn!(session_id, "Deactivation for unknown session, status store cleared");
                return Err(ScanError::not_found("Session", session_id));
            }
        }

        if let Some(active) = self.sessions.find_active().await? {
            warn!(session_id, active_id = active.id, "Another session is still active in storage");
        }

        Ok(status)
    }

    /// Validate and apply one scan.
    ///
    /// # Errors
    ///
    /// Any [`ScanError`]; see the variant docs. The rejection is logged and,
    /// where useful, shown on the display.
    pub async fn submit(&mut self, submission: Submission) -> ScanResult<ScanAccepted> {
        let phase = self.phase();
        let result = self.apply(&submission).await;

        match &result {
            Ok(accepted) => {
                info!(
                    session_id = submission.session_id,
                    code = %submission.code.trim(),
                    phase = %self.phase(),
                    "{accepted}"
                );
            }
            Err(e) => {
                warn!(
                    session_id = submission.session_id,
                    code = %submission.code.trim(),
                    phase = %phase,
                    kind = %e.kind(),
                    error = %e,
                    "Scan rejected"
                );
                self.show_rejection(e).await;
            }
        }

        result
    }

    async fn apply(&mut self, submission: &Submission) -> ScanResult<ScanAccepted> {
        let code = ScanCode::new(&submission.code)?;
        let status = self.store.read();

        let Some(session_id) = status.active_session_id.filter(|_| status.is_active()) else {
            return Err(ScanError::NoActiveSession);
        };
        if submission.session_id != session_id {
            return Err(ScanError::SessionMismatch {
                expected: session_id,
                got: submission.session_id,
            });
        }
        if !status.expected_kind.accepts(submission.kind) {
            return Err(ScanError::KindMismatch {
                expected: status.expected_kind,
                got: submission.kind,
            });
        }

        self.sync_phase(&status);

        match submission.kind {
            CodeKind::Identity => self.identity_step(&status, session_id, &code).await,
            CodeKind::Artifact => self.artifact_step(&status, session_id, &code).await,
        }
    }

    async fn identity_step(
        &mut self,
        status: &ScanStatus,
        session_id: SessionId,
        code: &ScanCode,
    ) -> ScanResult<ScanAccepted> {
        let participant = self
            .participants
            .find_by_code(code.as_str())
            .await?
            .ok_or_else(|| ScanError::not_found("Participant", code))?;

        if !self
            .eligibility
            .is_eligible(participant.id, session_id)
            .await?
        {
            if self.policy.is_enforced() {
                return Err(ScanError::Ineligible {
                    participant: participant.id,
                    session: session_id,
                });
            }
            warn!(
                session_id,
                participant_id = participant.id,
                code = %code,
                "Participant not registered for session, accepting (advisory policy)"
            );
        }

        let session_name = session_label(status, session_id);
        let issued_code = match &self.issuer {
            Some(issuer) => Some(issuer.issue(&participant.name, &session_name).await?.code),
            None => None,
        };

        let status = self.store.write(ScanStatus::awaiting_artifact(
            session_id,
            &session_name,
            participant.id,
            &participant.name,
        ))?;
        self.machine.transition_to(ScanPhase::AwaitingArtifact)?;

        let second_line = issued_code.as_deref().unwrap_or(DisplayMessages::SCAN_BOOKLET);
        self.display
            .show_feedback(&participant.name, second_line)
            .await;

        Ok(ScanAccepted {
            outcome: ScanOutcome::IdentityVerified {
                participant_id: participant.id,
                participant_name: participant.name,
                issued_code,
            },
            status,
        })
    }

    async fn artifact_step(
        &mut self,
        status: &ScanStatus,
        session_id: SessionId,
        code: &ScanCode,
    ) -> ScanResult<ScanAccepted> {
        let session_name = session_label(status, session_id);

        let Some((participant_id, participant_name)) = status.verified_participant() else {
            self.store
                .write(ScanStatus::awaiting_identity(session_id, &session_name))?;
            self.machine.transition_to(ScanPhase::AwaitingIdentity)?;
            return Err(ScanError::StateInconsistent(
                "artifact expected but no verified identity".to_string(),
            ));
        };
        let participant_name = participant_name.to_string();

        let record_id = self
            .record_artifact(session_id, participant_id, code.as_str())
            .await?;

        let status = match self
            .store
            .write(ScanStatus::awaiting_identity(session_id, &session_name))
        {
            Ok(status) => status,
            Err(e) => {
                error!(session_id, record_id, error = %e, "Record committed but status store not advanced");
                return Err(e.into());
            }
        };
        self.machine.transition_to(ScanPhase::AwaitingIdentity)?;

        self.display
            .show_feedback(DisplayMessages::RECORDED, &participant_name)
            .await;

        Ok(ScanAccepted {
            outcome: ScanOutcome::ArtifactRecorded {
                record_id,
                participant_id,
                participant_name,
                artifact_code: code.to_string(),
            },
            status,
        })
    }

    /// Duplicate check and insert in one transaction.
    async fn record_artifact(
        &self,
        session_id: SessionId,
        participant_id: ParticipantId,
        code: &str,
    ) -> ScanResult<i64> {
        let mut tx = self.database.pool().begin().await?;

        if let Some(claim) = transaction::find_claim(&mut tx, session_id, code).await? {
            return Err(ScanError::Duplicate {
                code: code.to_string(),
                claimant_id: claim.participant_id,
                claimant_name: claim.participant_name,
            });
        }

        let record = NewScanRecord::now(session_id, participant_id, code);
        let record_id = match transaction::insert_scan_record(&mut tx, &record).await {
            Ok(id) => id,
            Err(e) if e.is_unique_violation() => {
                drop(tx);
                return Err(self.duplicate_after_race(session_id, code, e).await);
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(record_id)
    }

    /// Re-read the winning claim after a lost insert race.
    async fn duplicate_after_race(
        &self,
        session_id: SessionId,
        code: &str,
        insert_error: checkin_storage::StorageError,
    ) -> ScanError {
        match self.records.find_claim(session_id, code).await {
            Ok(Some(claim)) => ScanError::Duplicate {
                code: code.to_string(),
                claimant_id: claim.participant_id,
                claimant_name: claim.participant_name,
            },
            Ok(None) => ScanError::Persistence(insert_error),
            Err(e) => ScanError::Persistence(e),
        }
    }

    async fn find_session(&self, session_id: SessionId) -> ScanResult<Session> {
        self.sessions
            .find_by_id(session_id)
            .await?
            .ok_or_else(|| ScanError::not_found("Session", session_id))
    }

    /// Realign the machine with a store edited outside the engine.
    fn sync_phase(&mut self, status: &ScanStatus) {
        let stored = ScanPhase::from_expected(status.expected_kind);
        if self.phase() != stored {
            warn!(phase = %self.phase(), stored = %stored, "Phase out of step with status store, following store");
            self.machine.force(stored);
        }
    }

    async fn show_phase(&self, status: &ScanStatus) {
        let session_name = status.session_name.as_deref().unwrap_or_default();
        match (status.expected_kind, status.verified_participant()) {
            (ExpectedKind::Artifact, Some((_, name))) => {
                self.display
                    .show_feedback(name, DisplayMessages::SCAN_BOOKLET)
                    .await;
            }
            (ExpectedKind::Identity, _) => {
                self.display
                    .show_feedback(session_name, DisplayMessages::SCAN_ID_CARD)
                    .await;
            }
            _ => self.display.show_idle().await,
        }
    }

    async fn show_rejection(&self, error: &ScanError) {
        match error {
            ScanError::NotFound { value, .. } => {
                self.display
                    .show_feedback(DisplayMessages::ID_NOT_FOUND, value)
                    .await;
            }
            ScanError::Ineligible { .. } => {
                self.display
                    .show_feedback(DisplayMessages::NOT_ELIGIBLE, DisplayMessages::SCAN_ID_CARD)
                    .await;
            }
            ScanError::Duplicate { claimant_name, .. } => {
                self.display
                    .show_feedback(DisplayMessages::DUPLICATE, claimant_name)
                    .await;
            }
            ScanError::StateInconsistent(_) => {
                self.display
                    .show_feedback(DisplayMessages::STATE_LOST, DisplayMessages::RESCAN_ID)
                    .await;
            }
            ScanError::Persistence(_) => {
                self.display
                    .show_feedback(DisplayMessages::SAVE_FAILED, DisplayMessages::TRY_AGAIN)
                    .await;
            }
            ScanError::ArtifactUnavailable(_) => {
                self.display
                    .show_feedback(DisplayMessages::PRINT_FAILED, DisplayMessages::TRY_AGAIN)
                    .await;
            }
            ScanError::KindMismatch { expected, .. } => {
                let hint = match expected {
                    ExpectedKind::Artifact => DisplayMessages::SCAN_BOOKLET,
                    _ => DisplayMessages::SCAN_ID_CARD,
                };
                self.display
                    .show_feedback(DisplayMessages::WRONG_SCAN, hint)
                    .await;
            }
            ScanError::SessionMismatch { .. }
            | ScanError::NoActiveSession
            | ScanError::SessionAlreadyActive { .. }
            | ScanError::InvalidCode(_) => {}
        }
    }
}

fn session_label(status: &ScanStatus, session_id: SessionId) -> String {
    status
        .session_name
        .clone()
        .unwrap_or_else(|| format!("Session {session_id}"))
}
