use checkin_core::{CodeKind, ErrorKind, ExpectedKind, ParticipantId, SessionId};
use checkin_storage::StorageError;
use thiserror::Error;

use crate::issuer::IssueError;

/// Reasons a scan or a session command is rejected.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("{entity} not found: {value}")]
    NotFound { entity: &'static str, value: String },

    #[error("Participant {participant} is not registered for session {session}")]
    Ineligible {
        participant: ParticipantId,
        session: SessionId,
    },

    #[error("Code {code} already recorded for {claimant_name} (participant {claimant_id})")]
    Duplicate {
        code: String,
        claimant_id: ParticipantId,
        claimant_name: String,
    },

    #[error("Scan state inconsistent: {0}")]
    StateInconsistent(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Expected {expected} scan, got {got}")]
    KindMismatch { expected: ExpectedKind, got: CodeKind },

    #[error("Scan for session {got} but session {expected} is active")]
    SessionMismatch { expected: SessionId, got: SessionId },

    #[error("No session is accepting scans")]
    NoActiveSession,

    #[error("Session {active_id} is already active")]
    SessionAlreadyActive { active_id: SessionId },

    #[error("Artifact unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("Invalid code: {0}")]
    InvalidCode(String),
}

impl ScanError {
    pub fn not_found(entity: &'static str, value: impl ToString) -> Self {
        Self::NotFound {
            entity,
            value: value.to_string(),
        }
    }

    /// Wire classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::NotFound { .. } => ErrorKind::NotFound,
            ScanError::Ineligible { .. } => ErrorKind::Ineligible,
            ScanError::Duplicate { .. } => ErrorKind::Duplicate,
            ScanError::StateInconsistent(_) => ErrorKind::StateInconsistent,
            ScanError::Persistence(_) => ErrorKind::PersistenceFailure,
            ScanError::KindMismatch { .. } => ErrorKind::KindMismatch,
            ScanError::SessionMismatch { .. } => ErrorKind::SessionMismatch,
            ScanError::NoActiveSession => ErrorKind::NoActiveSession,
            ScanError::SessionAlreadyActive { .. } => ErrorKind::SessionAlreadyActive,
            ScanError::ArtifactUnavailable(_) => ErrorKind::ArtifactUnavailable,
            ScanError::InvalidCode(_) => ErrorKind::InvalidRequest,
        }
    }
}

impl From<checkin_core::Error> for ScanError {
    fn from(e: checkin_core::Error) -> Self {
        match e {
            checkin_core::Error::InvalidCode(msg) => ScanError::InvalidCode(msg),
            checkin_core::Error::InvalidStateTransition { from, to } => {
                ScanError::StateInconsistent(format!("invalid transition {from} -> {to}"))
            }
            other => ScanError::Persistence(StorageError::StatusStore(other)),
        }
    }
}

impl From<sqlx::Error> for ScanError {
    fn from(e: sqlx::Error) -> Self {
        ScanError::Persistence(StorageError::Database(e))
    }
}

impl From<IssueError> for ScanError {
    fn from(e: IssueError) -> Self {
        ScanError::ArtifactUnavailable(e.to_string())
    }
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;
