use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Code and kind validation
    #[error("Invalid scan code: {0}")]
    InvalidCode(String),

    #[error("Invalid code kind: {0}")]
    InvalidKind(String),

    #[error("Invalid session status: {0}")]
    InvalidSessionStatus(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Status store errors
    #[error("Status store error at {path}: {message}")]
    StatusStore { path: String, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Wire-level classification of a rejected control-plane request.
///
/// Every failure the engine or the control plane reports maps onto exactly
/// one of these, serialized in snake_case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Ineligible,
    Duplicate,
    StateInconsistent,
    PersistenceFailure,
    HardwareUnavailable,
    KindMismatch,
    SessionMismatch,
    NoActiveSession,
    SessionAlreadyActive,
    ArtifactUnavailable,
    InvalidRequest,
    Forbidden,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Ineligible => "ineligible",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::StateInconsistent => "state_inconsistent",
            ErrorKind::PersistenceFailure => "persistence_failure",
            ErrorKind::HardwareUnavailable => "hardware_unavailable",
            ErrorKind::KindMismatch => "kind_mismatch",
            ErrorKind::SessionMismatch => "session_mismatch",
            ErrorKind::NoActiveSession => "no_active_session",
            ErrorKind::SessionAlreadyActive => "session_already_active",
            ErrorKind::ArtifactUnavailable => "artifact_unavailable",
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::Forbidden => "forbidden",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
