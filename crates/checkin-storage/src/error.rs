use checkin_core::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// An update addressed a session id that does not exist.
    #[error("Session {0} not found")]
    SessionNotFound(SessionId),

    /// A stored value does not decode into its domain type.
    #[error("Invalid value in {column}: {message}")]
    InvalidColumn {
        column: &'static str,
        message: String,
    },

    #[error("Cannot open database {path}: {message}")]
    Open { path: String, message: String },

    /// Status Store write failed alongside a database change
    #[error("Status store error: {0}")]
    StatusStore(#[from] checkin_core::Error),
}

impl StorageError {
    /// Returns `true` if a UNIQUE constraint or index rejected the write.
    ///
    /// Both kiosk invariants (one active session, one claim per booklet
    /// code and session) surface as unique violations.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.is_unique_violation(),
            _ => false,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(StorageError::SessionNotFound(7).to_string(), "Session 7 not found");
        let err = StorageError::InvalidColumn {
            column: "sessions.status",
            message: "unknown status archived".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid value in sessions.status: unknown status archived"
        );
        assert!(!err.is_unique_violation());
    }
}
