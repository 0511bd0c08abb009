use chrono::{DateTime, Utc};
use checkin_core::{SessionId, SessionStatus};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// An exam session.
///
/// `status` holds the text stored in the database; use [`Session::status`]
/// for the typed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: SessionId,
    pub name: String,
    #[sqlx(rename = "status")]
    pub status_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Typed session status.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidColumn`] for a value outside the
    /// schema's CHECK constraint.
    pub fn status(&self) -> StorageResult<SessionStatus> {
        self.status_text
            .parse()
            .map_err(|e: checkin_core::Error| StorageError::InvalidColumn {
                column: "sessions.status",
                message: e.to_string(),
            })
    }

    /// Returns `true` if the session is accepting check-ins.
    pub fn is_active(&self) -> bool {
        self.status().is_ok_and(SessionStatus::is_active)
    }
}
