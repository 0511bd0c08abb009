use chrono::{DateTime, Utc};
use checkin_core::{ParticipantId, SessionId};
use serde::{Deserialize, Serialize};

/// One check-in: a booklet code claimed by a participant in a session.
///
/// Records are append-only; nothing in the kiosk updates or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanRecord {
    pub id: i64,
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub artifact_code: String,
    pub scanned_at: DateTime<Utc>,
}

/// A record about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewScanRecord {
    pub session_id: SessionId,
    pub participant_id: ParticipantId,
    pub artifact_code: String,
    pub scanned_at: DateTime<Utc>,
}

impl NewScanRecord {
    /// Record stamped with the current time.
    pub fn now(
        session_id: SessionId,
        participant_id: ParticipantId,
        artifact_code: impl Into<String>,
    ) -> Self {
        Self {
            session_id,
            participant_id,
            artifact_code: artifact_code.into(),
            scanned_at: Utc::now(),
        }
    }
}

/// Existing claim on a booklet code, joined with the claimant's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScanClaim {
    pub record_id: i64,
    pub participant_id: ParticipantId,
    pub participant_name: String,
    pub artifact_code: String,
    pub scanned_at: DateTime<Utc>,
}
