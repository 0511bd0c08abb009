use chrono::{DateTime, Utc};
use checkin_core::ParticipantId;
use serde::{Deserialize, Serialize};

/// A person who may check in, identified at the kiosk by `external_code`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    /// Code printed on the participant's ID card. Unique.
    pub external_code: String,
    /// Course or category the participant belongs to.
    pub group_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to register a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub name: String,
    pub external_code: String,
    pub group_name: Option<String>,
}

impl NewParticipant {
    pub fn new(name: impl Into<String>, external_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_code: external_code.into(),
            group_name: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group_name = Some(group.into());
        self
    }
}
