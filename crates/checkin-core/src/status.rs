//! File-backed Status Store shared by the listener and the engine.
//!
//! The store holds exactly one [`ScanStatus`] record: which session is
//! accepting check-ins and which kind of code the kiosk expects next. The
//! engine is the only writer; the listener reads it fresh before every
//! submission.
//!
//! # Durability
//!
//! Every write replaces the whole file atomically: the record is written to a
//! temporary file in the same directory and renamed over the target, so a
//! reader never observes a half-written record.
//!
//! # Self-healing
//!
//! [`StatusStore::read`] never fails. A missing, unreadable or corrupt file
//! yields the inactive default, which is written back so the next reader finds
//! a valid record.
//!
//! # Examples
//!
//! ```
//! use checkin_core::{ExpectedKind, ScanStatus, StatusStore};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = StatusStore::new(dir.path().join("scan_status.json"));
//!
//! // First read on a fresh install heals to the inactive default
//! assert_eq!(store.read().expected_kind, ExpectedKind::None);
//!
//! store.write(ScanStatus::awaiting_identity(7, "Physics 101")).unwrap();
//! assert_eq!(store.read().active_session_id, Some(7));
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::{ExpectedKind, ParticipantId, SessionId};
use crate::{Error, Result};

/// The single shared state token of the kiosk.
///
/// Missing keys deserialize to their defaults, so an older or hand-edited file
/// still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanStatus {
    /// Session currently accepting check-ins.
    pub active_session_id: Option<SessionId>,

    /// Display name of the active session.
    pub session_name: Option<String>,

    /// Kind of code the next scan must be.
    pub expected_kind: ExpectedKind,

    /// Participant verified by the last identity scan, awaiting an artifact.
    pub verified_participant_id: Option<ParticipantId>,

    /// Display name of the verified participant.
    pub verified_participant_name: Option<String>,

    /// When the record was last written. `null` in a hand-made file.
    pub status_timestamp: Option<DateTime<Utc>>,
}

impl Default for ScanStatus {
    fn default() -> Self {
        Self::inactive()
    }
}

impl ScanStatus {
    /// The inactive record: no session, nothing expected.
    pub fn inactive() -> Self {
        Self {
            active_session_id: None,
            session_name: None,
            expected_kind: ExpectedKind::None,
            verified_participant_id: None,
            verified_participant_name: None,
            status_timestamp: Some(Utc::now()),
        }
    }

    /// Session armed and waiting for a participant identity code.
    pub fn awaiting_identity(session_id: SessionId, session_name: impl Into<String>) -> Self {
        Self {
            active_session_id: Some(session_id),
            session_name: Some(session_name.into()),
            expected_kind: ExpectedKind::Identity,
            ..Self::inactive()
        }
    }

    /// Identity verified, waiting for the participant's artifact code.
    pub fn awaiting_artifact(
        session_id: SessionId,
        session_name: impl Into<String>,
        participant_id: ParticipantId,
        participant_name: impl Into<String>,
    ) -> Self {
        Self {
            active_session_id: Some(session_id),
            session_name: Some(session_name.into()),
            expected_kind: ExpectedKind::Artifact,
            verified_participant_id: Some(participant_id),
            verified_participant_name: Some(participant_name.into()),
            status_timestamp: Some(Utc::now()),
        }
    }

    /// Returns `true` if a session is armed and some code kind is expected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active_session_id.is_some() && self.expected_kind != ExpectedKind::None
    }

    /// Verified participant, if both id and name are present.
    #[must_use]
    pub fn verified_participant(&self) -> Option<(ParticipantId, &str)> {
        match (self.verified_participant_id, &self.verified_participant_name) {
            (Some(id), Some(name)) => Some((id, name.as_str())),
            _ => None,
        }
    }
}

/// Handle to the Status Store file.
///
/// Cheap to clone; it only carries the path.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current record, healing the file if needed.
    ///
    /// Never fails: on any read or parse problem the inactive default is
    /// returned and written back. A failed write-back is only logged.
    pub fn read(&self) -> ScanStatus {
        match self.try_read() {
            Ok(status) => status,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Status store unreadable, resetting to inactive");
                match self.clear() {
                    Ok(status) => status,
                    Err(write_err) => {
                        warn!(path = %self.path.display(), error = %write_err, "Failed to re-persist inactive status");
                        ScanStatus::inactive()
                    }
                }
            }
        }
    }

    /// Replace the record, stamping a fresh timestamp.
    ///
    /// Returns the record as written.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the temporary
    /// file cannot be written or renamed into place.
    pub fn write(&self, mut status: ScanStatus) -> Result<ScanStatus> {
        status.status_timestamp = Some(Utc::now());
        let json = serde_json::to_vec_pretty(&status)?;
        self.replace_file(&json)?;

        debug!(
            path = %self.path.display(),
            session_id = ?status.active_session_id,
            expected_kind = %status.expected_kind,
            "Status store written"
        );
        Ok(status)
    }

    /// Reset to the inactive default.
    ///
    /// # Errors
    ///
    /// Same as [`StatusStore::write`].
    pub fn clear(&self) -> Result<ScanStatus> {
        self.write(ScanStatus::inactive())
    }

    /// Create the file with the inactive default if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Same as [`StatusStore::write`].
    pub fn ensure_exists(&self) -> Result<()> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Creating initial status file");
            self.clear()?;
        }
        Ok(())
    }

    fn try_read(&self) -> Result<ScanStatus> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn replace_file(&self, contents: &[u8]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| self.store_error(&e.error))?;
        Ok(())
    }

    fn store_error(&self, e: &io::Error) -> Error {
        Error::StatusStore {
            path: self.path.display().to_string(),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, StatusStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("scan_status.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_heals_to_inactive() {
        let (_dir, store) = temp_store();
        assert!(!store.path().exists());

        let status = store.read();
        assert!(!status.is_active());
        assert_eq!(status.expected_kind, ExpectedKind::None);
        assert!(store.path().exists(), "default should be re-persisted");
    }

    #[test]
    fn test_corrupt_file_heals_to_inactive() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{ not json").unwrap();

        let status = store.read();
        assert_eq!(status.active_session_id, None);

        let on_disk: ScanStatus =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(on_disk.expected_kind, ExpectedKind::None);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            r#"{"active_session_id": 3, "expected_kind": "identity"}"#,
        )
        .unwrap();

        let status = store.read();
        assert_eq!(status.active_session_id, Some(3));
        assert_eq!(status.expected_kind, ExpectedKind::Identity);
        assert_eq!(status.verified_participant_id, None);
    }

    #[test]
    fn test_null_timestamp_keeps_armed_session() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            r#"{
                "active_session_id": 3,
                "session_name": "Maths",
                "expected_kind": "identity",
                "verified_participant_id": null,
                "verified_participant_name": null,
                "status_timestamp": null
            }"#,
        )
        .unwrap();

        let status = store.read();
        assert_eq!(status.active_session_id, Some(3));
        assert_eq!(status.expected_kind, ExpectedKind::Identity);
        assert_eq!(status.status_timestamp, None);
        assert!(status.is_active());

        let written = store.write(status).unwrap();
        assert!(written.status_timestamp.is_some());
    }

    #[test]
    fn test_write_stamps_fresh_timestamp() {
        let (_dir, store) = temp_store();
        let mut status = ScanStatus::awaiting_identity(1, "Maths");
        status.status_timestamp = DateTime::<Utc>::from_timestamp(0, 0);

        let written = store.write(status).unwrap();
        assert!(written.status_timestamp > DateTime::<Utc>::from_timestamp(0, 0));
        assert_eq!(store.read(), written);
    }

    #[test]
    fn test_round_trip_artifact_state() {
        let (_dir, store) = temp_store();
        store
            .write(ScanStatus::awaiting_artifact(2, "Chemistry", 42, "Ada Lovelace"))
            .unwrap();

        let status = store.read();
        assert_eq!(status.expected_kind, ExpectedKind::Artifact);
        assert_eq!(status.verified_participant(), Some((42, "Ada Lovelace")));
    }

    #[test]
    fn test_clear_resets_everything() {
        let (_dir, store) = temp_store();
        store
            .write(ScanStatus::awaiting_artifact(2, "Chemistry", 42, "Ada"))
            .unwrap();

        store.clear().unwrap();
        let status = store.read();
        assert_eq!(status.active_session_id, None);
        assert_eq!(status.session_name, None);
        assert_eq!(status.verified_participant(), None);
    }

    #[test]
    fn test_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = StatusStore::new(dir.path().join("run/kiosk/scan_status.json"));
        store.write(ScanStatus::awaiting_identity(5, "Biology")).unwrap();
        assert_eq!(store.read().active_session_id, Some(5));
    }

    #[test]
    fn test_ensure_exists_keeps_existing_record() {
        let (_dir, store) = temp_store();
        store.write(ScanStatus::awaiting_identity(9, "History")).unwrap();

        store.ensure_exists().unwrap();
        assert_eq!(store.read().active_session_id, Some(9));
    }

    #[test]
    fn test_is_active_requires_kind() {
        let mut status = ScanStatus::awaiting_identity(1, "Art");
        assert!(status.is_active());
        status.expected_kind = ExpectedKind::None;
        assert!(!status.is_active());
        assert!(!ScanStatus::inactive().is_active());
    }

    #[test]
    fn test_wire_schema_field_names() {
        let json = serde_json::to_value(ScanStatus::awaiting_identity(1, "Art")).unwrap();
        for key in [
            "active_session_id",
            "session_name",
            "expected_kind",
            "verified_participant_id",
            "verified_participant_name",
            "status_timestamp",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(json["expected_kind"], "identity");
    }
}
