#![allow(async_fn_in_trait)]

use checkin_core::{ParticipantId, SessionId};
use sqlx::SqlitePool;

use crate::error::StorageResult;

/// Repository trait for the participant/session registration relation
pub trait EligibilityRepository: Send + Sync {
    /// Returns `true` if the participant is registered for the session.
    async fn is_eligible(
        &self,
        participant_id: ParticipantId,
        session_id: SessionId,
    ) -> StorageResult<bool>;

    /// Register a participant for a session. Registering twice is a no-op.
    async fn grant(&self, participant_id: ParticipantId, session_id: SessionId)
    -> StorageResult<()>;

    /// Participants registered for a session.
    async fn participants_for_session(&self, session_id: SessionId)
    -> StorageResult<Vec<ParticipantId>>;
}

/// SQLite implementation of EligibilityRepository
pub struct SqliteEligibilityRepository {
    pool: SqlitePool,
}

impl SqliteEligibilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl EligibilityRepository for SqliteEligibilityRepository {
    async fn is_eligible(
        &self,
        participant_id: ParticipantId,
        session_id: SessionId,
    ) -> StorageResult<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM eligibility WHERE participant_id = ? AND session_id = ?",
        )
        .bind(participant_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    async fn grant(
        &self,
        participant_id: ParticipantId,
        session_id: SessionId,
    ) -> StorageResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO eligibility (participant_id, session_id) VALUES (?, ?)",
        )
        .bind(participant_id)
        .bind(session_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn participants_for_session(
        &self,
        session_id: SessionId,
    ) -> StorageResult<Vec<ParticipantId>> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT participant_id FROM eligibility WHERE session_id = ? ORDER BY participant_id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;
    use crate::models::NewParticipant;
    use crate::repositories::{
        ParticipantRepository, SessionRepository, SqliteParticipantRepository,
        SqliteSessionRepository,
    };

    #[tokio::test]
    async fn test_grant_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        let session = SqliteSessionRepository::new(db.pool().clone())
            .create("Biology")
            .await
            .unwrap();
        let participant = SqliteParticipantRepository::new(db.pool().clone())
            .create(&NewParticipant::new("Grace", "S200"))
            .await
            .unwrap();
        let repo = SqliteEligibilityRepository::new(db.pool().clone());

        assert!(!repo.is_eligible(participant, session).await.unwrap());
        repo.grant(participant, session).await.unwrap();
        repo.grant(participant, session).await.unwrap();

        assert!(repo.is_eligible(participant, session).await.unwrap());
        assert_eq!(
            repo.participants_for_session(session).await.unwrap(),
            vec![participant]
        );
    }

    #[tokio::test]
    async fn test_grant_requires_existing_rows() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteEligibilityRepository::new(db.pool().clone());

        assert!(repo.grant(1, 1).await.is_err());
    }
}
