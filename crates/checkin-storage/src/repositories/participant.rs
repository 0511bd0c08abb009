#![allow(async_fn_in_trait)]

use checkin_core::ParticipantId;
use sqlx::SqlitePool;

use crate::error::StorageResult;
use crate::models::{NewParticipant, Participant};

/// Repository trait for Participant entity operations
///
/// The kiosk only reads participants; `create` exists for seeding.
pub trait ParticipantRepository: Send + Sync {
    /// Find a participant by the code on their ID card
    async fn find_by_code(&self, external_code: &str) -> StorageResult<Option<Participant>>;

    async fn find_by_id(&self, id: ParticipantId) -> StorageResult<Option<Participant>>;

    async fn create(&self, participant: &NewParticipant) -> StorageResult<ParticipantId>;
}

/// SQLite implementation of ParticipantRepository
pub struct SqliteParticipantRepository {
    pool: SqlitePool,
}

impl SqliteParticipantRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ParticipantRepository for SqliteParticipantRepository {
    async fn find_by_code(&self, external_code: &str) -> StorageResult<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT id, name, external_code, group_name, created_at
            FROM participants
            WHERE external_code = ?
            "#,
        )
        .bind(external_code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn find_by_id(&self, id: ParticipantId) -> StorageResult<Option<Participant>> {
        let participant = sqlx::query_as::<_, Participant>(
            r#"
            SELECT id, name, external_code, group_name, created_at
            FROM participants
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(participant)
    }

    async fn create(&self, participant: &NewParticipant) -> StorageResult<ParticipantId> {
        let result = sqlx::query(
            r#"
            INSERT INTO participants (name, external_code, group_name)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(&participant.name)
        .bind(&participant.external_code)
        .bind(&participant.group_name)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::Database;

    #[tokio::test]
    async fn test_find_by_code() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteParticipantRepository::new(db.pool().clone());

        let id = repo
            .create(&NewParticipant::new("Ada Lovelace", "S100").with_group("Mathematics"))
            .await
            .unwrap();

        let found = repo.find_by_code("S100").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.group_name.as_deref(), Some("Mathematics"));
        assert!(repo.find_by_code("ZZZZZ").await.unwrap().is_none());
        assert_eq!(repo.find_by_id(id).await.unwrap().unwrap().name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_external_code_is_unique() {
        let db = Database::in_memory().await.unwrap();
        let repo = SqliteParticipantRepository::new(db.pool().clone());

        repo.create(&NewParticipant::new("Ada", "S100")).await.unwrap();
        let err = repo
            .create(&NewParticipant::new("Impostor", "S100"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }
}
