#![allow(async_fn_in_trait)]

use checkin_core::{SessionId, SessionStatus};
use sqlx::SqlitePool;

use crate::error::{StorageError, StorageResult};
use crate::models::Session;

/// Repository trait for Session entity operations
pub trait SessionRepository: Send + Sync {
    async fn find_by_id(&self, id: SessionId) -> StorageResult<Option<Session>>;

    /// The session currently accepting check-ins, if any.
    async fn find_active(&self) -> StorageResult<Option<Session>>;

    async fn find_all(&self) -> StorageResult<Vec<Session>>;

    /// Create a pending session.
    async fn create(&self, name: &str) -> StorageResult<SessionId>;

    /// Change a session's status.
    ///
    /// Activating while another session is active is rejected by the
    /// single-active index and surfaces as a unique violation.
    async fn set_status(&self, id: SessionId, status: SessionStatus) -> StorageResult<()>;
}

/// SQLite implementation of SessionRepository
pub struct SqliteSessionRepository {
    pool: SqlitePool,
}

impl SqliteSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl SessionRepository for SqliteSessionRepository {
    async fn find_by_id(&self, id: SessionId) -> StorageResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, name, status, created_at, updated_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_active(&self) -> StorageResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, name, status, created_at, updated_at
            FROM sessions
            WHERE status = ?
            "#,
        )
        .bind(SessionStatus::AuthenticationActive.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    async fn find_all(&self) -> StorageResult<Vec<Session>> {
        let sessions = sqlx::query_as::<_, Session>(
            r#"
            SELECT id, name, status, created_at, updated_at
            FROM sessions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    async fn create(&self, name: &str) -> StorageResult<SessionId> {
        let result = sqlx::query("INSERT INTO sessions (name, status) VALUES (?, ?)")
            .bind(name)
            .bind(SessionStatus::Pending.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.last_insert_rowid())
    }

    async fn set_status(&self, id: SessionId, status: SessionStatus) -> StorageResult<()> {
        let result = sqlx::query("UPDATE sessions SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::SessionNotFound(id));
        }

        Ok(())
    }
}
