#![allow(async_fn_in_trait)]

use checkin_core::SessionId;
use sqlx::SqlitePool;

use crate::error::StorageResult;
use crate::models::{ScanClaim, ScanRecord};

/// Read access to check-in records.
///
/// Records are written only through [`crate::transaction::insert_scan_record`]
/// so every write happens inside the engine's transaction.
pub trait ScanRecordRepository: Send + Sync {
    /// Existing claim on `artifact_code` in a session, with the claimant's name.
    async fn find_claim(
        &self,
        session_id: SessionId,
        artifact_code: &str,
    ) -> StorageResult<Option<ScanClaim>>;

    /// All records of a session, oldest first.
    async fn find_by_session(&self, session_id: SessionId) -> StorageResult<Vec<ScanRecord>>;

    async fn count_by_session(&self, session_id: SessionId) -> StorageResult<i64>;
}

/// SQLite implementation of ScanRecordRepository
pub struct SqliteScanRecordRepository {
    pool: SqlitePool,
}

impl SqliteScanRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

pub(crate) const FIND_CLAIM_SQL: &str = r#"
    SELECT r.id AS record_id, r.participant_id, p.name AS participant_name,
           r.artifact_code, r.scanned_at
    FROM scan_records r
    JOIN participants p ON p.id = r.participant_id
    WHERE r.session_id = ? AND r.artifact_code = ?
"#;

impl ScanRecordRepository for SqliteScanRecordRepository {
    async fn find_claim(
        &self,
        session_id: SessionId,
        artifact_code: &str,
    ) -> StorageResult<Option<ScanClaim>> {
        let claim = sqlx::query_as::<_, ScanClaim>(FIND_CLAIM_SQL)
            .bind(session_id)
            .bind(artifact_code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(claim)
    }

    async fn find_by_session(&self, session_id: SessionId) -> StorageResult<Vec<ScanRecord>> {
        let records = sqlx::query_as::<_, ScanRecord>(
            r#"
            SELECT id, session_id, participant_id, artifact_code, scanned_at
            FROM scan_records
            WHERE session_id = ?
            ORDER BY id
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn count_by_session(&self, session_id: SessionId) -> StorageResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM scan_records WHERE session_id = ?")
            .bind(session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
