//! Transaction-aware operations for the check-in write path.
//!
//! A booklet scan is recorded with a duplicate check and an insert in one
//! SQLite transaction. Dropping the transaction without `commit()` rolls both
//! back.
//!
//! ```no_run
//! use checkin_storage::{Database, transaction};
//! use checkin_storage::models::NewScanRecord;
//!
//! # async fn example(db: Database) -> Result<(), Box<dyn std::error::Error>> {
//! let mut tx = db.pool().begin().await?;
//!
//! if transaction::find_claim(&mut tx, 1, "BK001").await?.is_none() {
//!     transaction::insert_scan_record(&mut tx, &NewScanRecord::now(1, 42, "BK001")).await?;
//! }
//!
//! tx.commit().await?;
//! # Ok(())
//! # }
//! ```

use checkin_core::{SessionId, SessionStatus};
use sqlx::{Sqlite, Transaction};

use crate::error::{StorageError, StorageResult};
use crate::models::{NewScanRecord, ScanClaim};
use crate::repositories::scan_record::FIND_CLAIM_SQL;

/// Existing claim on `artifact_code` in a session, read inside the transaction.
pub async fn find_claim(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: SessionId,
    artifact_code: &str,
) -> StorageResult<Option<ScanClaim>> {
    let claim = sqlx::query_as::<_, ScanClaim>(FIND_CLAIM_SQL)
        .bind(session_id)
        .bind(artifact_code)
        .fetch_optional(&mut **tx)
        .await?;

    Ok(claim)
}

/// Insert a check-in record.
///
/// # Errors
///
/// Returns error if:
/// - the (session, artifact code) pair already exists (unique violation)
/// - the session or participant does not exist (foreign key)
pub async fn insert_scan_record(
    tx: &mut Transaction<'_, Sqlite>,
    record: &NewScanRecord,
) -> StorageResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO scan_records (session_id, participant_id, artifact_code, scanned_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(record.session_id)
    .bind(record.participant_id)
    .bind(&record.artifact_code)
    .bind(record.scanned_at)
    .execute(&mut **tx)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Change a session's status inside a transaction.
pub async fn set_session_status(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: SessionId,
    status: SessionStatus,
) -> StorageResult<()> {
    let result = sqlx::query("UPDATE sessions SET status = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(session_id)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(StorageError::SessionNotFound(session_id));
    }

    Ok(())
}
