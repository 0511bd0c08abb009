//! Integration tests for the schema, repositories and transactions.
//!
//! Run with: cargo test --package checkin-storage --test integration_database

use std::sync::Arc;

use checkin_core::SessionStatus;
use checkin_storage::models::{NewParticipant, NewScanRecord};
use checkin_storage::repositories::{
    ParticipantRepository, ScanRecordRepository, SessionRepository, SqliteParticipantRepository,
    SqliteScanRecordRepository, SqliteSessionRepository,
};
use checkin_storage::{Database, transaction};
use tokio::sync::Barrier;

async fn seeded() -> (Database, i64, i64, i64) {
    let db = Database::in_memory().await.unwrap();
    let sessions = SqliteSessionRepository::new(db.pool().clone());
    let participants = SqliteParticipantRepository::new(db.pool().clone());

    let session = sessions.create("Physics 101 Final").await.unwrap();
    let ada = participants
        .create(&NewParticipant::new("Ada Lovelace", "S100"))
        .await
        .unwrap();
    let grace = participants
        .create(&NewParticipant::new("Grace Hopper", "S200"))
        .await
        .unwrap();

    (db, session, ada, grace)
}

#[tokio::test]
async fn test_in_memory_database() {
    let db = Database::in_memory().await.unwrap();
    db.health_check().await.unwrap();
    db.close().await;
}

#[tokio::test]
async fn test_migration_idempotency() {
    let db = Database::in_memory().await.unwrap();
    db.migrate().await.unwrap();
    db.migrate().await.unwrap();

    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' \
         AND name IN ('sessions', 'participants', 'eligibility', 'scan_records')",
    )
    .fetch_one(db.pool())
    .await
    .unwrap();

    assert_eq!(count, 4);
}

#[tokio::test]
async fn test_committed_record_is_visible_with_claimant() {
    let (db, session, ada, _) = seeded().await;

    let mut tx = db.pool().begin().await.unwrap();
    assert!(
        transaction::find_claim(&mut tx, session, "BK001")
            .await
            .unwrap()
            .is_none()
    );
    transaction::insert_scan_record(&mut tx, &NewScanRecord::now(session, ada, "BK001"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let records = SqliteScanRecordRepository::new(db.pool().clone());
    let claim = records.find_claim(session, "BK001").await.unwrap().unwrap();
    assert_eq!(claim.participant_id, ada);
    assert_eq!(claim.participant_name, "Ada Lovelace");
    assert_eq!(records.count_by_session(session).await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicate_artifact_code_rejected_per_session() {
    let (db, session, ada, grace) = seeded().await;

    let mut tx = db.pool().begin().await.unwrap();
    transaction::insert_scan_record(&mut tx, &NewScanRecord::now(session, ada, "BK001"))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = db.pool().begin().await.unwrap();
    let err = transaction::insert_scan_record(&mut tx, &NewScanRecord::now(session, grace, "BK001"))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    drop(tx);

    // Same code in another session is a different claim.
    let other = SqliteSessionRepository::new(db.pool().clone())
        .create("Chemistry")
        .await
        .unwrap();
    let mut tx = db.pool().begin().await.unwrap();
    transaction::insert_scan_record(&mut tx, &NewScanRecord::now(other, grace, "BK001"))
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let (db, session, ada, _) = seeded().await;

    {
        let mut tx = db.pool().begin().await.unwrap();
        transaction::insert_scan_record(&mut tx, &NewScanRecord::now(session, ada, "BK009"))
            .await
            .unwrap();
        // dropped without commit
    }

    let records = SqliteScanRecordRepository::new(db.pool().clone());
    assert_eq!(records.count_by_session(session).await.unwrap(), 0);
}

#[tokio::test]
async fn test_record_requires_known_participant() {
    let (db, session, _, _) = seeded().await;

    let mut tx = db.pool().begin().await.unwrap();
    let result =
        transaction::insert_scan_record(&mut tx, &NewScanRecord::now(session, 9999, "BK001")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_single_active_session_in_transaction() {
    let (db, first, _, _) = seeded().await;
    let sessions = SqliteSessionRepository::new(db.pool().clone());
    let second = sessions.create("Afternoon").await.unwrap();

    let mut tx = db.pool().begin().await.unwrap();
    transaction::set_session_status(&mut tx, first, SessionStatus::AuthenticationActive)
        .await
        .unwrap();
    let err = transaction::set_session_status(&mut tx, second, SessionStatus::AuthenticationActive)
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());
    tx.commit().await.unwrap();

    assert_eq!(sessions.find_active().await.unwrap().unwrap().id, first);
}

#[tokio::test]
async fn test_concurrent_reads() {
    let (db, _, _, _) = seeded().await;

    const NUM_CONCURRENT_TASKS: usize = 8;
    let barrier = Arc::new(Barrier::new(NUM_CONCURRENT_TASKS));

    let handles: Vec<_> = (0..NUM_CONCURRENT_TASKS)
        .map(|_| {
            let db = db.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                SqliteParticipantRepository::new(db.pool().clone())
                    .find_by_code("S200")
                    .await
                    .unwrap()
                    .map(|p| p.name)
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        assert_eq!(result.unwrap().as_deref(), Some("Grace Hopper"));
    }
}
