//! Integration tests for the transcription job registry.
//!
//! This test suite validates:
//! - Job creation starts in pending with no transcript or error
//! - pending -> processing -> done happy path
//! - Terminal jobs reject further transitions
//! - mark_processing requires pending
//! - find_by_resource returns the most recent job
//! - delete_for_resource removes every job for an item
//!
//! **IMPORTANT**: These tests require a reachable PostgreSQL server. The
//! fixture creates its own schema and applies the DDL itself.

use tabula_db::test_fixtures::TestDatabase;
use tabula_db::{BoardItem, Error, ItemKind, ItemRepository, JobRegistry, JobStatus};
use uuid::Uuid;

/// Load `.env` so `DATABASE_URL` can point the fixture at a local server.
async fn get_test_db() -> TestDatabase {
    dotenvy::dotenv().ok();
    TestDatabase::new().await
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_job_lifecycle_happy_path() {
    let test_db = get_test_db().await;
    let board_id = Uuid::now_v7();

    let item = BoardItem::new(board_id, ItemKind::Youtube);
    test_db.db.items.insert(&item).await.unwrap();

    let job = test_db.db.jobs.create(item.id).await.expect("Failed to create job");
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.transcription.is_none());
    assert!(job.error.is_none());

    let processing = test_db
        .db
        .jobs
        .mark_processing(job.id)
        .await
        .expect("pending -> processing");
    assert_eq!(processing.status, JobStatus::Processing);

    let done = test_db
        .db
        .jobs
        .mark_done(job.id, "Full transcript text.")
        .await
        .expect("processing -> done");
    assert_eq!(done.status, JobStatus::Done);
    assert_eq!(done.transcription.as_deref(), Some("Full transcript text."));
    assert!(done.has_transcript());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_terminal_job_rejects_transitions() {
    let test_db = get_test_db().await;
    let board_id = Uuid::now_v7();

    let item = BoardItem::new(board_id, ItemKind::Tiktok);
    test_db.db.items.insert(&item).await.unwrap();

    let job = test_db.db.jobs.create(item.id).await.unwrap();
    test_db.db.jobs.mark_processing(job.id).await.unwrap();
    test_db.db.jobs.mark_failed(job.id, "download timed out").await.unwrap();

    // Failed is terminal: no way back to processing or on to done
    assert!(matches!(
        test_db.db.jobs.mark_processing(job.id).await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        test_db.db.jobs.mark_done(job.id, "late transcript").await,
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        test_db.db.jobs.mark_failed(job.id, "again").await,
        Err(Error::InvalidInput(_))
    ));

    let current = test_db.db.jobs.get(job.id).await.unwrap();
    assert_eq!(current.status, JobStatus::Failed);
    assert_eq!(current.error.as_deref(), Some("download timed out"));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_mark_processing_requires_pending() {
    let test_db = get_test_db().await;
    let board_id = Uuid::now_v7();

    let item = BoardItem::new(board_id, ItemKind::Instagram);
    test_db.db.items.insert(&item).await.unwrap();

    let job = test_db.db.jobs.create(item.id).await.unwrap();
    test_db.db.jobs.mark_processing(job.id).await.unwrap();

    // Already processing
    assert!(matches!(
        test_db.db.jobs.mark_processing(job.id).await,
        Err(Error::InvalidInput(_))
    ));

    // Missing job is a different failure
    assert!(matches!(
        test_db.db.jobs.mark_processing(Uuid::now_v7()).await,
        Err(Error::JobNotFound(_))
    ));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_find_by_resource_returns_latest() {
    let test_db = get_test_db().await;
    let board_id = Uuid::now_v7();

    let item = BoardItem::new(board_id, ItemKind::Youtube);
    test_db.db.items.insert(&item).await.unwrap();

    let first = test_db.db.jobs.create(item.id).await.unwrap();
    test_db.db.jobs.mark_processing(first.id).await.unwrap();
    test_db.db.jobs.mark_failed(first.id, "flaky network").await.unwrap();

    // Retry produces a second job for the same resource
    let second = test_db.db.jobs.create(item.id).await.unwrap();

    let found = test_db
        .db
        .jobs
        .find_by_resource(item.id)
        .await
        .unwrap()
        .expect("A job exists for the item");
    assert_eq!(found.id, second.id);
    assert_eq!(found.status, JobStatus::Pending);

    assert!(test_db
        .db
        .jobs
        .find_by_resource(Uuid::now_v7())
        .await
        .unwrap()
        .is_none());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires DATABASE_URL with a reachable PostgreSQL server
async fn test_delete_for_resource_removes_all_jobs() {
    let test_db = get_test_db().await;
    let board_id = Uuid::now_v7();

    let item = BoardItem::new(board_id, ItemKind::Url);
    test_db.db.items.insert(&item).await.unwrap();

    test_db.db.jobs.create(item.id).await.unwrap();
    test_db.db.jobs.create(item.id).await.unwrap();

    let removed = test_db.db.jobs.delete_for_resource(item.id).await.unwrap();
    assert_eq!(removed, 2);
    assert!(test_db.db.jobs.find_by_resource(item.id).await.unwrap().is_none());

    // Idempotent on a resource with no jobs
    let removed_again = test_db.db.jobs.delete_for_resource(item.id).await.unwrap();
    assert_eq!(removed_again, 0);

    test_db.cleanup().await;
}
