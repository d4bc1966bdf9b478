//! PostgreSQL store tests
//!
//! Each test starts its own `postgres:16-alpine` container. They need Docker, so they are
//! ignored by default:
//!
//! ```bash
//! cargo test -p rowpipe-server --test pg_store_tests -- --ignored
//! ```

mod common;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use common::{customers_csv, init_tracing, TestPostgres, HEADER};
use rowpipe_common::types::{Job, JobError, JobStatus, RowSnapshot};
use rowpipe_server::config::PipelineConfig;
use rowpipe_server::error::StoreError;
use rowpipe_server::ingest::{CustomerRecord, IngestPipeline, ProgressHub, UploadDirSource};
use rowpipe_server::jobs::{
    JobQueue, JobService, JobStore, JobUpdate, PgJobQueue, PgStore, RecordStore, UploadMode,
};
use serial_test::serial;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

fn customer(job_id: Uuid, email: &str) -> CustomerRecord {
    CustomerRecord {
        job_id,
        name: "Test".to_string(),
        email: email.to_string(),
        phone: Some("555".to_string()),
        company: "Acme".to_string(),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_job_round_trip_and_partial_update() -> Result<()> {
    init_tracing();
    let pg = TestPostgres::start().await?;
    let store = PgStore::new(pg.pool().clone());

    let job = Job::pending(Uuid::new_v4(), "people.csv");
    store.create_job(&job).await?;

    let loaded = store.find_job(job.id).await?.expect("job exists");
    assert_eq!(loaded.status, JobStatus::Pending);
    assert_eq!(loaded.filename, "people.csv");
    assert!(loaded.errors.is_empty());

    store
        .update_job(job.id, &JobUpdate::status(JobStatus::Processing))
        .await?;

    let mut row = RowSnapshot::new();
    row.insert("email".to_string(), "bad".to_string());
    let update = JobUpdate {
        processed_rows: Some(3),
        total_rows: Some(3),
        success_count: Some(2),
        failed_count: Some(1),
        errors: Some(vec![JobError::for_row(2, "invalid email", row)]),
        ..JobUpdate::default()
    };
    store.update_job(job.id, &update).await?;

    let loaded = store.find_job(job.id).await?.expect("job exists");
    assert_eq!(loaded.status, JobStatus::Processing);
    assert_eq!(loaded.processed_rows, 3);
    assert_eq!(loaded.errors.len(), 1);
    assert_eq!(loaded.errors[0].field("email"), "bad");
    assert!(loaded.completed_at.is_none());

    info!("Job round trip verified");
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_update_of_unknown_job_is_not_found() -> Result<()> {
    let pg = TestPostgres::start().await?;
    let store = PgStore::new(pg.pool().clone());

    let err = store
        .update_job(Uuid::new_v4(), &JobUpdate::status(JobStatus::Processing))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::JobNotFound(_)));

    let err = store
        .update_job(Uuid::new_v4(), &JobUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::JobNotFound(_)));
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_insert_new_returns_only_inserted_emails() -> Result<()> {
    let pg = TestPostgres::start().await?;
    let store = PgStore::new(pg.pool().clone());

    let first = Job::pending(Uuid::new_v4(), "first.csv");
    let second = Job::pending(Uuid::new_v4(), "second.csv");
    store.create_job(&first).await?;
    store.create_job(&second).await?;

    let inserted = store.insert_new(&[customer(first.id, "a@x.com")]).await?;
    assert_eq!(inserted, HashSet::from(["a@x.com".to_string()]));

    let inserted = store
        .insert_new(&[customer(second.id, "a@x.com"), customer(second.id, "b@x.com")])
        .await?;
    assert_eq!(inserted, HashSet::from(["b@x.com".to_string()]));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
        .fetch_one(pg.pool())
        .await?;
    assert_eq!(count, 2);
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_queue_delivers_oldest_pending_job() -> Result<()> {
    let pg = TestPostgres::start().await?;
    let store = Arc::new(PgStore::new(pg.pool().clone()));

    let mut older = Job::pending(Uuid::new_v4(), "older.csv");
    older.created_at = Utc::now() - ChronoDuration::minutes(5);
    let newer = Job::pending(Uuid::new_v4(), "newer.csv");
    store.create_job(&newer).await?;
    store.create_job(&older).await?;

    let queue = PgJobQueue::new(store.clone(), Duration::from_millis(50));
    assert_eq!(queue.next().await?, Some(older.id));

    store
        .update_job(older.id, &JobUpdate::status(JobStatus::Processing))
        .await?;
    assert_eq!(queue.next().await?, Some(newer.id));

    let listed = store.list_jobs(10).await?;
    assert_eq!(listed.first().map(|j| j.id), Some(newer.id));
    Ok(())
}

#[tokio::test]
#[serial]
#[ignore = "requires Docker"]
async fn test_pipeline_against_postgres() -> Result<()> {
    init_tracing();
    let pg = TestPostgres::start().await?;
    let store = Arc::new(PgStore::new(pg.pool().clone()));
    let dir = tempfile::tempdir()?;
    let uploads = dir.path().join("uploads");

    let queue = Arc::new(PgJobQueue::new(store.clone(), Duration::from_millis(50)));
    let service = JobService::new(store.clone(), queue, &uploads);

    let scratch = dir.path().join("scratch.csv");
    let mut csv = customers_csv(250);
    csv.push_str("Dup,customer1@example.com,,Acme\nBad,nope,,Acme\n");
    std::fs::write(&scratch, csv)?;
    let job = service
        .submit_file(&scratch, Some("customers.csv"), UploadMode::Move)
        .await?;

    let pipeline = IngestPipeline::new(
        PipelineConfig::default().with_checkpoint_every(1),
        store.clone(),
        store.clone(),
        Arc::new(UploadDirSource::new(&uploads)),
        Arc::new(ProgressHub::new()),
    );
    let done = pipeline.process_job(job.id).await?;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.processed_rows, 252);
    assert_eq!(done.success_count, 250);
    assert_eq!(done.failed_count, 2);
    assert_eq!(done.errors[0].row_number, 251);
    assert_eq!(done.errors[0].message, "email already exists");
    assert_eq!(done.errors[1].message, "invalid email");

    let stored = store.find_job(job.id).await?.expect("job exists");
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.success_count + stored.failed_count, stored.processed_rows);
    assert!(stored.completed_at.is_some());

    // A second file repeating an email conflicts across jobs
    let scratch = dir.path().join("again.csv");
    std::fs::write(&scratch, format!("{HEADER}\nAgain,customer2@example.com,,Acme\n"))?;
    let again = service.submit_file(&scratch, None, UploadMode::Move).await?;
    let done = pipeline.process_job(again.id).await?;
    assert_eq!(done.success_count, 0);
    assert_eq!(done.errors[0].message, "email already exists");
    Ok(())
}
