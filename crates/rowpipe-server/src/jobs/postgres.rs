//! PostgreSQL job and customer store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rowpipe_common::types::{Job, JobError};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::ingest::types::CustomerRecord;
use crate::jobs::store::{JobStore, JobUpdate, RecordStore};

const JOB_COLUMNS: &str = "id, filename, status, total_rows, processed_rows, success_count, \
                           failed_count, errors, created_at, completed_at";

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    filename: String,
    status: String,
    total_rows: i64,
    processed_rows: i64,
    success_count: i64,
    failed_count: i64,
    errors: Json<Vec<JobError>>,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<JobRow> for Job {
    type Error = StoreError;

    fn try_from(row: JobRow) -> StoreResult<Self> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::Corrupt(format!("job {}: {}", row.id, e)))?;

        Ok(Job {
            id: row.id,
            filename: row.filename,
            status,
            total_rows: from_db(row.total_rows)?,
            processed_rows: from_db(row.processed_rows)?,
            success_count: from_db(row.success_count)?,
            failed_count: from_db(row.failed_count)?,
            errors: row.errors.0,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

fn from_db(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative counter {}", value)))
}

fn to_db(value: u64) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("counter {} out of range", value)))
}

/// Both store traits over one connection pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl JobStore for PgStore {
    async fn create_job(&self, job: &Job) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, filename, status, total_rows, processed_rows,
                              success_count, failed_count, errors, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(job.id)
        .bind(&job.filename)
        .bind(job.status.as_str())
        .bind(to_db(job.total_rows)?)
        .bind(to_db(job.processed_rows)?)
        .bind(to_db(job.success_count)?)
        .bind(to_db(job.failed_count)?)
        .bind(Json(&job.errors))
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_job(&self, id: Uuid) -> StoreResult<Option<Job>> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Job::try_from).transpose()
    }

    async fn list_jobs(&self, limit: usize) -> StoreResult<Vec<Job>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {} FROM jobs ORDER BY created_at DESC, id DESC LIMIT $1",
            JOB_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Job::try_from).collect()
    }

    async fn update_job(&self, id: Uuid, update: &JobUpdate) -> StoreResult<()> {
        if update.is_empty() {
            return match self.find_job(id).await? {
                Some(_) => Ok(()),
                None => Err(StoreError::JobNotFound(id)),
            };
        }

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE jobs SET ");
        let mut set = query.separated(", ");

        if let Some(status) = update.status {
            set.push("status = ").push_bind_unseparated(status.as_str());
        }
        for (column, value) in [
            ("total_rows", update.total_rows),
            ("processed_rows", update.processed_rows),
            ("success_count", update.success_count),
            ("failed_count", update.failed_count),
        ] {
            if let Some(value) = value {
                set.push(format!("{} = ", column))
                    .push_bind_unseparated(to_db(value)?);
            }
        }
        if let Some(ref errors) = update.errors {
            set.push("errors = ").push_bind_unseparated(Json(errors.clone()));
        }
        if let Some(at) = update.completed_at {
            set.push("completed_at = ").push_bind_unseparated(at);
        }

        query.push(" WHERE id = ").push_bind(id);

        let result = query.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(id));
        }

        Ok(())
    }

    async fn next_pending(&self) -> StoreResult<Option<Uuid>> {
        let id: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM jobs WHERE status = 'pending' ORDER BY created_at, id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn insert_new(&self, records: &[CustomerRecord]) -> StoreResult<HashSet<String>> {
        if records.is_empty() {
            return Ok(HashSet::new());
        }

        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO customers (id, job_id, name, email, phone, company) ");

        query.push_values(records, |mut b, record| {
            b.push_bind(Uuid::new_v4())
                .push_bind(record.job_id)
                .push_bind(&record.name)
                .push_bind(&record.email)
                .push_bind(&record.phone)
                .push_bind(&record.company);
        });
        query.push(" ON CONFLICT (email) DO NOTHING RETURNING email");

        let inserted: Vec<String> = query
            .build_query_scalar()
            .fetch_all(&self.pool)
            .await?;

        Ok(inserted.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, processed: i64) -> JobRow {
        JobRow {
            id: Uuid::new_v4(),
            filename: "a.csv".to_string(),
            status: status.to_string(),
            total_rows: processed,
            processed_rows: processed,
            success_count: processed,
            failed_count: 0,
            errors: Json(Vec::new()),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_row_conversion() {
        let job = Job::try_from(row("processing", 4)).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(job.processed_rows, 4);
        assert_eq!(job.status.as_str(), "processing");
    }

    #[test]
    fn test_unknown_status_is_corrupt() {
        assert!(matches!(
            Job::try_from(row("paused", 0)),
            Err(StoreError::Corrupt(_))
        ));
    }

    #[test]
    fn test_negative_counter_is_corrupt() {
        assert!(matches!(
            Job::try_from(row("pending", -1)),
            Err(StoreError::Corrupt(_))
        ));
    }
}
