//! SQLite-backed durable store.
//!
//! The `jobs` primary key is the uniqueness constraint on the chain job
//! id; the PAID transition is a conditional UPDATE so it stays atomic
//! under concurrent submissions. List-valued columns (tags, applicants,
//! files) are stored as JSON text.

use super::{JobStore, Result, StoreError};
use crate::types::{JobRecord, JobStatus, SubmissionRecord};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    chain_job_id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    amount_mnee REAL NOT NULL,
    client_address TEXT NOT NULL,
    client_name TEXT NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    freelancer_address TEXT,
    freelancer_name TEXT,
    status TEXT NOT NULL DEFAULT 'OPEN',
    applicants TEXT NOT NULL DEFAULT '[]',
    settlement_tx TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
    id TEXT PRIMARY KEY,
    chain_job_id INTEGER NOT NULL,
    freelancer_name TEXT NOT NULL,
    notes TEXT NOT NULL,
    files TEXT NOT NULL DEFAULT '[]',
    payload_digest TEXT NOT NULL,
    verdict TEXT NOT NULL,
    reason TEXT NOT NULL,
    tx_hash TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_submissions_job ON submissions(chain_job_id);
"#;

pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create or open the store at the specified path.
    pub fn new(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch(SCHEMA)?;
        info!("Job store initialized at {:?}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

fn parse_json_list(raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn job_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRecord> {
    let status_raw: String = row.get(9)?;
    Ok(JobRecord {
        chain_job_id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        amount_mnee: row.get(3)?,
        client_address: row.get(4)?,
        client_name: row.get(5)?,
        tags: parse_json_list(&row.get::<_, String>(6)?)?,
        freelancer_address: row.get(7)?,
        freelancer_name: row.get(8)?,
        status: JobStatus::parse(&status_raw).unwrap_or(JobStatus::Open),
        applicants: parse_json_list(&row.get::<_, String>(10)?)?,
        settlement_tx: row.get(11)?,
        created_at: parse_timestamp(&row.get::<_, String>(12)?)?,
    })
}

fn submission_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SubmissionRecord> {
    let id_raw: String = row.get(0)?;
    let verdict_raw: String = row.get(6)?;
    Ok(SubmissionRecord {
        id: Uuid::parse_str(&id_raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?,
        chain_job_id: row.get(1)?,
        freelancer_name: row.get(2)?,
        notes: row.get(3)?,
        files: parse_json_list(&row.get::<_, String>(4)?)?,
        payload_digest: row.get(5)?,
        verdict: match verdict_raw.as_str() {
            "PASS" => crate::types::VerdictKind::Pass,
            _ => crate::types::VerdictKind::Fail,
        },
        reason: row.get(7)?,
        tx_hash: row.get(8)?,
        created_at: parse_timestamp(&row.get::<_, String>(9)?)?,
    })
}

const JOB_COLUMNS: &str = "chain_job_id, title, description, amount_mnee, client_address, \
     client_name, tags, freelancer_address, freelancer_name, status, applicants, \
     settlement_tx, created_at";

const SUBMISSION_COLUMNS: &str =
    "id, chain_job_id, freelancer_name, notes, files, payload_digest, verdict, reason, \
     tx_hash, created_at";

#[async_trait]
impl JobStore for SqliteStore {
    // ========================================================================
    // JOBS
    // ========================================================================

    async fn insert_job(&self, job: JobRecord) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            &format!(
                "INSERT INTO jobs ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                 ON CONFLICT(chain_job_id) DO NOTHING",
                JOB_COLUMNS
            ),
            params![
                job.chain_job_id,
                job.title,
                job.description,
                job.amount_mnee,
                job.client_address,
                job.client_name,
                serde_json::to_string(&job.tags)?,
                job.freelancer_address,
                job.freelancer_name,
                job.status.as_str(),
                serde_json::to_string(&job.applicants)?,
                job.settlement_tx,
                job.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(changed == 1)
    }

    async fn get_job(&self, chain_job_id: u64) -> Result<Option<JobRecord>> {
        let conn = self.conn.lock();
        let job = conn
            .query_row(
                &format!("SELECT {} FROM jobs WHERE chain_job_id = ?1", JOB_COLUMNS),
                params![chain_job_id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM jobs ORDER BY chain_job_id DESC LIMIT ?1",
            JOB_COLUMNS
        ))?;
        let jobs = stmt
            .query_map(params![limit as i64], job_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    async fn assign_freelancer(
        &self,
        chain_job_id: u64,
        name: &str,
        address: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE jobs SET status = 'ASSIGNED', freelancer_name = ?2,
                 freelancer_address = COALESCE(?3, freelancer_address)
             WHERE chain_job_id = ?1 AND status != 'PAID'",
            params![chain_job_id, name, address],
        )?;
        Ok(changed == 1)
    }

    async fn add_applicant(&self, chain_job_id: u64, applicant: &str) -> Result<bool> {
        // Read-modify-write under the connection lock; the lock is the
        // atomicity boundary for this single-writer store.
        let conn = self.conn.lock();
        let applicants: Option<String> = conn
            .query_row(
                "SELECT applicants FROM jobs WHERE chain_job_id = ?1",
                params![chain_job_id],
                |row| row.get(0),
            )
            .optional()?;

        let Some(raw) = applicants else {
            return Ok(false);
        };
        let mut list: Vec<String> = serde_json::from_str(&raw)?;
        if !list.iter().any(|a| a == applicant) {
            list.push(applicant.to_string());
            conn.execute(
                "UPDATE jobs SET applicants = ?2 WHERE chain_job_id = ?1",
                params![chain_job_id, serde_json::to_string(&list)?],
            )?;
        }
        Ok(true)
    }

    async fn mark_paid(&self, chain_job_id: u64, tx_hash: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE jobs SET status = 'PAID', settlement_tx = ?2
             WHERE chain_job_id = ?1 AND status != 'PAID'",
            params![chain_job_id, tx_hash],
        )?;
        Ok(changed == 1)
    }

    // ========================================================================
    // SUBMISSIONS
    // ========================================================================

    async fn append_submission(&self, submission: SubmissionRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            &format!(
                "INSERT INTO submissions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                SUBMISSION_COLUMNS
            ),
            params![
                submission.id.to_string(),
                submission.chain_job_id,
                submission.freelancer_name,
                submission.notes,
                serde_json::to_string(&submission.files)?,
                submission.payload_digest,
                submission.verdict.as_str(),
                submission.reason,
                submission.tx_hash,
                submission.created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    async fn list_submissions(&self, limit: usize) -> Result<Vec<SubmissionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM submissions ORDER BY created_at DESC LIMIT ?1",
            SUBMISSION_COLUMNS
        ))?;
        let subs = stmt
            .query_map(params![limit as i64], submission_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subs)
    }

    async fn submissions_for_job(
        &self,
        chain_job_id: u64,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM submissions WHERE chain_job_id = ?1
             ORDER BY created_at DESC LIMIT ?2",
            SUBMISSION_COLUMNS
        ))?;
        let subs = stmt
            .query_map(params![chain_job_id, limit as i64], submission_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(subs)
    }

    async fn latest_passing_submission(
        &self,
        chain_job_id: u64,
    ) -> Result<Option<SubmissionRecord>> {
        let conn = self.conn.lock();
        let sub = conn
            .query_row(
                &format!(
                    "SELECT {} FROM submissions
                     WHERE chain_job_id = ?1 AND verdict = 'PASS'
                     ORDER BY created_at DESC LIMIT 1",
                    SUBMISSION_COLUMNS
                ),
                params![chain_job_id],
                submission_from_row,
            )
            .optional()?;
        Ok(sub)
    }
}
