//! Durable job/submission record store boundary.
//!
//! The store owns all persistent Job and Submission state. It must
//! provide: a uniqueness constraint on the job id (insert-if-absent),
//! an atomic conditional PAID transition, add-to-set applicant updates,
//! and append-only submissions. Two implementations: dashmap-backed
//! in-memory (tests) and SQLite (production).

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{JobRecord, SubmissionRecord};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait JobStore: Send + Sync {
    // ==================== Jobs ====================

    /// Insert-if-absent on `chain_job_id`. Returns `false` when the job
    /// was already indexed (second call is a no-op).
    async fn insert_job(&self, job: JobRecord) -> Result<bool>;

    async fn get_job(&self, chain_job_id: u64) -> Result<Option<JobRecord>>;

    /// Newest first by `chain_job_id`.
    async fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>>;

    /// Set status ASSIGNED plus the freelancer identity. Returns `false`
    /// when the job is missing or already PAID (transitions are
    /// monotonic; PAID is terminal).
    async fn assign_freelancer(
        &self,
        chain_job_id: u64,
        name: &str,
        address: Option<&str>,
    ) -> Result<bool>;

    /// Add-to-set on the applicants list. Returns `false` when the job
    /// is missing.
    async fn add_applicant(&self, chain_job_id: u64, applicant: &str) -> Result<bool>;

    /// Atomic conditional PAID transition: succeeds (returns `true`)
    /// only if the job exists and is not already PAID, recording the
    /// settlement transaction id on the job.
    async fn mark_paid(&self, chain_job_id: u64, tx_hash: &str) -> Result<bool>;

    // ==================== Submissions ====================

    /// Append-only insert; submissions are never updated.
    async fn append_submission(&self, submission: SubmissionRecord) -> Result<()>;

    /// Newest first by `created_at`.
    async fn list_submissions(&self, limit: usize) -> Result<Vec<SubmissionRecord>>;

    /// Newest first, for one job.
    async fn submissions_for_job(
        &self,
        chain_job_id: u64,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>>;

    /// Most recent PASS submission for a job, however many later
    /// submissions exist. Settlement retries key off this.
    async fn latest_passing_submission(
        &self,
        chain_job_id: u64,
    ) -> Result<Option<SubmissionRecord>>;
}
