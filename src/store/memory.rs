//! In-memory store used by tests and local development.
//!
//! Conditional updates go through dashmap's per-entry locks, so the PAID
//! compare-and-set has the same atomicity as the SQLite implementation.

use super::{JobStore, Result};
use crate::types::{JobRecord, JobStatus, SubmissionRecord, VerdictKind};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    jobs: DashMap<u64, JobRecord>,
    submissions: Mutex<Vec<SubmissionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn insert_job(&self, job: JobRecord) -> Result<bool> {
        match self.jobs.entry(job.chain_job_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Ok(false),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(job);
                Ok(true)
            }
        }
    }

    async fn get_job(&self, chain_job_id: u64) -> Result<Option<JobRecord>> {
        Ok(self.jobs.get(&chain_job_id).map(|j| j.value().clone()))
    }

    async fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>> {
        let mut jobs: Vec<JobRecord> = self.jobs.iter().map(|j| j.value().clone()).collect();
        jobs.sort_by(|a, b| b.chain_job_id.cmp(&a.chain_job_id));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn assign_freelancer(
        &self,
        chain_job_id: u64,
        name: &str,
        address: Option<&str>,
    ) -> Result<bool> {
        match self.jobs.get_mut(&chain_job_id) {
            Some(mut job) if job.status != JobStatus::Paid => {
                job.status = JobStatus::Assigned;
                job.freelancer_name = Some(name.to_string());
                if let Some(addr) = address {
                    job.freelancer_address = Some(addr.to_string());
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn add_applicant(&self, chain_job_id: u64, applicant: &str) -> Result<bool> {
        match self.jobs.get_mut(&chain_job_id) {
            Some(mut job) => {
                if !job.applicants.iter().any(|a| a == applicant) {
                    job.applicants.push(applicant.to_string());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_paid(&self, chain_job_id: u64, tx_hash: &str) -> Result<bool> {
        match self.jobs.get_mut(&chain_job_id) {
            Some(mut job) if job.status != JobStatus::Paid => {
                job.status = JobStatus::Paid;
                job.settlement_tx = Some(tx_hash.to_string());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_submission(&self, submission: SubmissionRecord) -> Result<()> {
        self.submissions.lock().push(submission);
        Ok(())
    }

    async fn list_submissions(&self, limit: usize) -> Result<Vec<SubmissionRecord>> {
        let mut subs = self.submissions.lock().clone();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        subs.truncate(limit);
        Ok(subs)
    }

    async fn submissions_for_job(
        &self,
        chain_job_id: u64,
        limit: usize,
    ) -> Result<Vec<SubmissionRecord>> {
        let mut subs: Vec<SubmissionRecord> = self
            .submissions
            .lock()
            .iter()
            .filter(|s| s.chain_job_id == chain_job_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        subs.truncate(limit);
        Ok(subs)
    }

    async fn latest_passing_submission(
        &self,
        chain_job_id: u64,
    ) -> Result<Option<SubmissionRecord>> {
        Ok(self
            .submissions
            .lock()
            .iter()
            .filter(|s| s.chain_job_id == chain_job_id && s.verdict == VerdictKind::Pass)
            .max_by_key(|s| s.created_at)
            .cloned())
    }
}
