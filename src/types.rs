//! Core data model for jobs, submissions and verdicts.

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Off-chain job lifecycle. Transitions are monotonic:
/// `Open -> Assigned -> Paid`. A failed submission leaves the
/// status untouched so the job stays re-submittable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "ASSIGNED")]
    Assigned,
    #[serde(rename = "PAID")]
    Paid,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Open => "OPEN",
            JobStatus::Assigned => "ASSIGNED",
            JobStatus::Paid => "PAID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(JobStatus::Open),
            "ASSIGNED" => Some(JobStatus::Assigned),
            "PAID" => Some(JobStatus::Paid),
            _ => None,
        }
    }
}

/// Durable off-chain job record, keyed by the ledger-assigned job id.
///
/// `amount_mnee` is the display amount only; the escrow contract's
/// `U256` amount is authoritative for settlement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub chain_job_id: u64,
    pub title: String,
    pub description: String,
    pub amount_mnee: f64,
    pub client_address: String,
    pub client_name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub freelancer_address: Option<String>,
    #[serde(default)]
    pub freelancer_name: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub applicants: Vec<String>,
    /// Set only by the PAID transition; presence means funds moved.
    #[serde(default)]
    pub settlement_tx: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One evaluated submission. Append-only; never mutated after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: Uuid,
    pub chain_job_id: u64,
    pub freelancer_name: String,
    pub notes: String,
    /// Artifact names as uploaded, in order.
    pub files: Vec<String>,
    /// sha256 of the adjudication payload this verdict was produced from.
    pub payload_digest: String,
    pub verdict: VerdictKind,
    pub reason: String,
    /// Ledger transaction id; present only when a fund release was
    /// actually broadcast for this submission.
    #[serde(default)]
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Canonical adjudication outcome. Anything the judge returns that is
/// not exactly PASS collapses to FAIL before it leaves the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictKind {
    #[serde(rename = "PASS")]
    Pass,
    #[serde(rename = "FAIL")]
    Fail,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Pass => "PASS",
            VerdictKind::Fail => "FAIL",
        }
    }
}

/// Verdict plus the judge's short explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub kind: VerdictKind,
    pub reason: String,
}

impl Verdict {
    pub fn pass(reason: impl Into<String>) -> Self {
        Self {
            kind: VerdictKind::Pass,
            reason: reason.into(),
        }
    }

    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            kind: VerdictKind::Fail,
            reason: reason.into(),
        }
    }
}

/// One piece of submission content, dispatched on explicitly by the
/// normalizer rather than probing attributes.
#[derive(Debug, Clone)]
pub enum SubmissionPart {
    /// Free-standing text pasted alongside the notes.
    Text(String),
    /// Uploaded artifact; may be text-like or opaque binary.
    Artifact {
        name: String,
        bytes: Vec<u8>,
        mime_hint: Option<String>,
    },
}

/// On-chain job record as read from the escrow contract:
/// `jobs(id) -> (id, client, freelancer, amount, description, isSettled, isApproved)`.
#[derive(Debug, Clone)]
pub struct JobChainView {
    pub id: U256,
    pub client: Address,
    pub freelancer: Address,
    pub amount: U256,
    pub description: String,
    pub is_settled: bool,
    pub is_approved: bool,
}
