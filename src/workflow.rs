//! Settlement orchestrator
//!
//! The workflow that takes a raw submission through normalization,
//! adjudication, conditional fund release, and the durable record.
//! Every outcome - PASS-paid, PASS-unpaid, FAIL - is persisted before
//! the call returns (durability before acknowledgment), and a job that
//! has reached PAID is never settled again.

use crate::adjudicator::Adjudicator;
use crate::ledger::LedgerError;
use crate::normalizer::{artifact_names, normalize_submission};
use crate::settlement::{SettlementError, SettlementExecutor};
use crate::store::{JobStore, StoreError};
use crate::types::{JobStatus, SubmissionPart, SubmissionRecord, Verdict, VerdictKind};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The job was never indexed off-chain; a caller precondition.
    #[error("job {0} is not indexed")]
    JobNotIndexed(u64),

    /// The off-chain record exists but the ledger has no such job:
    /// the two sides have diverged.
    #[error("job {0} not found on ledger")]
    JobNotOnLedger(u64),

    /// The job is already PAID (or flagged settled on-chain); no further
    /// adjudication or ledger write happens for it.
    #[error("job {0} is already settled")]
    AlreadySettled(u64),

    /// Retry was requested for a job without a standing PASS verdict.
    #[error("job {0} has no passing submission to settle")]
    NoPassingSubmission(u64),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the caller gets back. A PASS with `tx_hash: None` means the work
/// was accepted but the payout did not happen; `reason` then carries the
/// payout failure so it is never silently dropped.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubmitOutcome {
    pub verdict: VerdictKind,
    pub reason: String,
    pub tx_hash: Option<String>,
}

pub struct SettlementOrchestrator {
    store: Arc<dyn JobStore>,
    adjudicator: Arc<dyn Adjudicator>,
    executor: Arc<SettlementExecutor>,
}

impl SettlementOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        adjudicator: Arc<dyn Adjudicator>,
        executor: Arc<SettlementExecutor>,
    ) -> Self {
        Self {
            store,
            adjudicator,
            executor,
        }
    }

    /// Evaluate a submission and, on PASS, release the escrowed funds.
    pub async fn submit_work(
        &self,
        job_id: u64,
        freelancer_name: Option<&str>,
        notes: &str,
        artifacts: Vec<SubmissionPart>,
    ) -> Result<SubmitOutcome, WorkflowError> {
        info!(job_id, "Received submission");

        // 1. Off-chain record must exist.
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(WorkflowError::JobNotIndexed(job_id))?;
        if job.status == JobStatus::Paid {
            return Err(WorkflowError::AlreadySettled(job_id));
        }

        // 2. The ledger is the source of truth for the job's existence
        //    and its requirements text.
        let chain_job = self
            .executor
            .job_on_ledger(job_id)
            .await?
            .ok_or(WorkflowError::JobNotOnLedger(job_id))?;
        if chain_job.is_settled {
            return Err(WorkflowError::AlreadySettled(job_id));
        }

        // 3. Normalize and adjudicate against the ledger-sourced
        //    description, never the off-chain copy.
        let payload = normalize_submission(notes, &artifacts);
        let payload_digest = hex::encode(Sha256::digest(payload.as_bytes()));
        let verdict = self
            .adjudicator
            .evaluate(&chain_job.description, &payload)
            .await;
        info!(job_id, verdict = verdict.kind.as_str(), "Adjudication complete");

        let freelancer = freelancer_name
            .map(str::to_string)
            .or(job.freelancer_name)
            .unwrap_or_else(|| "Unknown".to_string());
        let record = |verdict: &Verdict, tx_hash: Option<String>| SubmissionRecord {
            id: Uuid::new_v4(),
            chain_job_id: job_id,
            freelancer_name: freelancer.clone(),
            notes: notes.to_string(),
            files: artifact_names(&artifacts),
            payload_digest: payload_digest.clone(),
            verdict: verdict.kind,
            reason: verdict.reason.clone(),
            tx_hash,
            created_at: Utc::now(),
        };

        // 4. FAIL: record it and leave the job re-submittable.
        if verdict.kind == VerdictKind::Fail {
            self.store.append_submission(record(&verdict, None)).await?;
            return Ok(SubmitOutcome {
                verdict: VerdictKind::Fail,
                reason: verdict.reason,
                tx_hash: None,
            });
        }

        // 5. PASS: exactly one release attempt for this invocation.
        match self.executor.release_payment(job_id).await {
            Ok(tx_hash) => {
                // 6. Persist the submission first, then flip the job to
                //    PAID, before acknowledging the caller.
                self.store
                    .append_submission(record(&verdict, Some(tx_hash.clone())))
                    .await?;
                self.mark_paid_with_retry(job_id, &tx_hash).await?;
                Ok(SubmitOutcome {
                    verdict: VerdictKind::Pass,
                    reason: verdict.reason,
                    tx_hash: Some(tx_hash),
                })
            }
            Err(e) => {
                // Adjudication stood but the payout did not complete.
                // The record keeps the judge's own reason; the caller
                // sees the payout failure. The job stays un-PAID so the
                // stored PASS can be settled later. A timed-out
                // broadcast keeps its transaction id on the record so a
                // late-mined settlement can still be attributed.
                let broadcast_tx = match &e {
                    SettlementError::ConfirmationTimeout { tx_hash, .. } => Some(tx_hash.clone()),
                    _ => None,
                };
                warn!(job_id, error = %e, retryable = e.is_retryable(), "Payout failed after PASS");
                self.store
                    .append_submission(record(&verdict, broadcast_tx))
                    .await?;
                Ok(SubmitOutcome {
                    verdict: VerdictKind::Pass,
                    reason: format!("Payout failed: {}", e),
                    tx_hash: None,
                })
            }
        }
    }

    /// Re-drive settlement for a job holding a PASS submission that was
    /// never paid out. No re-adjudication and no new submission record:
    /// the stored PASS is the authority.
    pub async fn retry_settlement(&self, job_id: u64) -> Result<SubmitOutcome, WorkflowError> {
        let job = self
            .store
            .get_job(job_id)
            .await?
            .ok_or(WorkflowError::JobNotIndexed(job_id))?;
        if job.status == JobStatus::Paid {
            return Err(WorkflowError::AlreadySettled(job_id));
        }

        let passing = self
            .store
            .latest_passing_submission(job_id)
            .await?
            .ok_or(WorkflowError::NoPassingSubmission(job_id))?;

        let chain_job = self
            .executor
            .job_on_ledger(job_id)
            .await?
            .ok_or(WorkflowError::JobNotOnLedger(job_id))?;
        if chain_job.is_settled {
            // The escrow already paid out: a broadcast whose receipt was
            // never observed (confirmation timeout) mined after the
            // deadline. Reconcile the durable record instead of
            // refusing, so the job does not stay un-PAID forever.
            let tx_hash = passing
                .tx_hash
                .clone()
                .unwrap_or_else(|| "settled-on-ledger".to_string());
            warn!(job_id, %tx_hash, "Ledger reports settled; reconciling job record");
            self.mark_paid_with_retry(job_id, &tx_hash).await?;
            return Ok(SubmitOutcome {
                verdict: VerdictKind::Pass,
                reason: passing.reason,
                tx_hash: Some(tx_hash),
            });
        }

        match self.executor.release_payment(job_id).await {
            Ok(tx_hash) => {
                self.mark_paid_with_retry(job_id, &tx_hash).await?;
                info!(job_id, %tx_hash, "Settlement retry succeeded");
                Ok(SubmitOutcome {
                    verdict: VerdictKind::Pass,
                    reason: passing.reason,
                    tx_hash: Some(tx_hash),
                })
            }
            Err(e) => {
                warn!(job_id, error = %e, "Settlement retry failed");
                Ok(SubmitOutcome {
                    verdict: VerdictKind::Pass,
                    reason: format!("Payout failed: {}", e),
                    tx_hash: None,
                })
            }
        }
    }

    /// Conditional PAID transition, retried once on a store fault. A
    /// CAS miss (job already PAID) is logged, not retried: funds moved
    /// exactly once and the terminal state already holds.
    async fn mark_paid_with_retry(&self, job_id: u64, tx_hash: &str) -> Result<(), WorkflowError> {
        let updated = match self.store.mark_paid(job_id, tx_hash).await {
            Ok(updated) => updated,
            Err(first) => {
                warn!(job_id, error = %first, "PAID transition failed, retrying once");
                self.store.mark_paid(job_id, tx_hash).await?
            }
        };
        if !updated {
            error!(
                job_id,
                %tx_hash,
                "Job was already PAID when recording settlement"
            );
        }
        Ok(())
    }
}
