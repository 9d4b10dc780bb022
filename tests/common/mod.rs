//! Shared test doubles: a scripted escrow ledger and judge, plus record
//! builders used across the integration suites.

#![allow(dead_code)]

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use settlement_engine::{
    Adjudicator, EscrowLedger, ExecutorConfig, JobChainView, JobRecord, JobStatus, LedgerError,
    MemoryStore, SettlementExecutor, SettlementOrchestrator, Verdict,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmittedTx {
    pub job_id: u64,
    pub nonce: u64,
    pub gas_price: u128,
}

/// In-memory escrow ledger. Tracks every submitted release, serves
/// pending nonces from the submission count, and flips the on-chain
/// settled flag once a release confirms (as the real contract would).
pub struct FakeLedger {
    pub jobs: DashMap<u64, JobChainView>,
    pub balance: Mutex<U256>,
    pub suggested_gas_price: u128,
    pub submitted: Mutex<Vec<SubmittedTx>>,
    nonce: AtomicU64,
    /// When set, submissions are rejected at broadcast time.
    pub reject_submits: AtomicBool,
    /// When set, receipts never appear (confirmation timeout).
    pub stall_receipts: AtomicBool,
    /// Overlap detector for the single-writer lane.
    in_flight: AtomicBool,
    pub overlap_detected: AtomicBool,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self {
            jobs: DashMap::new(),
            balance: Mutex::new(U256::from(10u64.pow(18))),
            suggested_gas_price: 1_000,
            submitted: Mutex::new(Vec::new()),
            nonce: AtomicU64::new(0),
            reject_submits: AtomicBool::new(false),
            stall_receipts: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            overlap_detected: AtomicBool::new(false),
        }
    }

    pub fn with_job(self, job_id: u64, description: &str) -> Self {
        self.jobs.insert(
            job_id,
            JobChainView {
                id: U256::from(job_id),
                client: Address::repeat_byte(0x11),
                freelancer: Address::repeat_byte(0x22),
                amount: U256::from(1_000u64),
                description: description.to_string(),
                is_settled: false,
                is_approved: false,
            },
        );
        self
    }

    pub fn release_count(&self) -> usize {
        self.submitted.lock().len()
    }
}

#[async_trait]
impl EscrowLedger for FakeLedger {
    fn signer_address(&self) -> Address {
        Address::repeat_byte(0xaa)
    }

    async fn job(&self, job_id: u64) -> Result<Option<JobChainView>, LedgerError> {
        Ok(self.jobs.get(&job_id).map(|j| j.value().clone()))
    }

    async fn signer_balance(&self) -> Result<U256, LedgerError> {
        // Entry point of the write sequence: flag overlapping writers.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlap_detected.store(true, Ordering::SeqCst);
        }
        Ok(*self.balance.lock())
    }

    async fn pending_nonce(&self) -> Result<u64, LedgerError> {
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(self.nonce.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        Ok(self.suggested_gas_price)
    }

    async fn submit_release(
        &self,
        job_id: u64,
        nonce: u64,
        gas_price: u128,
    ) -> Result<String, LedgerError> {
        if self.reject_submits.load(Ordering::SeqCst) {
            self.in_flight.store(false, Ordering::SeqCst);
            return Err(LedgerError::Rejected("nonce too low".to_string()));
        }
        self.submitted.lock().push(SubmittedTx {
            job_id,
            nonce,
            gas_price,
        });
        self.nonce.fetch_add(1, Ordering::SeqCst);
        Ok(format!("0x{:064x}", job_id))
    }

    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<bool>, LedgerError> {
        if self.stall_receipts.load(Ordering::SeqCst) {
            return Ok(None);
        }
        // Confirmation ends the write sequence; mark the escrow settled
        // the way the contract's own flag would.
        let job_id = u64::from_str_radix(tx_hash.trim_start_matches("0x"), 16)
            .map_err(|e| LedgerError::Config(e.to_string()))?;
        if let Some(mut job) = self.jobs.get_mut(&job_id) {
            job.is_settled = true;
        }
        self.in_flight.store(false, Ordering::SeqCst);
        Ok(Some(true))
    }
}

/// Judge that answers from a fixed verdict and records what it was asked.
pub struct ScriptedJudge {
    pub verdict: Mutex<Verdict>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedJudge {
    pub fn passing(reason: &str) -> Self {
        Self {
            verdict: Mutex::new(Verdict::pass(reason)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            verdict: Mutex::new(Verdict::fail(reason)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Adjudicator for ScriptedJudge {
    async fn evaluate(&self, requirements: &str, payload: &str) -> Verdict {
        self.calls
            .lock()
            .push((requirements.to_string(), payload.to_string()));
        self.verdict.lock().clone()
    }
}

pub fn job_record(job_id: u64, description: &str) -> JobRecord {
    JobRecord {
        chain_job_id: job_id,
        title: format!("Job #{}", job_id),
        description: description.to_string(),
        amount_mnee: 100.0,
        client_address: "0x1111111111111111111111111111111111111111".to_string(),
        client_name: "Client".to_string(),
        tags: vec!["test".to_string()],
        freelancer_address: None,
        freelancer_name: Some("Dana".to_string()),
        status: JobStatus::Assigned,
        applicants: Vec::new(),
        settlement_tx: None,
        created_at: Utc::now(),
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<FakeLedger>,
    pub judge: Arc<ScriptedJudge>,
    pub executor: Arc<SettlementExecutor>,
    pub orchestrator: SettlementOrchestrator,
}

/// Wire an orchestrator over the in-memory store and the fakes, with a
/// fast confirmation loop.
pub fn harness(ledger: FakeLedger, judge: ScriptedJudge) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let ledger = Arc::new(ledger);
    let judge = Arc::new(judge);
    let executor = Arc::new(SettlementExecutor::new(
        ledger.clone(),
        ExecutorConfig {
            confirm_timeout_secs: 1,
            confirm_poll_ms: 10,
        },
    ));
    let orchestrator =
        SettlementOrchestrator::new(store.clone(), judge.clone(), executor.clone());
    Harness {
        store,
        ledger,
        judge,
        executor,
        orchestrator,
    }
}
