//! Settlement Engine
//!
//! Adjudicates freelance-work submissions against a job's on-chain
//! requirements with an AI reviewer and, on a PASS verdict, releases the
//! escrowed funds exactly once on the ledger. Every outcome is durably
//! recorded before the caller is acknowledged.
//!
//! ## Module Structure
//!
//! - `types`: Job/Submission/Verdict data model
//! - `config`: Env-backed configuration for the external boundaries
//! - `normalizer`: Notes + artifacts into one adjudication payload
//! - `adjudicator`: AI judge client (fail-closed verdict boundary)
//! - `ledger`: Escrow contract boundary (reads, raw release submit)
//! - `settlement`: Single-writer fund-release executor
//! - `store`: Durable job/submission record store (memory + SQLite)
//! - `workflow`: The settlement orchestrator state machine
//! - `rpc`: HTTP API

pub mod adjudicator;
pub mod config;
pub mod ledger;
pub mod normalizer;
pub mod rpc;
pub mod settlement;
pub mod store;
pub mod types;
pub mod workflow;

pub use adjudicator::{AdjudicationClient, Adjudicator};
pub use config::{AdjudicatorConfig, LedgerConfig, StoreConfig};
pub use ledger::{EscrowLedger, EthLedger, LedgerError};
pub use rpc::{RpcConfig, SettlementRpc};
pub use settlement::{ExecutorConfig, SettlementError, SettlementExecutor};
pub use store::{JobStore, MemoryStore, SqliteStore, StoreError};
pub use types::{
    JobChainView, JobRecord, JobStatus, SubmissionPart, SubmissionRecord, Verdict, VerdictKind,
};
pub use workflow::{SettlementOrchestrator, SubmitOutcome, WorkflowError};
