//! Settlement executor
//!
//! Drives a single fund release through the escrow ledger: balance check,
//! nonce assignment, gas pricing, broadcast, bounded confirmation wait.
//! The whole sequence holds a per-signer lane so two concurrent releases
//! can never observe the same pending nonce.
//!
//! The ledger write is irreversible and non-idempotent; the orchestrator
//! is responsible for invoking `release_payment` at most once per job.

use crate::ledger::{EscrowLedger, LedgerError};
use crate::types::JobChainView;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{info, warn};

/// Gas price boost over the network suggestion, as a rational (6/5 = 1.2x).
/// Integer arithmetic, floored.
const GAS_BOOST_NUM: u128 = 6;
const GAS_BOOST_DEN: u128 = 5;

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Fatal until an operator funds the signer; retrying cannot help.
    #[error("signer wallet {signer} has zero balance; fund it before retrying")]
    EmptyWallet { signer: String },

    /// The network refused the transaction at submit time.
    #[error("settlement transaction rejected: {0}")]
    Rejected(String),

    /// The transaction was included but reverted.
    #[error("settlement transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    /// No receipt within the bounded wait. Payout status is unknown -
    /// neither success nor failure may be assumed.
    #[error("no confirmation for {tx_hash} within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SettlementError {
    /// Whether re-invoking settlement against the same unpaid job is a
    /// sensible recovery. Only an empty wallet is operator territory.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SettlementError::EmptyWallet { .. })
    }
}

/// Executor configuration; defaults mirror [`crate::config::LedgerConfig`].
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub confirm_timeout_secs: u64,
    pub confirm_poll_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            confirm_timeout_secs: 120,
            confirm_poll_ms: 2_000,
        }
    }
}

pub struct SettlementExecutor {
    ledger: Arc<dyn EscrowLedger>,
    config: ExecutorConfig,
    /// Single-writer lane for the signer's nonce. Read paths do not
    /// touch it.
    lane: Mutex<()>,
}

impl SettlementExecutor {
    pub fn new(ledger: Arc<dyn EscrowLedger>, config: ExecutorConfig) -> Self {
        Self {
            ledger,
            config,
            lane: Mutex::new(()),
        }
    }

    /// Read-only on-chain job lookup. Fully concurrent; never takes the
    /// write lane.
    pub async fn job_on_ledger(&self, job_id: u64) -> Result<Option<JobChainView>, LedgerError> {
        self.ledger.job(job_id).await
    }

    pub fn signer_address(&self) -> String {
        self.ledger.signer_address().to_string()
    }

    /// Release escrowed funds for a job and wait for confirmation.
    /// Returns the confirmed transaction hash.
    pub async fn release_payment(&self, job_id: u64) -> Result<String, SettlementError> {
        let _writer = self.lane.lock().await;

        let signer = self.ledger.signer_address();
        let balance = self.ledger.signer_balance().await?;
        if balance.is_zero() {
            return Err(SettlementError::EmptyWallet {
                signer: signer.to_string(),
            });
        }

        let nonce = self.ledger.pending_nonce().await?;
        let suggested = self.ledger.gas_price().await?;
        let gas_price = suggested * GAS_BOOST_NUM / GAS_BOOST_DEN;

        info!(
            job_id,
            nonce, gas_price, "Submitting fund release transaction"
        );

        let tx_hash = self
            .ledger
            .submit_release(job_id, nonce, gas_price)
            .await
            .map_err(|e| match e {
                LedgerError::Rejected(msg) => SettlementError::Rejected(msg),
                other => SettlementError::Ledger(other),
            })?;

        let deadline = Instant::now() + Duration::from_secs(self.config.confirm_timeout_secs);
        loop {
            match self.ledger.receipt_status(&tx_hash).await? {
                Some(true) => {
                    info!(job_id, %tx_hash, "Fund release confirmed");
                    return Ok(tx_hash);
                }
                Some(false) => {
                    warn!(job_id, %tx_hash, "Fund release reverted");
                    return Err(SettlementError::Reverted { tx_hash });
                }
                None => {}
            }

            if Instant::now() >= deadline {
                warn!(job_id, %tx_hash, "Fund release unconfirmed within timeout");
                return Err(SettlementError::ConfirmationTimeout {
                    tx_hash,
                    waited_secs: self.config.confirm_timeout_secs,
                });
            }
            tokio::time::sleep(Duration::from_millis(self.config.confirm_poll_ms)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::EscrowLedger;
    use alloy::primitives::{Address, U256};
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;

    /// Minimal scripted ledger: fixed balance/nonce/gas price, records
    /// what was submitted, confirms after a configurable number of polls.
    struct ScriptedLedger {
        balance: U256,
        gas_price: u128,
        polls_until_confirmed: SyncMutex<i32>,
        confirm_status: bool,
        submitted: SyncMutex<Vec<(u64, u64, u128)>>,
    }

    impl ScriptedLedger {
        fn funded(gas_price: u128) -> Self {
            Self {
                balance: U256::from(1_000_000u64),
                gas_price,
                polls_until_confirmed: SyncMutex::new(0),
                confirm_status: true,
                submitted: SyncMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl EscrowLedger for ScriptedLedger {
        fn signer_address(&self) -> Address {
            Address::ZERO
        }

        async fn job(&self, _job_id: u64) -> Result<Option<crate::types::JobChainView>, LedgerError> {
            Ok(None)
        }

        async fn signer_balance(&self) -> Result<U256, LedgerError> {
            Ok(self.balance)
        }

        async fn pending_nonce(&self) -> Result<u64, LedgerError> {
            Ok(7)
        }

        async fn gas_price(&self) -> Result<u128, LedgerError> {
            Ok(self.gas_price)
        }

        async fn submit_release(
            &self,
            job_id: u64,
            nonce: u64,
            gas_price: u128,
        ) -> Result<String, LedgerError> {
            self.submitted.lock().push((job_id, nonce, gas_price));
            Ok(format!("0xtx{}", job_id))
        }

        async fn receipt_status(&self, _tx_hash: &str) -> Result<Option<bool>, LedgerError> {
            let mut polls = self.polls_until_confirmed.lock();
            if *polls > 0 {
                *polls -= 1;
                return Ok(None);
            }
            Ok(Some(self.confirm_status))
        }
    }

    fn fast_config() -> ExecutorConfig {
        ExecutorConfig {
            confirm_timeout_secs: 1,
            confirm_poll_ms: 10,
        }
    }

    #[tokio::test]
    async fn test_gas_priced_at_1_2x_suggestion() {
        let ledger = Arc::new(ScriptedLedger::funded(100));
        let exec = SettlementExecutor::new(ledger.clone(), fast_config());

        let tx = exec.release_payment(5).await.unwrap();
        assert_eq!(tx, "0xtx5");

        let submitted = ledger.submitted.lock();
        assert_eq!(submitted.len(), 1);
        let (job_id, nonce, gas_price) = submitted[0];
        assert_eq!(job_id, 5);
        assert_eq!(nonce, 7);
        assert_eq!(gas_price, 120); // 100 * 1.2, floored

        // Floor on non-divisible suggestions.
        drop(submitted);
        assert_eq!(101u128 * GAS_BOOST_NUM / GAS_BOOST_DEN, 121);
    }

    #[tokio::test]
    async fn test_zero_balance_is_fatal_and_submits_nothing() {
        let ledger = Arc::new(ScriptedLedger {
            balance: U256::ZERO,
            ..ScriptedLedger::funded(100)
        });
        let exec = SettlementExecutor::new(ledger.clone(), fast_config());

        let err = exec.release_payment(1).await.unwrap_err();
        assert!(matches!(err, SettlementError::EmptyWallet { .. }));
        assert!(!err.is_retryable());
        assert!(ledger.submitted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_reverted_receipt_is_retryable_error() {
        let ledger = Arc::new(ScriptedLedger {
            confirm_status: false,
            ..ScriptedLedger::funded(100)
        });
        let exec = SettlementExecutor::new(ledger, fast_config());

        let err = exec.release_payment(1).await.unwrap_err();
        assert!(matches!(err, SettlementError::Reverted { .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_confirmation_timeout_surfaces_unknown_status() {
        let ledger = Arc::new(ScriptedLedger {
            polls_until_confirmed: SyncMutex::new(i32::MAX),
            ..ScriptedLedger::funded(100)
        });
        let exec = SettlementExecutor::new(ledger, fast_config());

        let err = exec.release_payment(1).await.unwrap_err();
        assert!(matches!(err, SettlementError::ConfirmationTimeout { .. }));
        assert!(err.is_retryable());
    }
}
