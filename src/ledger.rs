//! Escrow ledger boundary
//!
//! [`EscrowLedger`] is the narrow contract the settlement executor drives:
//! a read of the on-chain job record plus the primitives a fund release
//! needs (signer balance, pending nonce, suggested gas price, raw submit,
//! receipt probe). [`EthLedger`] implements it over an Ethereum JSON-RPC
//! endpoint with a local signing key.

use crate::config::LedgerConfig;
use crate::types::JobChainView;
use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use alloy::transports::{RpcError, TransportErrorKind};
use async_trait::async_trait;
use tracing::{debug, warn};

sol! {
    #[sol(rpc)]
    contract EscrowContract {
        function jobs(uint256 id) external view returns (
            uint256 jobId,
            address client,
            address freelancer,
            uint256 amount,
            string description,
            bool isSettled,
            bool isApproved
        );
        function releaseFunds(uint256 _jobId) external;
        function refundClient(uint256 _jobId) external;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger config error: {0}")]
    Config(String),
    #[error("ledger transport error: {0}")]
    Transport(String),
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

impl From<RpcError<TransportErrorKind>> for LedgerError {
    fn from(err: RpcError<TransportErrorKind>) -> Self {
        LedgerError::Transport(err.to_string())
    }
}

/// Ledger operations the settlement path depends on. Write submission is
/// raw on purpose: nonce and gas price are decided by the executor so the
/// single-writer discipline stays observable at this seam.
#[async_trait]
pub trait EscrowLedger: Send + Sync {
    /// Address of the account that signs fund releases.
    fn signer_address(&self) -> Address;

    /// Read the on-chain job record. `Ok(None)` when the ledger has no
    /// such job - an expected outcome, not an error.
    async fn job(&self, job_id: u64) -> Result<Option<JobChainView>, LedgerError>;

    async fn signer_balance(&self) -> Result<U256, LedgerError>;

    /// Signer's pending transaction count, used as the next nonce.
    async fn pending_nonce(&self) -> Result<u64, LedgerError>;

    /// Current network-suggested gas price, in wei.
    async fn gas_price(&self) -> Result<u128, LedgerError>;

    /// Sign and broadcast `releaseFunds(job_id)` with the given nonce and
    /// gas price. Returns the transaction hash; confirmation is the
    /// caller's problem.
    async fn submit_release(
        &self,
        job_id: u64,
        nonce: u64,
        gas_price: u128,
    ) -> Result<String, LedgerError>;

    /// Probe for a receipt: `None` while unconfirmed, `Some(status)` once
    /// the transaction is included.
    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<bool>, LedgerError>;
}

/// Ethereum JSON-RPC implementation of the escrow boundary.
///
/// The signing key is parsed once at connect time into the provider's
/// wallet layer and is not retained anywhere else.
pub struct EthLedger {
    provider: DynProvider,
    escrow: Address,
    signer: Address,
    gas_limit: u64,
}

impl EthLedger {
    pub fn connect(config: &LedgerConfig) -> Result<Self, LedgerError> {
        let signer: PrivateKeySigner = config
            .signer_key
            .parse()
            .map_err(|e| LedgerError::Config(format!("invalid signer key: {}", e)))?;
        let signer_address = signer.address();

        let escrow: Address = config
            .escrow_address
            .parse()
            .map_err(|e| LedgerError::Config(format!("invalid escrow address: {}", e)))?;

        let url = config
            .rpc_url
            .parse()
            .map_err(|e| LedgerError::Config(format!("invalid rpc url: {}", e)))?;

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url)
            .erased();

        debug!("Ledger client: escrow={} signer={}", escrow, signer_address);
        Ok(Self {
            provider,
            escrow,
            signer: signer_address,
            gas_limit: config.gas_limit,
        })
    }

    fn contract(&self) -> EscrowContract::EscrowContractInstance<DynProvider> {
        EscrowContract::new(self.escrow, self.provider.clone())
    }
}

#[async_trait]
impl EscrowLedger for EthLedger {
    fn signer_address(&self) -> Address {
        self.signer
    }

    async fn job(&self, job_id: u64) -> Result<Option<JobChainView>, LedgerError> {
        let view = match self.contract().jobs(U256::from(job_id)).call().await {
            Ok(ret) => JobChainView {
                id: ret.jobId,
                client: ret.client,
                freelancer: ret.freelancer,
                amount: ret.amount,
                description: ret.description,
                is_settled: ret.isSettled,
                is_approved: ret.isApproved,
            },
            Err(alloy::contract::Error::TransportError(RpcError::Transport(kind))) => {
                return Err(LedgerError::Transport(kind.to_string()));
            }
            // Node-level execution failures read as "no such job".
            Err(e) => {
                warn!("Ledger job read failed for job {}: {}", job_id, e);
                return Ok(None);
            }
        };

        // Mapping reads never revert: a missing key comes back zeroed.
        if view.client == Address::ZERO {
            return Ok(None);
        }
        Ok(Some(view))
    }

    async fn signer_balance(&self) -> Result<U256, LedgerError> {
        Ok(self.provider.get_balance(self.signer).await?)
    }

    async fn pending_nonce(&self) -> Result<u64, LedgerError> {
        Ok(self
            .provider
            .get_transaction_count(self.signer)
            .pending()
            .await?)
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        Ok(self.provider.get_gas_price().await?)
    }

    async fn submit_release(
        &self,
        job_id: u64,
        nonce: u64,
        gas_price: u128,
    ) -> Result<String, LedgerError> {
        let pending = self
            .contract()
            .releaseFunds(U256::from(job_id))
            .nonce(nonce)
            .gas(self.gas_limit)
            .gas_price(gas_price)
            .send()
            .await
            .map_err(|e| LedgerError::Rejected(e.to_string()))?;

        Ok(pending.tx_hash().to_string())
    }

    async fn receipt_status(&self, tx_hash: &str) -> Result<Option<bool>, LedgerError> {
        let hash: B256 = tx_hash
            .parse()
            .map_err(|e| LedgerError::Config(format!("invalid tx hash: {}", e)))?;
        let receipt = self.provider.get_transaction_receipt(hash).await?;
        Ok(receipt.map(|r| r.status()))
    }
}
