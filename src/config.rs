//! Engine Configuration
//!
//! Env-backed configuration for the three external boundaries:
//! - Adjudication service (chat-completions API)
//! - Escrow ledger (JSON-RPC endpoint, contract, signer)
//! - Durable record store (SQLite path)

/// Adjudication service configuration
#[derive(Debug, Clone)]
pub struct AdjudicatorConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for AdjudicatorConfig {
    fn default() -> Self {
        Self {
            api_base: std::env::var("LLM_API_BASE")
                .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: std::env::var("LLM_MODEL")
                .unwrap_or_else(|_| "anthropic/claude-3-haiku".to_string()),
            max_tokens: 1024,
            temperature: 0.0,
            timeout_secs: 60,
        }
    }
}

/// Escrow ledger configuration
///
/// `signer_key` is carried as an opaque string and parsed exactly once
/// when the ledger client connects; it is never logged.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub escrow_address: String,
    pub signer_key: String,
    /// Fixed gas limit for the release transaction.
    pub gas_limit: u64,
    /// How long to wait for a confirmed receipt before giving up.
    pub confirm_timeout_secs: u64,
    /// Receipt poll interval while waiting for confirmation.
    pub confirm_poll_ms: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: std::env::var("LEDGER_RPC_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string()),
            escrow_address: std::env::var("ESCROW_ADDRESS")
                .unwrap_or_else(|_| "0x57e9Bd08Af827AE3D19CBDa714114EbCFcA6f35c".to_string()),
            signer_key: std::env::var("SETTLEMENT_SIGNER_KEY").unwrap_or_default(),
            gas_limit: 200_000,
            confirm_timeout_secs: 120,
            confirm_poll_ms: 2_000,
        }
    }
}

/// Durable store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::var("SETTLEMENT_DB")
                .unwrap_or_else(|_| "./data/settlement.db".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_adjudicator_env_fallbacks() {
        std::env::remove_var("LLM_API_BASE");
        std::env::remove_var("LLM_MODEL");
        let cfg = AdjudicatorConfig::default();
        assert_eq!(cfg.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(cfg.timeout_secs, 60);

        std::env::set_var("LLM_MODEL", "test-model");
        let cfg = AdjudicatorConfig::default();
        assert_eq!(cfg.model, "test-model");
        std::env::remove_var("LLM_MODEL");
    }

    #[test]
    #[serial]
    fn test_ledger_defaults() {
        std::env::remove_var("LEDGER_RPC_URL");
        let cfg = LedgerConfig::default();
        assert_eq!(cfg.gas_limit, 200_000);
        assert_eq!(cfg.confirm_timeout_secs, 120);
        assert_eq!(cfg.confirm_poll_ms, 2_000);
    }

    #[test]
    #[serial]
    fn test_store_env_fallback() {
        std::env::remove_var("SETTLEMENT_DB");
        assert_eq!(StoreConfig::default().db_path, "./data/settlement.db");

        std::env::set_var("SETTLEMENT_DB", "/tmp/records.db");
        assert_eq!(StoreConfig::default().db_path, "/tmp/records.db");
        std::env::remove_var("SETTLEMENT_DB");
    }
}
