//! Settlement Engine Server
//!
//! Runs the adjudicated settlement workflow as a standalone HTTP server.

use anyhow::Result;
use clap::Parser;
use settlement_engine::{
    AdjudicationClient, AdjudicatorConfig, EthLedger, ExecutorConfig, LedgerConfig, RpcConfig,
    SettlementExecutor, SettlementOrchestrator, SettlementRpc, SqliteStore, StoreConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "settle-server")]
#[command(about = "Adjudicated Settlement Engine HTTP Server")]
struct Args {
    /// Server port
    #[arg(short, long, default_value = "8080", env = "SETTLE_PORT")]
    port: u16,

    /// Server host
    #[arg(long, default_value = "0.0.0.0", env = "SETTLE_HOST")]
    host: String,

    /// SQLite database path (falls back to SETTLEMENT_DB, then the
    /// built-in default)
    #[arg(short, long)]
    db_path: Option<PathBuf>,

    /// Ledger JSON-RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:8545", env = "LEDGER_RPC_URL")]
    rpc_url: String,

    /// Escrow contract address
    #[arg(long, env = "ESCROW_ADDRESS")]
    escrow_address: String,

    /// Settlement signer private key
    #[arg(long, env = "SETTLEMENT_SIGNER_KEY", hide_env_values = true)]
    signer_key: String,

    /// Adjudication API base URL
    #[arg(long, default_value = "https://openrouter.ai/api/v1", env = "LLM_API_BASE")]
    llm_api_base: String,

    /// Adjudication API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    llm_api_key: String,

    /// Adjudication model
    #[arg(long, default_value = "anthropic/claude-3-haiku", env = "LLM_MODEL")]
    llm_model: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("settlement_engine=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let db_path = args
        .db_path
        .unwrap_or_else(|| PathBuf::from(StoreConfig::default().db_path));

    info!("Starting Settlement Engine Server");
    info!("  Database: {:?}", db_path);
    info!("  Ledger RPC: {}", args.rpc_url);
    info!("  Escrow: {}", args.escrow_address);
    info!("  Judge model: {}", args.llm_model);
    info!("  Listening on: {}:{}", args.host, args.port);

    let store = Arc::new(SqliteStore::new(db_path)?);

    let ledger_config = LedgerConfig {
        rpc_url: args.rpc_url,
        escrow_address: args.escrow_address,
        signer_key: args.signer_key,
        ..LedgerConfig::default()
    };
    let ledger = Arc::new(EthLedger::connect(&ledger_config)?);

    let executor = Arc::new(SettlementExecutor::new(
        ledger.clone(),
        ExecutorConfig {
            confirm_timeout_secs: ledger_config.confirm_timeout_secs,
            confirm_poll_ms: ledger_config.confirm_poll_ms,
        },
    ));

    // Connectivity preflight: surface an unreachable ledger RPC at
    // startup rather than on the first submission.
    match executor.job_on_ledger(0).await {
        Ok(_) => info!("Ledger RPC reachable, signer {}", executor.signer_address()),
        Err(e) => warn!("Ledger RPC preflight failed: {}", e),
    }

    let adjudicator = Arc::new(AdjudicationClient::new(AdjudicatorConfig {
        api_base: args.llm_api_base,
        api_key: args.llm_api_key,
        model: args.llm_model,
        ..AdjudicatorConfig::default()
    })?);

    let orchestrator = Arc::new(SettlementOrchestrator::new(
        store.clone(),
        adjudicator,
        executor,
    ));

    let rpc = SettlementRpc::new(
        RpcConfig {
            host: args.host,
            port: args.port,
        },
        store,
        orchestrator,
    );

    info!("Settlement Engine Server ready");

    // Start server (blocks until shutdown)
    rpc.start().await?;

    Ok(())
}
