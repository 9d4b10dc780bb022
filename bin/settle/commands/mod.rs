pub mod health;
pub mod index;
pub mod jobs;
pub mod retry;
pub mod status;
pub mod submissions;
pub mod submit;

use anyhow::{anyhow, Result};
use colored::Colorize;
use serde::Deserialize;

/// Workflow outcome as returned by `/submit` and `/jobs/:id/settle`.
#[derive(Debug, Deserialize)]
pub struct SubmitReply {
    pub verdict: String,
    pub reason: String,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

/// Decode a response, turning non-2xx bodies into readable errors.
pub async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let detail = match resp.json::<ErrorReply>().await {
        Ok(e) => e.error,
        Err(_) => status.to_string(),
    };
    Err(anyhow!("{} ({})", detail, status))
}

pub fn print_outcome(reply: &SubmitReply) {
    let verdict = match reply.verdict.as_str() {
        "PASS" => "PASS".green().bold(),
        other => other.red().bold(),
    };
    println!("  Verdict: {}", verdict);
    println!("  Reason:  {}", reply.reason);
    match &reply.tx_hash {
        Some(tx) => println!("  Payout:  {}", tx.cyan()),
        None => println!("  Payout:  {}", "none".dimmed()),
    }
}
