//! Index command - register an on-chain job with the record store

use super::decode;
use anyhow::Result;
use colored::Colorize;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct IndexReply {
    chain_job_id: u64,
    status: String,
}

#[allow(clippy::too_many_arguments)]
pub async fn run(
    server: &str,
    job_id: u64,
    title: &str,
    description: &str,
    amount: f64,
    client_address: &str,
    client_name: &str,
    tags: Vec<String>,
) -> Result<()> {
    let body = serde_json::json!({
        "chain_job_id": job_id,
        "title": title,
        "description": description,
        "amount_mnee": amount,
        "client_address": client_address,
        "client_name": client_name,
        "tags": tags,
    });

    let resp = reqwest::Client::new()
        .post(format!("{}/jobs", server))
        .json(&body)
        .send()
        .await?;

    let reply: IndexReply = decode(resp).await?;
    println!(
        "  {} job #{}: {}",
        "Indexed".green().bold(),
        reply.chain_job_id,
        reply.status
    );
    Ok(())
}
