//! Retry command - re-drive settlement for an unpaid PASS job

use super::{decode, print_outcome, SubmitReply};
use anyhow::Result;
use colored::Colorize;

pub async fn run(server: &str, job_id: u64) -> Result<()> {
    println!("  {} settlement for job #{}...", "Retrying".bold(), job_id);

    let resp = reqwest::Client::new()
        .post(format!("{}/jobs/{}/settle", server, job_id))
        .send()
        .await?;

    let reply: SubmitReply = decode(resp).await?;
    println!();
    print_outcome(&reply);
    Ok(())
}
