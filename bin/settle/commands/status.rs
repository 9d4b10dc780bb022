//! Status command - show one job record

use super::decode;
use anyhow::Result;
use colored::Colorize;
use serde_json::Value;

pub async fn run(server: &str, job_id: u64) -> Result<()> {
    let resp = reqwest::Client::new()
        .get(format!("{}/jobs/{}", server, job_id))
        .send()
        .await?;
    let job: Value = decode(resp).await?;

    let status = job["status"].as_str().unwrap_or("-");
    let status_colored = match status {
        "PAID" => status.green().bold(),
        "ASSIGNED" => status.cyan().bold(),
        _ => status.yellow().bold(),
    };

    println!("  Job:        #{}", job["chain_job_id"]);
    println!("  Title:      {}", job["title"].as_str().unwrap_or("-"));
    println!("  Status:     {}", status_colored);
    println!("  Amount:     {} MNEE", job["amount_mnee"]);
    println!("  Client:     {}", job["client_name"].as_str().unwrap_or("-"));
    println!(
        "  Freelancer: {}",
        job["freelancer_name"].as_str().unwrap_or("-")
    );
    match job["settlement_tx"].as_str() {
        Some(tx) => println!("  Payout Tx:  {}", tx.cyan()),
        None => println!("  Payout Tx:  {}", "none".dimmed()),
    }
    if let Some(applicants) = job["applicants"].as_array() {
        if !applicants.is_empty() {
            let names: Vec<&str> = applicants.iter().filter_map(|a| a.as_str()).collect();
            println!("  Applicants: {}", names.join(", "));
        }
    }
    Ok(())
}
