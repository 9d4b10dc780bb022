//! Jobs command - list indexed jobs

use super::decode;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use serde_json::Value;

pub async fn run(server: &str) -> Result<()> {
    let resp = reqwest::Client::new()
        .get(format!("{}/jobs", server))
        .send()
        .await?;
    let jobs: Vec<Value> = decode(resp).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Job", "Title", "Status", "Amount", "Freelancer", "Payout Tx"]);

    for job in &jobs {
        table.add_row(vec![
            job["chain_job_id"].to_string(),
            job["title"].as_str().unwrap_or("-").to_string(),
            job["status"].as_str().unwrap_or("-").to_string(),
            job["amount_mnee"].to_string(),
            job["freelancer_name"].as_str().unwrap_or("-").to_string(),
            job["settlement_tx"].as_str().unwrap_or("-").to_string(),
        ]);
    }

    println!("{table}");
    println!("  {} job(s)", jobs.len());
    Ok(())
}
