//! Submissions command - list evaluated submissions

use super::decode;
use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Table};
use serde_json::Value;

pub async fn run(server: &str, job_id: Option<u64>) -> Result<()> {
    let mut url = format!("{}/submissions", server);
    if let Some(id) = job_id {
        url.push_str(&format!("?job_id={}", id));
    }

    let resp = reqwest::Client::new().get(url).send().await?;
    let subs: Vec<Value> = decode(resp).await?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Job", "Freelancer", "Verdict", "Reason", "Payout Tx", "At"]);

    for sub in &subs {
        let raw = sub["reason"].as_str().unwrap_or("-");
        let mut reason: String = raw.chars().take(48).collect();
        if raw.chars().count() > 48 {
            reason.push('…');
        }
        table.add_row(vec![
            sub["chain_job_id"].to_string(),
            sub["freelancer_name"].as_str().unwrap_or("-").to_string(),
            sub["verdict"].as_str().unwrap_or("-").to_string(),
            reason,
            sub["tx_hash"].as_str().unwrap_or("-").to_string(),
            sub["created_at"].as_str().unwrap_or("-").to_string(),
        ]);
    }

    println!("{table}");
    println!("  {} submission(s)", subs.len());
    Ok(())
}
