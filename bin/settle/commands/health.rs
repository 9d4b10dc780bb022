//! Health command - check server liveness

use anyhow::Result;
use colored::Colorize;

pub async fn run(server: &str) -> Result<()> {
    match reqwest::Client::new()
        .get(format!("{}/health", server))
        .send()
        .await
    {
        Ok(resp) if resp.status().is_success() => {
            println!("  {} {}", "Online:".green().bold(), server);
        }
        Ok(resp) => {
            println!("  {} {} ({})", "Degraded:".yellow().bold(), server, resp.status());
        }
        Err(e) => {
            println!("  {} {} ({})", "Offline:".red().bold(), server, e);
        }
    }
    Ok(())
}
