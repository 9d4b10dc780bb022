//! Submit command - send work for adjudication and settlement

use super::{decode, print_outcome, SubmitReply};
use anyhow::{anyhow, Result};
use colored::Colorize;
use std::path::PathBuf;

pub async fn run(
    server: &str,
    job_id: u64,
    notes: &str,
    freelancer: Option<String>,
    files: Vec<PathBuf>,
) -> Result<()> {
    let mut form = reqwest::multipart::Form::new()
        .text("job_id", job_id.to_string())
        .text("notes", notes.to_string());

    if let Some(name) = freelancer {
        form = form.text("freelancer_name", name);
    }

    for path in &files {
        if !path.exists() {
            return Err(anyhow!("File not found: {}", path.display()));
        }
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let bytes = std::fs::read(path)?;
        form = form.part(
            "files",
            reqwest::multipart::Part::bytes(bytes).file_name(name),
        );
    }

    println!(
        "  {} job #{} with {} file(s)...",
        "Submitting".bold(),
        job_id,
        files.len()
    );

    let resp = reqwest::Client::new()
        .post(format!("{}/submit", server))
        .multipart(form)
        .send()
        .await?;

    let reply: SubmitReply = decode(resp).await?;
    println!();
    print_outcome(&reply);
    Ok(())
}
