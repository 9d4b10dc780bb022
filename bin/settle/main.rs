//! Settlement Engine operator CLI
//!
//! Talks to a running `settle-server` over HTTP: index jobs, submit work
//! for adjudication, inspect records, and re-drive stuck settlements.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "settle")]
#[command(about = "Adjudicated Settlement Engine CLI")]
struct Cli {
    /// Settlement server URL
    #[arg(
        long,
        global = true,
        default_value = "http://127.0.0.1:8080",
        env = "SETTLE_SERVER"
    )]
    server: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit work for a job (adjudicates and settles on PASS)
    Submit {
        /// Ledger job id
        #[arg(short, long)]
        job_id: u64,

        /// Free-text notes for the judge
        #[arg(short, long, default_value = "")]
        notes: String,

        /// Freelancer display name
        #[arg(short, long)]
        freelancer: Option<String>,

        /// Artifact files to attach (repeatable)
        #[arg(short = 'F', long = "file")]
        files: Vec<PathBuf>,
    },

    /// Index an on-chain job into the record store
    Index {
        #[arg(short, long)]
        job_id: u64,
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        description: String,
        /// Display amount in MNEE
        #[arg(short, long)]
        amount: f64,
        #[arg(long)]
        client_address: String,
        #[arg(long)]
        client_name: String,
        /// Tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List indexed jobs
    Jobs,

    /// List submissions, optionally for one job
    Submissions {
        #[arg(short, long)]
        job_id: Option<u64>,
    },

    /// Show one job record
    Status {
        #[arg(short, long)]
        job_id: u64,
    },

    /// Re-drive settlement for an unpaid PASS job
    Retry {
        #[arg(short, long)]
        job_id: u64,
    },

    /// Check server health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Submit {
            job_id,
            notes,
            freelancer,
            files,
        } => commands::submit::run(&cli.server, job_id, &notes, freelancer, files).await,
        Command::Index {
            job_id,
            title,
            description,
            amount,
            client_address,
            client_name,
            tags,
        } => {
            commands::index::run(
                &cli.server,
                job_id,
                &title,
                &description,
                amount,
                &client_address,
                &client_name,
                tags,
            )
            .await
        }
        Command::Jobs => commands::jobs::run(&cli.server).await,
        Command::Submissions { job_id } => commands::submissions::run(&cli.server, job_id).await,
        Command::Status { job_id } => commands::status::run(&cli.server, job_id).await,
        Command::Retry { job_id } => commands::retry::run(&cli.server, job_id).await,
        Command::Health => commands::health::run(&cli.server).await,
    }
}
