//! Backup binary for copying the scheduler database to a backup file.
//!
//! Usage: cargo run --bin backup
//!        cargo run --bin backup -- --target my_backup.db
//!        cargo run --bin backup -- --db sqlite:other.db --target backup.db
//!
//! Copies every task, ids included, into a fresh database file.

use anyhow::{bail, Result};
use chrono::Datelike;
use clap::Parser;
use std::path::Path;

use scheduler::config::DEFAULT_DATABASE_URL;
use scheduler::db;

#[derive(Parser, Debug)]
#[command(name = "backup")]
#[command(about = "Backup the scheduler database to a new file")]
struct Args {
    /// Source database URL (overrides DATABASE_URL from .env)
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    db: String,

    /// Target backup file path (default: backup_{year}_{month}_{day}.db)
    #[arg(long)]
    target: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Generate target filename
    let now = chrono::Utc::now();
    let default_target = format!("backup_{}_{:02}_{:02}.db", now.year(), now.month(), now.day());
    let target_file = args.target.unwrap_or(default_target);
    if Path::new(&target_file).exists() {
        bail!("Backup target {} already exists", target_file);
    }
    let target_url = format!("sqlite:{}?mode=rwc", target_file);

    println!("Source database: {}", args.db);
    println!("Target backup: {}", target_file);

    println!("Connecting to source database...");
    let source_pool = db::init_db(&args.db).await?;

    // init_db creates the schema in the new file
    println!("Creating target database...");
    let target_pool = db::init_db(&target_url).await?;

    println!("Copying tasks...");
    let tasks = db::all_tasks(&source_pool).await?;
    for task in &tasks {
        db::restore_task(&target_pool, task).await?;
    }
    println!("  Copied {} tasks", tasks.len());

    println!("\nBackup completed successfully!");
    println!("Backup saved to: {}", target_file);

    Ok(())
}
