//! Clear binary for resetting the scheduler database.
//!
//! Usage: cargo run --bin clear
//!
//! Deletes every task.

use anyhow::Result;

use scheduler::config::DEFAULT_DATABASE_URL;
use scheduler::db;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

    println!("Connecting to database: {}", database_url);
    let pool = db::init_db(&database_url).await?;

    println!("Clearing scheduler table...");
    let removed = db::clear_tasks(&pool).await?;

    println!("Removed {} tasks", removed);

    Ok(())
}
