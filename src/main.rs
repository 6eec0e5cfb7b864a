use std::fs;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scheduler::config::{self, Config};
use scheduler::db;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine, settings then come from flags and the environment
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let config = Config::parse();
    config::init_timezone(&config.timezone);

    // Initialize database
    let pool = db::init_db(&config.database_url).await?;
    tracing::info!("Database initialized at: {}", config.database_url);

    fs::create_dir_all(&config.web_dir)?;
    let app = scheduler::app(pool, &config.web_dir);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Server is listening on port {}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}
