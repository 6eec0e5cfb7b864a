//! Seed binary for populating the scheduler database with initial tasks.
//!
//! Usage: cargo run --bin seed
//!        cargo run --bin seed -- --file other.toml
//!
//! Reads tasks from a TOML file, validates each one against today's date
//! and inserts it into the database.

use anyhow::Result;
use clap::Parser;
use serde::Deserialize;
use std::fs;

use scheduler::config::{self, DEFAULT_DATABASE_URL};
use scheduler::db;
use scheduler::task::Task;

#[derive(Parser, Debug)]
#[command(name = "seed")]
#[command(about = "Load tasks from a TOML file into the scheduler database")]
struct Args {
    /// Database URL (overrides DATABASE_URL from .env)
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    db: String,

    /// Seed file to read
    #[arg(long, default_value = "seed.toml")]
    file: String,

    /// Timezone deciding which day is "today"
    #[arg(long, env = "TODO_TZ", default_value = "UTC")]
    timezone: String,
}

#[derive(Debug, Deserialize)]
struct SeedData {
    tasks: Vec<SeedTask>,
}

#[derive(Debug, Deserialize)]
struct SeedTask {
    title: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    repeat: String,
}

impl From<SeedTask> for Task {
    fn from(seed: SeedTask) -> Self {
        Task {
            id: String::new(), // Will be assigned by database
            date: seed.date,
            title: seed.title,
            comment: seed.comment,
            repeat: seed.repeat,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    config::init_timezone(&args.timezone);

    println!("Seeding database...");

    let pool = db::init_db(&args.db).await?;
    println!("Connected to database: {}", args.db);

    let seed_content = fs::read_to_string(&args.file)?;
    let seed_data: SeedData = toml::from_str(&seed_content)?;

    println!("Found {} tasks to seed", seed_data.tasks.len());

    let today = config::today();
    for seed_task in seed_data.tasks {
        let mut task = Task::from(seed_task);
        if let Err(e) = task.validate(today) {
            println!("  ✗ Skipped task {:?}: {}", task.title, e);
            continue;
        }

        match db::insert_task(&pool, &task).await {
            Ok(id) => println!("  ✓ Created task: {} on {} (id: {})", task.title, task.date, id),
            Err(e) => println!("  ✗ Failed to create task {}: {}", task.title, e),
        }
    }

    println!("Seeding complete!");

    Ok(())
}
