use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Parser;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:scheduler.db?mode=rwc";

/// Global timezone setting for the application
static APP_TIMEZONE: OnceLock<Tz> = OnceLock::new();

/// Server settings, read from flags first and the environment (or `.env`) second.
#[derive(Parser, Debug, Clone)]
#[command(name = "scheduler")]
#[command(about = "Task scheduler with recurring due dates")]
pub struct Config {
    /// Port the HTTP server listens on
    #[arg(long, env = "TODO_PORT", default_value_t = 7540)]
    pub port: u16,

    /// SQLite database URL
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Directory with the static frontend
    #[arg(long, env = "TODO_WEB_DIR", default_value = "web")]
    pub web_dir: PathBuf,

    /// IANA timezone that decides which calendar day is "today"
    #[arg(long, env = "TODO_TZ", default_value = "UTC")]
    pub timezone: String,
}

/// Initialize the timezone from the given string
pub fn init_timezone(tz_str: &str) {
    let timezone: Tz = tz_str.parse().unwrap_or_else(|_| {
        tracing::warn!("Invalid timezone '{}', falling back to UTC", tz_str);
        chrono_tz::UTC
    });

    if APP_TIMEZONE.set(timezone).is_err() {
        tracing::warn!("Timezone already initialized");
    }
}

/// Get the configured timezone
pub fn get_timezone() -> Tz {
    *APP_TIMEZONE.get().unwrap_or(&chrono_tz::UTC)
}

/// The current calendar day in the configured timezone.
pub fn today() -> NaiveDate {
    Utc::now().with_timezone(&get_timezone()).date_naive()
}
