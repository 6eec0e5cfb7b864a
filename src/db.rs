use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqlitePool, SqlitePoolOptions},
    FromRow,
};

use crate::schedule;
use crate::task::{Completion, Task};

pub type DbPool = SqlitePool;

// Search terms in this format match a due date exactly
const SEARCH_DATE_FORMAT: &str = "%d.%m.%Y";

// Marking a task done gives up after this many concurrent edits
const COMPLETE_ATTEMPTS: usize = 3;

pub async fn init_db(database_url: &str) -> Result<DbPool> {
    connect(database_url, 5).await
}

/// Open a pool and make sure the schema exists. In-memory databases live
/// and die with their connection, so open those with `max_connections = 1`.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DbPool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect(database_url)
        .await?;
    create_tables(&pool).await?;
    Ok(pool)
}

async fn create_tables(pool: &DbPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scheduler (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date CHAR(8) NOT NULL DEFAULT '',
            title VARCHAR(128) NOT NULL DEFAULT '',
            comment TEXT NOT NULL DEFAULT '',
            repeat VARCHAR(128) NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_scheduler_date ON scheduler(date)")
        .execute(pool)
        .await?;

    Ok(())
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: i64,
    pub date: String,
    pub title: String,
    pub comment: String,
    pub repeat: String,
}

impl From<DbTask> for Task {
    fn from(row: DbTask) -> Self {
        Task {
            id: row.id.to_string(),
            date: row.date,
            title: row.title,
            comment: row.comment,
            repeat: row.repeat,
        }
    }
}

// Insert an already validated task and return its new id
pub async fn insert_task(pool: &DbPool, task: &Task) -> Result<i64> {
    let result = sqlx::query("INSERT INTO scheduler (date, title, comment, repeat) VALUES (?, ?, ?, ?)")
        .bind(&task.date)
        .bind(&task.title)
        .bind(&task.comment)
        .bind(&task.repeat)
        .execute(pool)
        .await?;

    Ok(result.last_insert_rowid())
}

// Get a task by ID from the database
pub async fn get_task(pool: &DbPool, task_id: i64) -> Result<Option<Task>> {
    let row: Option<DbTask> =
        sqlx::query_as("SELECT id, date, title, comment, repeat FROM scheduler WHERE id = ?")
            .bind(task_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(Task::from))
}

// Replace every field of an existing task. Returns false when no task has that id.
pub async fn update_task(pool: &DbPool, task: &Task) -> Result<bool> {
    let Ok(task_id) = task.id.trim().parse::<i64>() else {
        return Ok(false);
    };

    let result = sqlx::query("UPDATE scheduler SET date = ?, title = ?, comment = ?, repeat = ? WHERE id = ?")
        .bind(&task.date)
        .bind(&task.title)
        .bind(&task.comment)
        .bind(&task.repeat)
        .bind(task_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// Delete a task by ID. Returns false when no task has that id.
pub async fn delete_task(pool: &DbPool, task_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM scheduler WHERE id = ?")
        .bind(task_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// List tasks ordered by due date.
///
/// A blank search lists everything. A search shaped like `DD.MM.YYYY` matches
/// that due date exactly; anything else is a substring match on title or
/// comment (case-insensitive for ASCII).
pub async fn list_tasks(pool: &DbPool, search: &str, limit: i64) -> Result<Vec<Task>> {
    let search = search.trim();

    let rows: Vec<DbTask> = if search.is_empty() {
        sqlx::query_as("SELECT id, date, title, comment, repeat FROM scheduler ORDER BY date, id LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?
    } else if let Some(date) = parse_search_date(search) {
        sqlx::query_as(
            "SELECT id, date, title, comment, repeat FROM scheduler WHERE date = ? ORDER BY date, id LIMIT ?",
        )
        .bind(schedule::format_date(date))
        .bind(limit)
        .fetch_all(pool)
        .await?
    } else {
        let pattern = format!("%{}%", escape_like(search));
        sqlx::query_as(
            "SELECT id, date, title, comment, repeat FROM scheduler WHERE title LIKE ? ESCAPE '\\' OR comment LIKE ? ESCAPE '\\' ORDER BY date, id LIMIT ?",
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?
    };

    Ok(rows.into_iter().map(Task::from).collect())
}

// Exactly DD.MM.YYYY, zero-padded
fn parse_search_date(search: &str) -> Option<NaiveDate> {
    let bytes = search.as_bytes();
    let shaped = bytes.len() == 10
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| if i == 2 || i == 5 { *b == b'.' } else { b.is_ascii_digit() });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(search, SEARCH_DATE_FORMAT).ok()
}

// Make LIKE wildcards in user input match literally (used with ESCAPE '\')
fn escape_like(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len());
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Mark a task done as of `today`.
///
/// Returns `None` when the task does not exist. A failing repeat rule is
/// returned as an error wrapping [`schedule::RepeatError`] and leaves the
/// stored task untouched. The write only lands if the row still holds what
/// was read; an edit in between causes a fresh read.
pub async fn complete_task(pool: &DbPool, task_id: i64, today: NaiveDate) -> Result<Option<Completion>> {
    for _ in 0..COMPLETE_ATTEMPTS {
        let Some(task) = get_task(pool, task_id).await? else {
            return Ok(None);
        };

        let completion = task.complete(today)?;
        if apply_completion(pool, task_id, &task, &completion).await? {
            return Ok(Some(completion));
        }
        tracing::debug!(task_id, "Task changed while being marked done, retrying");
    }

    anyhow::bail!("task {} kept changing while being marked done", task_id)
}

// Delete or reschedule the row only if its date and rule are still those of `seen`
async fn apply_completion(pool: &DbPool, task_id: i64, seen: &Task, completion: &Completion) -> Result<bool> {
    let result = match completion {
        Completion::Remove => {
            sqlx::query("DELETE FROM scheduler WHERE id = ? AND date = ? AND repeat = ?")
                .bind(task_id)
                .bind(&seen.date)
                .bind(&seen.repeat)
                .execute(pool)
                .await?
        }
        Completion::Reschedule(date) => {
            sqlx::query("UPDATE scheduler SET date = ? WHERE id = ? AND date = ? AND repeat = ?")
                .bind(date)
                .bind(task_id)
                .bind(&seen.date)
                .bind(&seen.repeat)
                .execute(pool)
                .await?
        }
    };

    Ok(result.rows_affected() > 0)
}

// Every row with its id, for copying between databases
pub async fn all_tasks(pool: &DbPool) -> Result<Vec<DbTask>> {
    let rows = sqlx::query_as("SELECT id, date, title, comment, repeat FROM scheduler ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

// Insert a row keeping its original id
pub async fn restore_task(pool: &DbPool, row: &DbTask) -> Result<()> {
    sqlx::query("INSERT INTO scheduler (id, date, title, comment, repeat) VALUES (?, ?, ?, ?, ?)")
        .bind(row.id)
        .bind(&row.date)
        .bind(&row.title)
        .bind(&row.comment)
        .bind(&row.repeat)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn clear_tasks(pool: &DbPool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM scheduler").execute(pool).await?;
    Ok(result.rows_affected())
}
