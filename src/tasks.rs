use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config;
use crate::db::{self, DbPool};
use crate::schedule::{self, RepeatError};
use crate::task::{Completion, Task, ValidationError};

/// Most tasks returned by a single list request.
pub const TASK_LIMIT: i64 = 50;

pub fn router() -> Router<DbPool> {
    Router::new()
        .route("/nextdate", get(next_date))
        .route(
            "/task",
            get(get_task).post(create_task).put(update_task).delete(delete_task),
        )
        .route("/task/done", post(complete_task))
        .route("/tasks", get(list_tasks))
}

// ============================================================================
// Errors
// ============================================================================

/// Error body sent as `{"error": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: "task not found".to_string(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::bad_request(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Storage error: {:#}", err);
        ApiError::internal("internal server error")
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        ApiError::bad_request("invalid JSON body")
    }
}

fn require_id(raw: &str) -> Result<i64, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ApiError::bad_request("task id is required"));
    }
    // Ids are numeric, so anything else cannot name a stored task
    raw.parse().map_err(|_| ApiError::not_found())
}

// ============================================================================
// Handlers
// ============================================================================

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct NextDateQuery {
    now: String,
    date: String,
    repeat: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct IdQuery {
    id: String,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SearchQuery {
    search: String,
}

// GET /api/nextdate?now=&date=&repeat= - Plain-text next due date
async fn next_date(Query(query): Query<NextDateQuery>) -> Result<String, ApiError> {
    let now = schedule::parse_date(&query.now)
        .map_err(|_| ApiError::bad_request("invalid now parameter"))?;

    schedule::next_date(now, &query.date, &query.repeat)
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

// POST /api/task - Validate and store a new task
async fn create_task(
    State(pool): State<DbPool>,
    payload: Result<Json<Task>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(mut task) = payload?;
    task.validate(config::today())?;

    let id = db::insert_task(&pool, &task).await?;
    tracing::info!(id, date = %task.date, "Task created");

    Ok(Json(json!({ "id": id })))
}

// GET /api/task?id= - Fetch a single task
async fn get_task(
    State(pool): State<DbPool>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Task>, ApiError> {
    let id = require_id(&query.id)?;

    db::get_task(&pool, id)
        .await?
        .map(Json)
        .ok_or_else(ApiError::not_found)
}

// PUT /api/task - Replace date, title, comment and repeat of a task
async fn update_task(
    State(pool): State<DbPool>,
    payload: Result<Json<Task>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(mut task) = payload?;
    if task.id.trim().is_empty() {
        return Err(ApiError::bad_request("task id is required"));
    }

    task.validate(config::today())?;

    if !db::update_task(&pool, &task).await? {
        return Err(ApiError::not_found());
    }
    tracing::info!(id = %task.id, date = %task.date, "Task updated");

    Ok(Json(json!({})))
}

// DELETE /api/task?id= - Remove a task
async fn delete_task(
    State(pool): State<DbPool>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = require_id(&query.id)?;

    if !db::delete_task(&pool, id).await? {
        return Err(ApiError::not_found());
    }
    tracing::info!(id, "Task deleted");

    Ok(Json(json!({})))
}

// POST /api/task/done?id= - Delete a one-off task or move a recurring one forward
async fn complete_task(
    State(pool): State<DbPool>,
    Query(query): Query<IdQuery>,
) -> Result<Json<Value>, ApiError> {
    let id = require_id(&query.id)?;

    match db::complete_task(&pool, id, config::today()).await {
        Ok(Some(Completion::Remove)) => tracing::info!(id, "One-off task done, removed"),
        Ok(Some(Completion::Reschedule(date))) => tracing::info!(id, %date, "Task done, rescheduled"),
        Ok(None) => return Err(ApiError::not_found()),
        Err(err) => {
            if let Some(rule_err) = err.downcast_ref::<RepeatError>() {
                tracing::warn!(id, "Failed to compute next date: {}", rule_err);
                return Err(ApiError::internal(ValidationError::DateAdvancementFailed.to_string()));
            }
            return Err(err.into());
        }
    }

    Ok(Json(json!({})))
}

// GET /api/tasks?search= - List tasks, optionally filtered
async fn list_tasks(
    State(pool): State<DbPool>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Value>, ApiError> {
    let tasks = db::list_tasks(&pool, &query.search, TASK_LIMIT).await?;
    Ok(Json(json!({ "tasks": tasks })))
}
