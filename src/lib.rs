pub mod config;
pub mod db;
pub mod schedule;
pub mod task;
pub mod tasks;

use std::path::Path;

use axum::Router;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::db::DbPool;

/// The whole HTTP application: the JSON API under `/api` and the static
/// frontend from `web_dir` for every other path.
pub fn app(pool: DbPool, web_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .nest("/api", tasks::router())
        .with_state(pool)
        .fallback_service(ServeDir::new(web_dir))
        .layer(TraceLayer::new_for_http())
}
