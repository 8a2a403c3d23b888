//! Task tracker server.
//!
//! REST API over a Redis document store, request metrics exported for
//! Prometheus, and the compiled frontend served as static files.

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub mod config;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod state;
pub mod store;

use routes::{
    create_task, delete_task, get_task, health, list_tasks, update_task, welcome,
};
use state::AppState;

/// Directory holding the built frontend; `/` resolves to its `index.html`.
pub const PUBLIC_DIR: &str = "frontend/dist";

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api", get(welcome))
        .route("/health", get(health))
        .route("/metrics", get(routes::metrics))
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .fallback_service(ServeDir::new(PUBLIC_DIR))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics::track_metrics,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
