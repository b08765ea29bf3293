use std::sync::Arc;

use axum::{routing::get, Router};

use queue_cell::handlers::QueueState;
use queue_cell::router::create_queue_router;

pub fn create_router(state: Arc<QueueState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ClinicFlow Queue API is running!" }))
        .nest("/queue", create_queue_router(state))
}
