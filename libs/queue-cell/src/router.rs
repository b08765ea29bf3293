use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    call_next, check_in, get_entry, list_queue, move_entry, queue_metrics, remove_entry,
    update_status,
};
use crate::QueueState;

pub fn create_queue_router(state: Arc<QueueState>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(check_in).get(list_queue))
        .route("/call-next", post(call_next))
        .route("/metrics", get(queue_metrics))
        .route("/{entry_id}", get(get_entry).delete(remove_entry))
        .route("/{entry_id}/status", put(update_status))
        .route("/{entry_id}/move", put(move_entry))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
