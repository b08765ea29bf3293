use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::{auth::User, error::AppError};

use crate::models::{
    CallNextRequest, CheckInRequest, DepartmentQuery, MoveRequest, UpdateStatusRequest,
    VisitStatus,
};
use crate::services::lifecycle::QueueLifecycleService;

/// Shared state for the queue routes.
pub struct QueueState {
    pub config: Arc<AppConfig>,
    pub lifecycle: Arc<QueueLifecycleService>,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Fractions are carried exactly inside the cell; percentages rounded to
/// one decimal place exist only at this boundary.
fn percent(fraction: f64) -> f64 {
    round1(fraction * 100.0)
}

/// Check a patient in to the queue
pub async fn check_in(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Check-in request from staff {}", user.id);

    let (entry, estimate) = state.lifecycle.enqueue(request).await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry,
        "estimated_wait_time_minutes": estimate
    })))
}

/// Ordered queue snapshot, optionally scoped to a department
pub async fn list_queue(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Query(query): Query<DepartmentQuery>,
) -> Result<Json<Value>, AppError> {
    info!("Queue snapshot request from staff {}", user.id);

    let entries = state.lifecycle.list(query.department.as_deref()).await?;

    Ok(Json(json!({
        "count": entries.len(),
        "entries": entries
    })))
}

/// Single entry, with a freshly recomputed wait estimate while waiting
pub async fn get_entry(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Entry {} requested by staff {}", entry_id, user.id);

    let entry = state.lifecycle.get(entry_id).await?;
    let estimate = if entry.status == VisitStatus::Waiting {
        Some(state.lifecycle.estimated_wait_for(&entry).await?)
    } else {
        None
    };

    Ok(Json(json!({
        "entry": entry,
        "estimated_wait_time_minutes": estimate
    })))
}

/// Call the next eligible waiting patient
pub async fn call_next(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Query(query): Query<DepartmentQuery>,
    body: Option<Json<CallNextRequest>>,
) -> Result<Json<Value>, AppError> {
    info!("Call-next request from staff {}", user.id);

    let assignment = body.map(|Json(b)| b).unwrap_or_default();
    let entry = state
        .lifecycle
        .call_next(query.department.as_deref(), assignment)
        .await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry
    })))
}

/// Apply a status change (sanctioned transition or staff override)
pub async fn update_status(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Status update for entry {} to {} from staff {}",
        entry_id, request.status, user.id
    );

    let entry = state.lifecycle.set_status(entry_id, request).await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry
    })))
}

/// Swap the entry with its neighbor in the displayed ordering
pub async fn move_entry(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<Value>, AppError> {
    info!("Move request for entry {} from staff {}", entry_id, user.id);

    let entry = state
        .lifecycle
        .move_entry(entry_id, request.direction)
        .await?;

    Ok(Json(json!({
        "success": true,
        "entry": entry
    })))
}

/// Permanently discard an entry, regardless of status
pub async fn remove_entry(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Remove request for entry {} from staff {}", entry_id, user.id);

    state.lifecycle.remove(entry_id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Queue entry removed"
    })))
}

/// Daily queue metrics, recomputed on demand
pub async fn queue_metrics(
    State(state): State<Arc<QueueState>>,
    Extension(user): Extension<User>,
    Query(query): Query<DepartmentQuery>,
) -> Result<Json<Value>, AppError> {
    info!("Metrics request from staff {}", user.id);

    let metrics = state.lifecycle.metrics(query.department.as_deref()).await?;

    Ok(Json(json!({
        "department": metrics.department,
        "total_waiting": metrics.total_waiting,
        "called_today": metrics.called_today,
        "completed_today": metrics.completed_today,
        "no_show_today": metrics.no_show_today,
        "average_wait_time_minutes": round1(metrics.average_wait_time_minutes),
        "no_show_rate_percent": percent(metrics.no_show_rate),
        "completion_rate_percent": percent(metrics.completion_rate),
        "throughput_per_hour": round1(metrics.throughput_per_hour)
    })))
}
