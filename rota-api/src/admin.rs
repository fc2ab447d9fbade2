use axum::{
    extract::{Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use rota_core::model::{AutoCancellationLog, SweepSettings};
use rota_tasks::SweepReport;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct RunSweepRequest {
    /// Overrides the persisted timeout for this run only.
    pub timeout_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CancellationLogsQuery {
    pub user_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/admin/sweep", post(run_sweep))
        .route("/v1/admin/settings", get(get_settings))
        .route("/v1/admin/settings", put(update_settings))
        .route("/v1/admin/cancellation-logs", get(list_cancellation_logs))
}

/// POST /v1/admin/sweep: run one auto-cancellation pass on demand.
async fn run_sweep(
    State(state): State<AppState>,
    body: Option<Json<RunSweepRequest>>,
) -> Result<Json<SweepReport>, ApiError> {
    let timeout_override = body.and_then(|Json(req)| req.timeout_minutes);
    if let Some(minutes) = timeout_override {
        if minutes < 0 {
            return Err(ApiError::Validation(
                "timeout_minutes must be non-negative".to_string(),
            ));
        }
    }
    Ok(Json(state.sweeper.run_sweep(timeout_override).await))
}

async fn get_settings(State(state): State<AppState>) -> Result<Json<SweepSettings>, ApiError> {
    Ok(Json(state.settings.sweep_settings().await?))
}

async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<SweepSettings>,
) -> Result<Json<SweepSettings>, ApiError> {
    if settings.timeout_minutes < 0 {
        return Err(ApiError::Validation(
            "timeout_minutes must be non-negative".to_string(),
        ));
    }
    state.settings.update_sweep_settings(settings).await?;
    Ok(Json(settings))
}

async fn list_cancellation_logs(
    State(state): State<AppState>,
    Query(query): Query<CancellationLogsQuery>,
) -> Result<Json<Vec<AutoCancellationLog>>, ApiError> {
    let logs = state.reservations.cancellation_logs(query.user_id).await?;
    Ok(Json(logs))
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
