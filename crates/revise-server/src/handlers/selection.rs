//! Selection job triggers

use crate::error::ApiError;
use crate::extractors::{CronSecret, SecretToken};
use crate::services::selection::SelectionOutcome;
use crate::AppState;
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    status: &'static str,
    #[serde(flatten)]
    outcome: SelectionOutcome,
}

/// Run the selection job (`?token=` protected)
pub async fn hit_main(
    State(state): State<AppState>,
    _token: SecretToken,
) -> Result<Json<SelectionResponse>, ApiError> {
    let outcome = state.selection.run().await?;
    info!("Selection job finished: {} picks", outcome.questions.len());

    Ok(Json(SelectionResponse {
        status: "success",
        outcome,
    }))
}

/// Scheduled trigger (bearer protected); runs the same job in-process
pub async fn daily_update(
    State(state): State<AppState>,
    _cron: CronSecret,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.selection.run().await?;
    info!("Daily update finished: {} picks", outcome.questions.len());

    let data = SelectionResponse {
        status: "success",
        outcome,
    };
    Ok(Json(json!({
        "success": true,
        "data": data,
        "message": "Daily update completed",
    })))
}
