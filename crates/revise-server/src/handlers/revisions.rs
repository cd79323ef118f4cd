//! Revision commit handler

use crate::error::ApiError;
use crate::extractors::SecretToken;
use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use revise_core::{ProblemId, RevisionRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CommitParams {
    id1: Option<String>,
    id2: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommitResponse {
    status: &'static str,
    message: String,
    updated_ids: Vec<ProblemId>,
}

pub async fn commit(
    State(state): State<AppState>,
    _token: SecretToken,
    Query(params): Query<CommitParams>,
) -> Result<Json<CommitResponse>, ApiError> {
    let request = RevisionRequest::parse(params.id1.as_deref(), params.id2.as_deref())?;

    let updated_ids = state.recorder.record_revision(request).await?;
    info!("Revision committed for {:?}", updated_ids);

    let listed = updated_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    Ok(Json(CommitResponse {
        status: "success",
        message: format!("Revisions updated successfully for ID(s): {}", listed),
        updated_ids,
    }))
}
