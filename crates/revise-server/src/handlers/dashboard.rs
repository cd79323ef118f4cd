//! Dashboard and today's selection handlers

use crate::error::ApiError;
use crate::services::dashboard::DashboardView;
use crate::AppState;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use revise_core::DailySelection;
use serde::Serialize;

const DASHBOARD_CACHE_CONTROL: &str = "public, max-age=43200, stale-while-revalidate=60";

#[derive(Debug, Serialize)]
struct Envelope<T> {
    status: &'static str,
    #[serde(flatten)]
    body: T,
}

fn success<T>(body: T) -> Json<Envelope<T>> {
    Json(Envelope {
        status: "success",
        body,
    })
}

pub async fn today(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let selection: DailySelection = state.dashboard.today().await?;

    Ok(([(header::CACHE_CONTROL, "no-store")], success(selection)))
}

pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let view: DashboardView = state.dashboard.dashboard().await?;

    Ok(([(header::CACHE_CONTROL, DASHBOARD_CACHE_CONTROL)], success(view)))
}
