use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{Dataset, DatasetSnapshot, EmailDraft, Movie},
    services::{RefreshOutcome, ToggleOutcome},
};

use super::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleResponse {
    pub outcome: ToggleOutcome,
    pub watchlist_count: usize,
}

fn parse_dataset(raw: &str) -> AppResult<Dataset> {
    raw.parse().map_err(AppError::InvalidInput)
}

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Current state of one dataset
pub async fn get_dataset(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> AppResult<Json<DatasetSnapshot>> {
    let dataset = parse_dataset(&dataset)?;
    Ok(Json(state.controller.snapshot(dataset).await))
}

/// Called when the UI switches to a dataset; fetches only if due
pub async fn activate_dataset(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> AppResult<Json<RefreshOutcome>> {
    let dataset = parse_dataset(&dataset)?;
    Ok(Json(state.controller.activate(dataset).await))
}

/// Explicit refresh requested by the user
pub async fn refresh_dataset(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> AppResult<Json<RefreshOutcome>> {
    let dataset = parse_dataset(&dataset)?;
    Ok(Json(state.controller.refresh(dataset).await))
}

pub async fn compose_email(
    State(state): State<AppState>,
    Path(dataset): Path<String>,
) -> AppResult<Json<EmailDraft>> {
    let dataset = parse_dataset(&dataset)?;
    state
        .controller
        .compose_email(dataset)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{} list is empty", dataset)))
}

pub async fn toggle_watchlist(
    State(state): State<AppState>,
    Json(movie): Json<Movie>,
) -> AppResult<Json<ToggleResponse>> {
    let outcome = state.controller.toggle_watchlist(movie).await?;
    let watchlist_count = state
        .controller
        .snapshot(Dataset::Watchlist)
        .await
        .movies
        .len();

    Ok(Json(ToggleResponse {
        outcome,
        watchlist_count,
    }))
}

/// Adds a movie; 201 when added, 200 when the title was already present
pub async fn add_to_watchlist(
    State(state): State<AppState>,
    Json(movie): Json<Movie>,
) -> AppResult<StatusCode> {
    if movie.title.trim().is_empty() {
        return Err(AppError::InvalidInput("title must not be empty".to_string()));
    }

    if state.controller.add_to_watchlist(movie).await? {
        Ok(StatusCode::CREATED)
    } else {
        Ok(StatusCode::OK)
    }
}

pub async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path(title): Path<String>,
) -> AppResult<StatusCode> {
    if state.controller.remove_from_watchlist(&title).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("{} is not in the watchlist", title)))
    }
}

/// Resets the hits and streaming caches
pub async fn clear_cache(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.controller.clear_cache().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn latest_notification(State(state): State<AppState>) -> Response {
    match state.controller.latest_notification().await {
        Some(notification) => Json(notification).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

pub async fn dismiss_notification(State(state): State<AppState>) -> StatusCode {
    state.controller.dismiss_notification().await;
    StatusCode::NO_CONTENT
}
