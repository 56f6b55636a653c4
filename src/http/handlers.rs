use super::AppState;
use super::error::AppError;
use crate::models::{Country, CountryQuery, RefreshSummary, StatusReport, UPDATED_AT_KEY};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use std::io::ErrorKind;

const COUNTRY_NOT_FOUND: &str = "Country not found";

/// POST /countries/refresh
pub async fn refresh_countries(
    State(state): State<AppState>,
) -> Result<Json<RefreshSummary>, AppError> {
    let summary = state.refresher.refresh().await?;
    Ok(Json(summary))
}

/// GET /countries
pub async fn list_countries(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> Result<Json<Vec<Country>>, AppError> {
    let countries = state.store.list_countries(&query).await?;
    Ok(Json(countries))
}

/// GET /countries/:name
pub async fn get_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Country>, AppError> {
    state
        .store
        .find_by_name(&name)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound(COUNTRY_NOT_FOUND))
}

/// DELETE /countries/:name
pub async fn delete_country(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Value>, AppError> {
    let deleted = state
        .store
        .delete_by_name(&name)
        .await?
        .ok_or(AppError::NotFound(COUNTRY_NOT_FOUND))?;
    log::info!("deleted country {}", deleted.name);
    Ok(Json(json!({
        "message": "Country deleted successfully",
        "name": deleted.name,
    })))
}

/// GET /countries/image
pub async fn summary_image(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let path = state.refresher.renderer().image_path();
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            Err(AppError::NotFound("Summary image not found"))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /status
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusReport>, AppError> {
    let total_countries = state.store.count().await?;
    let last_refreshed_at = state.store.metadata(UPDATED_AT_KEY).await?;
    Ok(Json(StatusReport {
        total_countries,
        last_refreshed_at,
    }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}
