//! Report API endpoints

use api_types::report::{ReportGet, ReportLink};
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Datelike, Utc};

use crate::{ServerError, server::ServerState};

const MIN_YEAR: i32 = 2000;

fn validate_period(year: i32, month: u32, now: DateTime<Utc>) -> Result<(), ServerError> {
    if year < MIN_YEAR {
        return Err(ServerError::Generic(format!("year must be >= {MIN_YEAR}")));
    }
    if !(1..=12).contains(&month) {
        return Err(ServerError::Generic("month must be in 1..=12".to_string()));
    }
    if year > now.year() {
        return Err(ServerError::Generic("year is in the future".to_string()));
    }
    if year == now.year() && month > now.month() {
        return Err(ServerError::Generic("month is in the future".to_string()));
    }
    Ok(())
}

/// Handle requests for the monthly revenue report; returns a link to the CSV
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<ReportGet>,
) -> Result<Json<ReportLink>, ServerError> {
    let now = Utc::now();
    validate_period(payload.year, payload.month, now)?;

    let name = state
        .reports
        .ensure(&state.engine, payload.year, payload.month, now)
        .await?;

    Ok(Json(ReportLink {
        file_url: format!("/static/reports/{name}"),
    }))
}

/// Handle downloads of rendered report files
pub async fn download(
    State(state): State<ServerState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let bytes = state.reports.read(&file).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], bytes))
}
