//! Reservation API endpoints

use api_types::reservation::Reservation;
use axum::{Json, extract::State, http::StatusCode};
use engine::{CommitReservationCmd, ReservationKey, ReservationOutcome, ReserveCmd};

use crate::{ServerError, require_id, require_positive, server::ServerState};

fn key(payload: &Reservation) -> Result<ReservationKey, ServerError> {
    require_id(&payload.user_id, "user_id")?;
    require_id(&payload.service_id, "service_id")?;
    require_id(&payload.order_id, "order_id")?;
    require_positive(payload.cost_minor, "cost_minor")?;

    Ok(ReservationKey::new(
        payload.user_id.as_str(),
        payload.service_id.as_str(),
        payload.order_id.as_str(),
        payload.cost_minor,
    ))
}

/// Handle requests for holding funds against an order
pub async fn reserve(
    State(state): State<ServerState>,
    Json(payload): Json<Reservation>,
) -> Result<StatusCode, ServerError> {
    let mut cmd = ReserveCmd::new(key(&payload)?);
    if let Some(comment) = payload.comment {
        cmd = cmd.comment(comment);
    }
    state.engine.reserve(cmd).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn commit(
    state: ServerState,
    payload: Reservation,
    outcome: ReservationOutcome,
) -> Result<StatusCode, ServerError> {
    let mut cmd = CommitReservationCmd::new(key(&payload)?);
    if let Some(comment) = payload.comment {
        cmd = cmd.comment(comment);
    }
    state.engine.commit_reservation(cmd, outcome).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handle requests for finalizing a reservation
pub async fn confirm(
    State(state): State<ServerState>,
    Json(payload): Json<Reservation>,
) -> Result<StatusCode, ServerError> {
    commit(state, payload, ReservationOutcome::Confirm).await
}

/// Handle requests for releasing a reservation
pub async fn cancel(
    State(state): State<ServerState>,
    Json(payload): Json<Reservation>,
) -> Result<StatusCode, ServerError> {
    commit(state, payload, ReservationOutcome::Cancel).await
}
