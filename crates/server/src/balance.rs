//! Balance API endpoints

use api_types::balance::{Balance, BalanceChange, BalanceChanged, BalanceGet, Transfer};
use axum::{Json, extract::State, http::StatusCode};
use engine::{Amount, BalanceChangeCmd, TransferCmd};

use crate::{ServerError, require_id, require_positive, server::ServerState};

/// Handle requests for the current balance of a user
pub async fn get(
    State(state): State<ServerState>,
    Json(payload): Json<BalanceGet>,
) -> Result<Json<Balance>, ServerError> {
    require_id(&payload.user_id, "user_id")?;

    let balance = state.engine.balance(&payload.user_id).await?;

    Ok(Json(Balance {
        user_id: payload.user_id,
        balance_minor: balance.minor(),
        balance: balance.to_string(),
    }))
}

fn balance_cmd(payload: &BalanceChange) -> Result<BalanceChangeCmd, ServerError> {
    require_id(&payload.user_id, "user_id")?;
    require_positive(payload.amount_minor, "amount_minor")?;

    let mut cmd = BalanceChangeCmd::new(payload.user_id.as_str(), payload.amount_minor);
    if let Some(comment) = &payload.comment {
        cmd = cmd.comment(comment.as_str());
    }
    Ok(cmd)
}

fn changed(payload: BalanceChange, balance: Amount) -> Json<BalanceChanged> {
    Json(BalanceChanged {
        user_id: payload.user_id,
        balance_minor: balance.minor(),
        balance: balance.to_string(),
        comment: payload.comment,
    })
}

/// Handle requests for crediting an account (created on first use)
pub async fn replenish(
    State(state): State<ServerState>,
    Json(payload): Json<BalanceChange>,
) -> Result<Json<BalanceChanged>, ServerError> {
    let cmd = balance_cmd(&payload)?;
    let balance = state.engine.replenish(cmd).await?;
    Ok(changed(payload, balance))
}

/// Handle requests for debiting an existing account
pub async fn reduce(
    State(state): State<ServerState>,
    Json(payload): Json<BalanceChange>,
) -> Result<Json<BalanceChanged>, ServerError> {
    let cmd = balance_cmd(&payload)?;
    let balance = state.engine.reduce(cmd).await?;
    Ok(changed(payload, balance))
}

/// Handle requests for moving money between two users
pub async fn transfer(
    State(state): State<ServerState>,
    Json(payload): Json<Transfer>,
) -> Result<StatusCode, ServerError> {
    require_id(&payload.user_id_from, "user_id_from")?;
    require_id(&payload.user_id_to, "user_id_to")?;
    require_positive(payload.amount_minor, "amount_minor")?;
    if payload.user_id_from == payload.user_id_to {
        return Err(ServerError::Generic(
            "user_id_from and user_id_to must differ".to_string(),
        ));
    }

    let mut cmd = TransferCmd::new(
        payload.user_id_from,
        payload.user_id_to,
        payload.amount_minor,
    );
    if let Some(comment) = payload.comment {
        cmd = cmd.comment(comment);
    }
    state.engine.transfer(cmd).await?;

    Ok(StatusCode::NO_CONTENT)
}
