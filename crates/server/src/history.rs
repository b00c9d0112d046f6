//! History API endpoint

use api_types::history::{HistoryGet, HistoryRow, OrderBy, OrderField};
use axum::{Json, extract::State};
use engine::{HistoryEntry, HistoryOrderField, HistoryQuery, SortDirection};

use crate::{ServerError, require_id, server::ServerState};

fn history_row(entry: HistoryEntry) -> HistoryRow {
    HistoryRow {
        id: entry.id,
        user_id: entry.user_id,
        order_id: entry.order_id,
        service_id: entry.service_id,
        service_name: entry.service_name,
        from_user_id: entry.from_user_id,
        to_user_id: entry.to_user_id,
        amount_minor: entry.amount.minor(),
        cost_minor: entry.cost.minor(),
        transaction_type: entry.transaction_type.as_str().to_string(),
        comment: entry.comment,
        created_at: entry.created_at,
    }
}

/// Handle requests for a page of a user's history
pub async fn get(
    State(state): State<ServerState>,
    Json(payload): Json<HistoryGet>,
) -> Result<Json<Vec<HistoryRow>>, ServerError> {
    require_id(&payload.user_id, "user_id")?;

    let field = match payload.order_field {
        OrderField::CreateDate => HistoryOrderField::CreatedAt,
        OrderField::Amount => HistoryOrderField::Amount,
    };
    let direction = match payload.order_by {
        OrderBy::Asc => SortDirection::Asc,
        OrderBy::Desc => SortDirection::Desc,
    };
    let query = HistoryQuery::new(payload.user_id)
        .order_by(field, direction)
        .limit(payload.limit.unwrap_or(0))
        .offset(payload.offset.unwrap_or(0));

    let rows = state.engine.history(query).await?;

    Ok(Json(rows.into_iter().map(history_row).collect()))
}
