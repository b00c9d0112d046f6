use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use api_types::ErrorBody;
pub use reports::{ReportError, ReportFiles};
pub use server::{ServerState, router, run_with_listener};

mod balance;
mod history;
mod report;
mod reports;
mod reservation;
mod server;

pub mod types {
    pub mod balance {
        pub use api_types::balance::{Balance, BalanceChange, BalanceChanged, BalanceGet, Transfer};
    }

    pub mod reservation {
        pub use api_types::reservation::Reservation;
    }

    pub mod history {
        pub use api_types::history::{HistoryGet, HistoryRow, OrderBy, OrderField};
    }

    pub mod report {
        pub use api_types::report::{ReportGet, ReportLink};
    }
}

#[derive(Debug)]
pub enum ServerError {
    Engine(EngineError),
    Report(ReportError),
    Generic(String),
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::AccountNotFound(_)
        | EngineError::ReservationNotFound(_)
        | EngineError::ServiceNotFound(_)
        | EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::ReservationExists(_) => StatusCode::CONFLICT,
        EngineError::InsufficientFunds(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::InvalidAmount(_)
        | EngineError::InvalidId(_)
        | EngineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        other => {
            tracing::warn!("request rejected: {other}");
            other.to_string()
        }
    }
}

fn status_for_report_error(err: &ReportError) -> StatusCode {
    match err {
        ReportError::Engine(err) => status_for_engine_error(err),
        ReportError::InvalidFileName(_) => StatusCode::BAD_REQUEST,
        ReportError::Missing(_) => StatusCode::NOT_FOUND,
        ReportError::Io(_) | ReportError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_report_error(err: ReportError) -> String {
    match err {
        ReportError::Engine(err) => message_for_engine_error(err),
        err @ (ReportError::Io(_) | ReportError::Csv(_)) => {
            tracing::error!("report file error: {err}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Report(err) => {
                (status_for_report_error(&err), message_for_report_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

impl From<ReportError> for ServerError {
    fn from(value: ReportError) -> Self {
        match value {
            ReportError::Engine(err) => Self::Engine(err),
            other => Self::Report(other),
        }
    }
}

fn require_id(value: &str, field: &str) -> Result<(), ServerError> {
    if value.trim().is_empty() {
        return Err(ServerError::Generic(format!("{field} must not be empty")));
    }
    Ok(())
}

fn require_positive(value: i64, field: &str) -> Result<(), ServerError> {
    if value <= 0 {
        return Err(ServerError::Generic(format!("{field} must be > 0")));
    }
    Ok(())
}
