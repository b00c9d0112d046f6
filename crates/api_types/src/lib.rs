use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub mod balance {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceGet {
        pub user_id: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Balance {
        pub user_id: String,
        pub balance_minor: i64,
        /// Human readable form of `balance_minor` (`"12.34"`).
        pub balance: String,
    }

    /// Replenish or reduce request.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceChange {
        pub user_id: String,
        pub amount_minor: i64,
        pub comment: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceChanged {
        pub user_id: String,
        pub balance_minor: i64,
        pub balance: String,
        pub comment: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Transfer {
        pub user_id_from: String,
        pub user_id_to: String,
        pub amount_minor: i64,
        pub comment: Option<String>,
    }
}

pub mod reservation {
    use super::*;

    /// Used by reserve, confirm and cancel alike: the four key fields
    /// identify the reservation.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct Reservation {
        pub user_id: String,
        pub service_id: String,
        pub order_id: String,
        pub cost_minor: i64,
        pub comment: Option<String>,
    }
}

pub mod history {
    use super::*;

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum OrderBy {
        Asc,
        #[default]
        Desc,
    }

    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum OrderField {
        #[default]
        CreateDate,
        Amount,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryGet {
        pub user_id: String,
        #[serde(default)]
        pub order_by: OrderBy,
        #[serde(default)]
        pub order_field: OrderField,
        /// `None` or `0` returns every row.
        pub limit: Option<u64>,
        pub offset: Option<u64>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct HistoryRow {
        pub id: i64,
        pub user_id: String,
        pub order_id: Option<String>,
        pub service_id: Option<String>,
        pub service_name: Option<String>,
        pub from_user_id: Option<String>,
        pub to_user_id: Option<String>,
        pub amount_minor: i64,
        pub cost_minor: i64,
        /// One of `balance_change`, `reserve`, `was_reserve`, `confirm`, `cancel`.
        pub transaction_type: String,
        pub comment: Option<String>,
        pub created_at: DateTime<Utc>,
    }
}

pub mod report {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportGet {
        pub year: i32,
        pub month: u32,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ReportLink {
        /// Path of the rendered CSV, relative to the server root.
        pub file_url: String,
    }
}
