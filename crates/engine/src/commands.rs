//! Command structs for engine operations.
//!
//! These types group parameters for write operations (balance change,
//! transfer, reservation) and for the history query, keeping call sites
//! readable and avoiding long argument lists.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ReservationKey;

/// Replenish or reduce one account.
#[derive(Clone, Debug)]
pub struct BalanceChangeCmd {
    pub user_id: String,
    pub amount_minor: i64,
    pub comment: Option<String>,
    pub timeout: Option<Duration>,
}

impl BalanceChangeCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, amount_minor: i64) -> Self {
        Self {
            user_id: user_id.into(),
            amount_minor,
            comment: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Move money between two accounts.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_minor: i64,
    pub comment: Option<String>,
    pub timeout: Option<Duration>,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        from_user_id: impl Into<String>,
        to_user_id: impl Into<String>,
        amount_minor: i64,
    ) -> Self {
        Self {
            from_user_id: from_user_id.into(),
            to_user_id: to_user_id.into(),
            amount_minor,
            comment: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Hold funds against a pending order.
#[derive(Clone, Debug)]
pub struct ReserveCmd {
    pub key: ReservationKey,
    pub comment: Option<String>,
    pub timeout: Option<Duration>,
}

impl ReserveCmd {
    #[must_use]
    pub fn new(key: ReservationKey) -> Self {
        Self {
            key,
            comment: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Confirm or cancel an active reservation.
#[derive(Clone, Debug)]
pub struct CommitReservationCmd {
    pub key: ReservationKey,
    pub comment: Option<String>,
    pub timeout: Option<Duration>,
}

impl CommitReservationCmd {
    #[must_use]
    pub fn new(key: ReservationKey) -> Self {
        Self {
            key,
            comment: None,
            timeout: None,
        }
    }

    #[must_use]
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryOrderField {
    #[default]
    CreatedAt,
    Amount,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Paginated read of one user's history. `limit == 0` means no limit.
#[derive(Clone, Debug)]
pub struct HistoryQuery {
    pub user_id: String,
    pub order_field: HistoryOrderField,
    pub direction: SortDirection,
    pub limit: u64,
    pub offset: u64,
}

impl HistoryQuery {
    #[must_use]
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            order_field: HistoryOrderField::default(),
            direction: SortDirection::default(),
            limit: 0,
            offset: 0,
        }
    }

    #[must_use]
    pub fn order_by(mut self, field: HistoryOrderField, direction: SortDirection) -> Self {
        self.order_field = field;
        self.direction = direction;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }
}
