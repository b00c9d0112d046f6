//! Append-only balance history.
//!
//! Every balance-affecting event writes exactly one row here, in the same
//! database transaction as the mutation it documents. Rows are never updated
//! or deleted; reports are computed from them.
//!
//! Sign conventions:
//!
//! | event                | `amount`  | `cost`  |
//! |----------------------|-----------|---------|
//! | replenish / reduce   | `±amount` | 0       |
//! | transfer, sender     | `-amount` | 0       |
//! | transfer, recipient  | `+amount` | 0       |
//! | reserve              | `+cost`   | `cost`  |
//! | was_reserve          | `-cost`   | `cost`  |
//! | confirm              | 0         | `cost`  |
//! | cancel               | `+cost`   | `cost`  |

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Amount, EngineError, ReservationKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    BalanceChange,
    Reserve,
    WasReserve,
    Confirm,
    Cancel,
}

impl TransactionType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BalanceChange => "balance_change",
            Self::Reserve => "reserve",
            Self::WasReserve => "was_reserve",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
        }
    }
}

impl TryFrom<&str> for TransactionType {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "balance_change" => Ok(Self::BalanceChange),
            "reserve" => Ok(Self::Reserve),
            "was_reserve" => Ok(Self::WasReserve),
            "confirm" => Ok(Self::Confirm),
            "cancel" => Ok(Self::Cancel),
            other => Err(EngineError::InvalidId(format!(
                "invalid transaction type: {other}"
            ))),
        }
    }
}

/// A history row as returned by [`Engine::history`](crate::Engine::history).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub user_id: String,
    pub order_id: Option<String>,
    pub service_id: Option<String>,
    /// Display name joined from the services table.
    pub service_name: Option<String>,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub amount: Amount,
    pub cost: Amount,
    pub transaction_type: TransactionType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A history row about to be appended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRecord {
    pub user_id: String,
    pub order_id: Option<String>,
    pub service_id: Option<String>,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub amount: Amount,
    pub cost: Amount,
    pub transaction_type: TransactionType,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    fn plain(user_id: &str, amount: Amount, comment: Option<String>, at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            order_id: None,
            service_id: None,
            from_user_id: None,
            to_user_id: None,
            amount,
            cost: Amount::ZERO,
            transaction_type: TransactionType::BalanceChange,
            comment,
            created_at: at,
        }
    }

    /// Direct replenishment (positive) or reduction (negative).
    pub fn balance_change(
        user_id: &str,
        signed_amount: Amount,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::plain(user_id, signed_amount, comment, at)
    }

    /// Sender leg of a transfer: `-amount`, counterpart in `to_user_id`.
    pub fn transfer_out(
        from_user_id: &str,
        to_user_id: &str,
        amount: Amount,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            to_user_id: Some(to_user_id.to_string()),
            ..Self::plain(from_user_id, -amount, comment, at)
        }
    }

    /// Recipient leg of a transfer: `+amount`, counterpart in `from_user_id`.
    pub fn transfer_in(
        to_user_id: &str,
        from_user_id: &str,
        amount: Amount,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            from_user_id: Some(from_user_id.to_string()),
            ..Self::plain(to_user_id, amount, comment, at)
        }
    }

    /// Any reservation lifecycle row (`reserve`, `was_reserve`, `confirm`,
    /// `cancel`).
    pub fn reservation(
        transaction_type: TransactionType,
        key: &ReservationKey,
        amount: Amount,
        comment: Option<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            order_id: Some(key.order_id.clone()),
            service_id: Some(key.service_id.clone()),
            cost: key.cost,
            transaction_type,
            ..Self::plain(&key.user_id, amount, comment, at)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub order_id: Option<String>,
    pub service_id: Option<String>,
    pub from_user_id: Option<String>,
    pub to_user_id: Option<String>,
    pub amount: i64,
    pub cost: i64,
    pub transaction_type: String,
    pub comment: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::services::Entity",
        from = "Column::ServiceId",
        to = "super::services::Column::ServiceId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Services,
}

impl Related<super::services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Services.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&HistoryRecord> for ActiveModel {
    fn from(record: &HistoryRecord) -> Self {
        Self {
            id: ActiveValue::NotSet,
            user_id: ActiveValue::Set(record.user_id.clone()),
            order_id: ActiveValue::Set(record.order_id.clone()),
            service_id: ActiveValue::Set(record.service_id.clone()),
            from_user_id: ActiveValue::Set(record.from_user_id.clone()),
            to_user_id: ActiveValue::Set(record.to_user_id.clone()),
            amount: ActiveValue::Set(record.amount.minor()),
            cost: ActiveValue::Set(record.cost.minor()),
            transaction_type: ActiveValue::Set(record.transaction_type.as_str().to_string()),
            comment: ActiveValue::Set(record.comment.clone()),
            created_at: ActiveValue::Set(record.created_at),
        }
    }
}

impl TryFrom<(Model, Option<super::services::Model>)> for HistoryEntry {
    type Error = EngineError;

    fn try_from(
        (model, service): (Model, Option<super::services::Model>),
    ) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            transaction_type: TransactionType::try_from(model.transaction_type.as_str())?,
            user_id: model.user_id,
            order_id: model.order_id,
            service_id: model.service_id,
            service_name: service.map(|s| s.name),
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            amount: Amount::new(model.amount),
            cost: Amount::new(model.cost),
            comment: model.comment,
            created_at: model.created_at,
        })
    }
}
