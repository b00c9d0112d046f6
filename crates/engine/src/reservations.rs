//! Reservation primitives.
//!
//! A row in `reservations` is an *active* hold: funds were already deducted
//! from the account when it was inserted. Confirm and cancel both remove the
//! row, so the table is the single source of truth for "still pending".

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amount, EngineError, ResultEngine, TransactionType};

/// Composite identity of a reservation: `(user, service, order, cost)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReservationKey {
    pub user_id: String,
    pub service_id: String,
    pub order_id: String,
    pub cost: Amount,
}

impl ReservationKey {
    pub fn new(
        user_id: impl Into<String>,
        service_id: impl Into<String>,
        order_id: impl Into<String>,
        cost_minor: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            service_id: service_id.into(),
            order_id: order_id.into(),
            cost: Amount::new(cost_minor),
        }
    }

    /// Checks the key and returns it with surrounding whitespace trimmed from
    /// every id, so it matches the accounts created by balance operations.
    pub(crate) fn normalized(&self) -> ResultEngine<ReservationKey> {
        let id = |value: &str, label: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return Err(EngineError::InvalidId(format!("{label} id must not be empty")));
            }
            Ok(trimmed.to_string())
        };
        Ok(Self {
            user_id: id(&self.user_id, "user")?,
            service_id: id(&self.service_id, "service")?,
            order_id: id(&self.order_id, "order")?,
            cost: Amount::positive(self.cost.minor(), "cost")?,
        })
    }
}

impl std::fmt::Display for ReservationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "user={} service={} order={} cost={}",
            self.user_id, self.service_id, self.order_id, self.cost
        )
    }
}

/// Terminal outcome of a reservation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationOutcome {
    /// The cost is realized; the money stays spent.
    Confirm,
    /// The cost is refunded to the account.
    Cancel,
}

impl ReservationOutcome {
    pub fn transaction_type(self) -> TransactionType {
        match self {
            Self::Confirm => TransactionType::Confirm,
            Self::Cancel => TransactionType::Cancel,
        }
    }

    /// Signed amount written to the terminal history entry.
    pub fn history_amount(self, cost: Amount) -> Amount {
        match self {
            Self::Confirm => Amount::ZERO,
            Self::Cancel => cost,
        }
    }
}

/// An active reservation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reservation {
    pub id: Uuid,
    pub key: ReservationKey,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn new(key: ReservationKey, comment: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            key,
            comment,
            created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub order_id: String,
    pub cost: i64,
    pub comment: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::UserId",
        to = "super::accounts::Column::UserId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Accounts,
    #[sea_orm(
        belongs_to = "super::services::Entity",
        from = "Column::ServiceId",
        to = "super::services::Column::ServiceId",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Services,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl Related<super::services::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Services.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Reservation> for ActiveModel {
    fn from(value: &Reservation) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.key.user_id.clone()),
            service_id: ActiveValue::Set(value.key.service_id.clone()),
            order_id: ActiveValue::Set(value.key.order_id.clone()),
            cost: ActiveValue::Set(value.key.cost.minor()),
            comment: ActiveValue::Set(value.comment.clone()),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Reservation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidId("invalid reservation id".to_string()))?,
            key: ReservationKey::new(model.user_id, model.service_id, model.order_id, model.cost),
            comment: model.comment,
            created_at: model.created_at,
        })
    }
}
