//! Accounts table: one row per user holding the current balance.
//!
//! The `balance >= 0` invariant lives in the schema (see the
//! `accounts_balance_non_negative` constraint), not in this module.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::Amount;

/// A user's account as seen by callers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub user_id: String,
    pub balance: Amount,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub balance: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::reservations::Entity")]
    Reservations,
}

impl Related<super::reservations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Self {
            user_id: model.user_id,
            balance: Amount::new(model.balance),
            created_at: model.created_at,
        }
    }
}
