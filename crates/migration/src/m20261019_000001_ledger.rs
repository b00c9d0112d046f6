//! Ledger schema.
//!
//! - `services`: reference data naming what a reservation pays for
//! - `accounts`: one balance per user, never negative
//! - `reservations`: active holds, unique per (user, service, order, cost)
//! - `history`: append-only log of every balance-affecting event

use sea_orm::{ConnectionTrait, DbBackend, DbErr, Statement};
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
pub(crate) enum Services {
    Table,
    ServiceId,
    Name,
}

#[derive(Iden)]
enum Accounts {
    Table,
    UserId,
}

#[derive(Iden)]
enum Reservations {
    Table,
    Id,
    UserId,
    ServiceId,
    OrderId,
    Cost,
    Comment,
    CreatedAt,
}

#[derive(Iden)]
enum History {
    Table,
    Id,
    UserId,
    OrderId,
    ServiceId,
    FromUserId,
    ToUserId,
    Amount,
    Cost,
    TransactionType,
    Comment,
    CreatedAt,
}

/// Named so the engine can tell an overdraft apart from other failures.
const BALANCE_CHECK_CONSTRAINT: &str = "accounts_balance_non_negative";

fn create_accounts_sql(backend: DbBackend) -> String {
    let created_at = match backend {
        DbBackend::Postgres => "TIMESTAMP WITH TIME ZONE",
        DbBackend::MySql => "TIMESTAMP",
        DbBackend::Sqlite => "timestamp_with_timezone_text",
    };
    format!(
        "CREATE TABLE IF NOT EXISTS accounts (\
         user_id VARCHAR(255) NOT NULL PRIMARY KEY, \
         balance BIGINT NOT NULL DEFAULT 0, \
         created_at {created_at} NOT NULL, \
         CONSTRAINT {BALANCE_CHECK_CONSTRAINT} CHECK (balance >= 0));"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = db.get_database_backend();

        // ───────────────────────────────────────────────────────────────────
        // 1. Services
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Services::ServiceId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Services::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts (raw SQL: the CHECK constraint must carry a name)
        // ───────────────────────────────────────────────────────────────────
        db.execute(Statement::from_string(backend, create_accounts_sql(backend)))
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Reservations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Reservations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Reservations::UserId).string().not_null())
                    .col(ColumnDef::new(Reservations::ServiceId).string().not_null())
                    .col(ColumnDef::new(Reservations::OrderId).string().not_null())
                    .col(
                        ColumnDef::new(Reservations::Cost)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Reservations::Cost).gt(0)),
                    )
                    .col(ColumnDef::new(Reservations::Comment).string())
                    .col(
                        ColumnDef::new(Reservations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reservations-user_id")
                            .from(Reservations::Table, Reservations::UserId)
                            .to(Accounts::Table, Accounts::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reservations-service_id")
                            .from(Reservations::Table, Reservations::ServiceId)
                            .to(Services::Table, Services::ServiceId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-reservations-key-unique")
                    .table(Reservations::Table)
                    .col(Reservations::UserId)
                    .col(Reservations::ServiceId)
                    .col(Reservations::OrderId)
                    .col(Reservations::Cost)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. History
        // ───────────────────────────────────────────────────────────────────
        // SQLite only auto-increments an `integer` primary key; it is 64-bit.
        let mut history_id = ColumnDef::new(History::Id);
        match backend {
            DbBackend::Sqlite => history_id.integer(),
            _ => history_id.big_integer(),
        };
        history_id.not_null().auto_increment().primary_key();

        manager
            .create_table(
                Table::create()
                    .table(History::Table)
                    .if_not_exists()
                    .col(&mut history_id)
                    .col(ColumnDef::new(History::UserId).string().not_null())
                    .col(ColumnDef::new(History::OrderId).string())
                    .col(ColumnDef::new(History::ServiceId).string())
                    .col(ColumnDef::new(History::FromUserId).string())
                    .col(ColumnDef::new(History::ToUserId).string())
                    .col(ColumnDef::new(History::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(History::Cost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(History::TransactionType).string().not_null())
                    .col(ColumnDef::new(History::Comment).string())
                    .col(
                        ColumnDef::new(History::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-history-service_id")
                            .from(History::Table, History::ServiceId)
                            .to(Services::Table, Services::ServiceId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-history-user_id-created_at")
                    .table(History::Table)
                    .col(History::UserId)
                    .col(History::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-history-transaction_type-created_at")
                    .table(History::Table)
                    .col(History::TransactionType)
                    .col(History::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(History::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(Reservations::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Services::Table).if_exists().to_owned())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accounts_sql_names_the_balance_check() {
        for backend in [DbBackend::Sqlite, DbBackend::Postgres] {
            let sql = create_accounts_sql(backend);
            assert!(sql.contains("CONSTRAINT accounts_balance_non_negative CHECK (balance >= 0)"));
        }
        assert!(create_accounts_sql(DbBackend::Postgres).contains("TIMESTAMP WITH TIME ZONE"));
    }
}
