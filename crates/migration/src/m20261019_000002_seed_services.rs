use sea_orm::DbErr;
use sea_orm_migration::prelude::*;

use super::m20261019_000001_ledger::Services;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Services the ledger ships with.
const SEEDED: [(&str, &str); 3] = [
    ("34e16535-480c-43f8-95a9-b7a503499af0", "Курьерская доставка"),
    ("34e16535-480c-43f8-95a9-b7a503499af1", "Бронирование"),
    (
        "34e16535-480c-43f8-95a9-b7a503499af2",
        "Дополнительная гарантия для товара",
    ),
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let mut insert = Query::insert();
        insert
            .into_table(Services::Table)
            .columns([Services::ServiceId, Services::Name])
            .on_conflict(OnConflict::column(Services::ServiceId).do_nothing().to_owned());
        for (id, name) in SEEDED {
            insert
                .values([id.into(), name.into()])
                .map_err(|err| DbErr::Migration(err.to_string()))?;
        }
        manager.exec_stmt(insert).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let delete = Query::delete()
            .from_table(Services::Table)
            .and_where(Expr::col(Services::ServiceId).is_in(SEEDED.map(|(id, _)| id)))
            .to_owned();
        manager.exec_stmt(delete).await
    }
}
