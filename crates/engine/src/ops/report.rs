use sea_orm::{
    FromQueryResult, JoinType, QueryFilter, QueryOrder, QuerySelect, prelude::*,
    sea_query::{Alias, Expr, Func, SimpleExpr},
};

use crate::{
    Amount, EngineError, ReportRow, ResultEngine, TransactionType, history, month_bounds,
    services,
};

use super::Engine;

#[derive(Debug, FromQueryResult)]
struct ServiceTotal {
    service_name: String,
    total_cost: i64,
}

impl Engine {
    /// Confirmed reservation costs of one calendar month (UTC), per service
    /// name in name order.
    pub async fn report(&self, year: i32, month: u32) -> ResultEngine<Vec<ReportRow>> {
        let (start, end) = month_bounds(year, month)?;

        // SUM over BIGINT is NUMERIC on PostgreSQL; cast back to fit i64.
        let total = SimpleExpr::from(Func::cast_as(
            Func::sum(Expr::col((history::Entity, history::Column::Cost))),
            Alias::new("BIGINT"),
        ));

        let rows = history::Entity::find()
            .select_only()
            .column_as(services::Column::Name, "service_name")
            .column_as(total, "total_cost")
            .join(JoinType::InnerJoin, history::Relation::Services.def())
            .filter(history::Column::TransactionType.eq(TransactionType::Confirm.as_str()))
            .filter(history::Column::CreatedAt.gte(start))
            .filter(history::Column::CreatedAt.lt(end))
            .group_by(services::Column::Name)
            .order_by_asc(services::Column::Name)
            .into_model::<ServiceTotal>()
            .all(&self.database)
            .await?;

        if rows.is_empty() {
            return Err(EngineError::NotFound(format!(
                "no confirmed reservations in {year}-{month:02}"
            )));
        }

        Ok(rows
            .into_iter()
            .map(|row| ReportRow {
                service_name: row.service_name,
                total_cost: Amount::new(row.total_cost),
            })
            .collect())
    }
}
