use sea_orm::{DatabaseTransaction, Order, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    EngineError, HistoryEntry, HistoryOrderField, HistoryQuery, HistoryRecord, ResultEngine,
    SortDirection, history, services,
};

use super::{Engine, normalize_required_id};

/// Stands in for "no limit" when only an offset is requested.
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

impl Engine {
    /// Appends one history row inside the caller's transaction.
    pub(crate) async fn record(
        &self,
        db_tx: &DatabaseTransaction,
        record: HistoryRecord,
    ) -> ResultEngine<i64> {
        let inserted = history::Entity::insert(history::ActiveModel::from(&record))
            .exec(db_tx)
            .await?;
        Ok(inserted.last_insert_id)
    }

    /// Pages through one user's history, joined with service names.
    ///
    /// Rows with equal sort keys keep insertion order (by row id) in the
    /// requested direction. An empty page is [`EngineError::NotFound`].
    pub async fn history(&self, query: HistoryQuery) -> ResultEngine<Vec<HistoryEntry>> {
        let user_id = normalize_required_id(&query.user_id, "user")?;
        let order = match query.direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        };
        let column = match query.order_field {
            HistoryOrderField::CreatedAt => history::Column::CreatedAt,
            HistoryOrderField::Amount => history::Column::Amount,
        };

        let mut select = history::Entity::find()
            .find_also_related(services::Entity)
            .filter(history::Column::UserId.eq(user_id.as_str()))
            .order_by(column, order.clone())
            .order_by(history::Column::Id, order);

        if query.limit > 0 {
            select = select.limit(query.limit);
        } else if query.offset > 0 {
            select = select.limit(UNBOUNDED_LIMIT);
        }
        if query.offset > 0 {
            select = select.offset(query.offset);
        }

        let entries = select
            .all(&self.database)
            .await?
            .into_iter()
            .map(HistoryEntry::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        if entries.is_empty() {
            return Err(EngineError::NotFound(format!("no history for user {user_id}")));
        }
        Ok(entries)
    }
}
