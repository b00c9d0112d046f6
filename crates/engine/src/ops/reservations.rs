use chrono::Utc;
use sea_orm::{Condition, DatabaseTransaction, QueryFilter, QueryOrder, prelude::*};

use crate::{
    CommitReservationCmd, EngineError, HistoryRecord, Reservation, ReservationKey,
    ReservationOutcome, ReserveCmd, ResultEngine, TransactionType,
    error::{is_foreign_key_violation, is_unique_violation},
    reservations,
};

use super::{Engine, normalize_optional_text, normalize_required_id};

impl Engine {
    /// Holds `cost` against an order: the account is debited immediately and
    /// an active reservation row is stored under the composite key.
    pub async fn reserve(&self, cmd: ReserveCmd) -> ResultEngine<()> {
        let key = cmd.key.normalized()?;
        let comment = normalize_optional_text(cmd.comment.as_deref());

        self.with_tx(cmd.timeout, |engine, db_tx| {
            Box::pin(async move {
                engine.apply_delta(db_tx, &key.user_id, -key.cost).await?;

                let now = Utc::now();
                let reservation = Reservation::new(key.clone(), comment.clone(), now);
                reservations::ActiveModel::from(&reservation)
                    .insert(db_tx)
                    .await
                    .map_err(|err| {
                        if is_unique_violation(&err) {
                            EngineError::ReservationExists(key.to_string())
                        } else if is_foreign_key_violation(&err) {
                            EngineError::ServiceNotFound(key.service_id.clone())
                        } else {
                            EngineError::Database(err)
                        }
                    })?;

                engine
                    .record(
                        db_tx,
                        HistoryRecord::reservation(
                            TransactionType::Reserve,
                            &key,
                            key.cost,
                            comment,
                            now,
                        ),
                    )
                    .await?;
                tracing::debug!(reservation = %key, "funds reserved");
                Ok(())
            })
        })
        .await
    }

    /// Finalizes a reservation: the held money stays spent.
    pub async fn confirm(&self, cmd: CommitReservationCmd) -> ResultEngine<()> {
        self.commit_reservation(cmd, ReservationOutcome::Confirm)
            .await
    }

    /// Releases a reservation: the held money returns to the account.
    pub async fn cancel(&self, cmd: CommitReservationCmd) -> ResultEngine<()> {
        self.commit_reservation(cmd, ReservationOutcome::Cancel)
            .await
    }

    /// Moves an active reservation to its terminal state.
    ///
    /// Writes a `was_reserve` entry carrying the reservation's original
    /// timestamp, removes the active row, writes the terminal entry and, on
    /// cancel, refunds the cost.
    pub async fn commit_reservation(
        &self,
        cmd: CommitReservationCmd,
        outcome: ReservationOutcome,
    ) -> ResultEngine<()> {
        let key = cmd.key.normalized()?;
        let comment = normalize_optional_text(cmd.comment.as_deref());

        self.with_tx(cmd.timeout, |engine, db_tx| {
            Box::pin(async move {
                let reservation = engine.active_reservation(db_tx, &key).await?;

                engine
                    .record(
                        db_tx,
                        HistoryRecord::reservation(
                            TransactionType::WasReserve,
                            &key,
                            -key.cost,
                            reservation.comment.clone(),
                            reservation.created_at,
                        ),
                    )
                    .await?;

                let deleted = reservations::Entity::delete_many()
                    .filter(key_filter(&key))
                    .exec(db_tx)
                    .await?;
                if deleted.rows_affected != 1 {
                    return Err(EngineError::ReservationNotFound(key.to_string()));
                }

                engine
                    .record(
                        db_tx,
                        HistoryRecord::reservation(
                            outcome.transaction_type(),
                            &key,
                            outcome.history_amount(key.cost),
                            comment.or(reservation.comment),
                            Utc::now(),
                        ),
                    )
                    .await?;

                if outcome == ReservationOutcome::Cancel {
                    engine.apply_delta(db_tx, &key.user_id, key.cost).await?;
                }
                tracing::debug!(reservation = %key, ?outcome, "reservation committed");
                Ok(())
            })
        })
        .await
    }

    /// Active reservations of one user, oldest first.
    pub async fn reservations(&self, user_id: &str) -> ResultEngine<Vec<Reservation>> {
        let user_id = normalize_required_id(user_id, "user")?;
        reservations::Entity::find()
            .filter(reservations::Column::UserId.eq(user_id))
            .order_by_asc(reservations::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Reservation::try_from)
            .collect()
    }

    async fn active_reservation(
        &self,
        db_tx: &DatabaseTransaction,
        key: &ReservationKey,
    ) -> ResultEngine<Reservation> {
        let model = reservations::Entity::find()
            .filter(key_filter(key))
            .one(db_tx)
            .await?
            .ok_or_else(|| {
                tracing::warn!(reservation = %key, "no active reservation");
                EngineError::ReservationNotFound(key.to_string())
            })?;
        Reservation::try_from(model)
    }
}

fn key_filter(key: &ReservationKey) -> Condition {
    Condition::all()
        .add(reservations::Column::UserId.eq(key.user_id.as_str()))
        .add(reservations::Column::ServiceId.eq(key.service_id.as_str()))
        .add(reservations::Column::OrderId.eq(key.order_id.as_str()))
        .add(reservations::Column::Cost.eq(key.cost.minor()))
}
