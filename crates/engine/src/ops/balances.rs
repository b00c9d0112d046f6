use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{
    Account, Amount, BalanceChangeCmd, EngineError, HistoryRecord, ResultEngine, accounts,
    error::{BALANCE_CHECK_CONSTRAINT, is_check_violation},
};

use super::{Engine, normalize_optional_text, normalize_required_id};

impl Engine {
    /// Current balance of `user_id`.
    pub async fn balance(&self, user_id: &str) -> ResultEngine<Amount> {
        Ok(self.account(user_id).await?.balance)
    }

    pub async fn account(&self, user_id: &str) -> ResultEngine<Account> {
        let user_id = normalize_required_id(user_id, "user")?;
        accounts::Entity::find_by_id(user_id.clone())
            .one(&self.database)
            .await?
            .map(Account::from)
            .ok_or(EngineError::AccountNotFound(user_id))
    }

    /// Credits an account, creating it with a zero balance on first use.
    ///
    /// Returns the new balance.
    pub async fn replenish(&self, cmd: BalanceChangeCmd) -> ResultEngine<Amount> {
        let amount = Amount::positive(cmd.amount_minor, "amount")?;
        let user_id = normalize_required_id(&cmd.user_id, "user")?;
        let comment = normalize_optional_text(cmd.comment.as_deref());

        self.with_tx(cmd.timeout, |engine, db_tx| {
            Box::pin(async move {
                let balance = match engine.apply_delta(db_tx, &user_id, amount).await {
                    Err(EngineError::AccountNotFound(_)) => {
                        engine.create_account(db_tx, &user_id).await?;
                        engine.apply_delta(db_tx, &user_id, amount).await?
                    }
                    other => other?,
                };
                engine
                    .record(
                        db_tx,
                        HistoryRecord::balance_change(&user_id, amount, comment, Utc::now()),
                    )
                    .await?;
                tracing::debug!(%user_id, %amount, %balance, "balance replenished");
                Ok(balance)
            })
        })
        .await
    }

    /// Debits an existing account. Never creates one.
    ///
    /// Returns the new balance.
    pub async fn reduce(&self, cmd: BalanceChangeCmd) -> ResultEngine<Amount> {
        let amount = Amount::positive(cmd.amount_minor, "amount")?;
        let user_id = normalize_required_id(&cmd.user_id, "user")?;
        let comment = normalize_optional_text(cmd.comment.as_deref());

        self.with_tx(cmd.timeout, |engine, db_tx| {
            Box::pin(async move {
                let balance = engine.apply_delta(db_tx, &user_id, -amount).await?;
                engine
                    .record(
                        db_tx,
                        HistoryRecord::balance_change(&user_id, -amount, comment, Utc::now()),
                    )
                    .await?;
                tracing::debug!(%user_id, %amount, %balance, "balance reduced");
                Ok(balance)
            })
        })
        .await
    }

    /// Adds a signed `delta` to the balance with a single conditional update.
    ///
    /// The storage CHECK on `balance >= 0` decides whether a debit fits; no
    /// balance is read ahead of the write.
    pub(crate) async fn apply_delta(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        delta: Amount,
    ) -> ResultEngine<Amount> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::Balance,
                Expr::col(accounts::Column::Balance).add(delta.minor()),
            )
            .filter(accounts::Column::UserId.eq(user_id))
            .exec(db_tx)
            .await
            .map_err(|err| {
                if is_check_violation(&err, BALANCE_CHECK_CONSTRAINT) {
                    tracing::warn!(%user_id, %delta, "debit rejected: insufficient funds");
                    EngineError::InsufficientFunds(user_id.to_string())
                } else {
                    EngineError::Database(err)
                }
            })?;

        if result.rows_affected == 0 {
            return Err(EngineError::AccountNotFound(user_id.to_string()));
        }

        let account = accounts::Entity::find_by_id(user_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::AccountNotFound(user_id.to_string()))?;
        Ok(Amount::new(account.balance))
    }

    /// Inserts a zero-balance account; a concurrent creator wins silently.
    pub(crate) async fn create_account(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
    ) -> ResultEngine<()> {
        let model = accounts::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            balance: ActiveValue::Set(0),
            created_at: ActiveValue::Set(Utc::now()),
        };
        accounts::Entity::insert(model)
            .on_conflict(
                OnConflict::column(accounts::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db_tx)
            .await?;
        tracing::debug!(%user_id, "account created");
        Ok(())
    }
}
