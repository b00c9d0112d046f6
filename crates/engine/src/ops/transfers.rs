use chrono::Utc;

use crate::{Amount, EngineError, HistoryRecord, ResultEngine, TransferCmd};

use super::{Engine, normalize_optional_text, normalize_required_id};

impl Engine {
    /// Moves `amount` from one existing account to another.
    ///
    /// Both balance updates and both history legs commit together or not at
    /// all. The recipient must already have an account.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<()> {
        let amount = Amount::positive(cmd.amount_minor, "amount")?;
        let from = normalize_required_id(&cmd.from_user_id, "sender")?;
        let to = normalize_required_id(&cmd.to_user_id, "recipient")?;
        if from == to {
            return Err(EngineError::InvalidRequest(
                "sender and recipient must differ".to_string(),
            ));
        }
        let comment = normalize_optional_text(cmd.comment.as_deref());

        self.with_tx(cmd.timeout, |engine, db_tx| {
            Box::pin(async move {
                engine.apply_delta(db_tx, &from, -amount).await?;
                engine.apply_delta(db_tx, &to, amount).await?;

                let at = Utc::now();
                engine
                    .record(
                        db_tx,
                        HistoryRecord::transfer_out(&from, &to, amount, comment.clone(), at),
                    )
                    .await?;
                engine
                    .record(
                        db_tx,
                        HistoryRecord::transfer_in(&to, &from, amount, comment, at),
                    )
                    .await?;
                tracing::debug!(%from, %to, %amount, "transfer committed");
                Ok(())
            })
        })
        .await
    }
}
