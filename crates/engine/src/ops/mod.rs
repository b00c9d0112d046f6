use std::{future::Future, pin::Pin, time::Duration};

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, IsolationLevel,
    TransactionTrait,
};

use crate::{EngineError, ResultEngine};

mod balances;
mod history;
mod report;
mod reservations;
mod services;
mod transfers;

/// Deadline applied to a write when neither the command nor the builder set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub(crate) type TxFuture<'a, T> = Pin<Box<dyn Future<Output = ResultEngine<T>> + Send + 'a>>;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    default_timeout: Duration,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Runs `f` inside one write transaction, committing on success.
    ///
    /// Any error returned by `f` drops the transaction, which rolls it back.
    /// The whole unit (including waiting for a connection) is bounded by
    /// `timeout`, or by the engine default when `None`; on expiry the
    /// transaction is dropped the same way and [`EngineError::Timeout`] is
    /// returned.
    pub(crate) async fn with_tx<T, F>(&self, timeout: Option<Duration>, f: F) -> ResultEngine<T>
    where
        T: Send,
        F: for<'a> FnOnce(&'a Engine, &'a DatabaseTransaction) -> TxFuture<'a, T> + Send,
    {
        let limit = timeout.unwrap_or(self.default_timeout);
        let work = async {
            let db_tx = self.begin_write().await?;
            let value = f(self, &db_tx).await?;
            db_tx.commit().await?;
            Ok::<T, EngineError>(value)
        };

        match tokio::time::timeout(limit, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout_ms = limit.as_millis(), "ledger write timed out");
                Err(EngineError::Timeout(limit))
            }
        }
    }

    /// Opens a serializable transaction. SQLite has a single writer, so
    /// transactions there are serializable already and no level is requested.
    async fn begin_write(&self) -> ResultEngine<DatabaseTransaction> {
        let isolation = match self.database.get_database_backend() {
            DbBackend::Sqlite => None,
            _ => Some(IsolationLevel::Serializable),
        };
        Ok(self.database.begin_with_config(isolation, None).await?)
    }
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn normalize_required_id(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidId(format!("{label} id must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    default_timeout: Option<Duration>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Deadline for writes whose command carries no timeout.
    pub fn default_timeout(mut self, timeout: Duration) -> EngineBuilder {
        self.default_timeout = Some(timeout);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            default_timeout: self.default_timeout.unwrap_or(DEFAULT_TIMEOUT),
        })
    }
}
