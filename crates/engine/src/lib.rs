//! User balance ledger.
//!
//! The [`Engine`] owns every money movement: replenish/reduce, transfers and
//! the reserve -> confirm/cancel protocol. Each write runs in one database
//! transaction that also appends the matching [`HistoryEntry`] rows, so the
//! history is always consistent with the balances.

pub use accounts::Account;
pub use commands::{
    BalanceChangeCmd, CommitReservationCmd, HistoryOrderField, HistoryQuery, ReserveCmd,
    SortDirection, TransferCmd,
};
pub use error::{BALANCE_CHECK_CONSTRAINT, EngineError};
pub use history::{HistoryEntry, HistoryRecord, TransactionType};
pub use money::Amount;
pub use ops::{DEFAULT_TIMEOUT, Engine, EngineBuilder};
pub use report::{ReportRow, month_bounds};
pub use reservations::{Reservation, ReservationKey, ReservationOutcome};
pub use services::Service;

mod accounts;
mod commands;
mod error;
mod history;
mod money;
mod ops;
mod report;
mod reservations;
mod services;

type ResultEngine<T> = Result<T, EngineError>;
