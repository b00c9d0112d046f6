//! The module contains the errors the engine can throw.
//!
//! Domain errors are recognized from storage signals (constraint names,
//! affected row counts, unique violations) rather than from a balance read
//! made ahead of the write:
//!
//! - [`AccountNotFound`] thrown when the user has no account row.
//! - [`InsufficientFunds`] thrown when a debit would make a balance negative.
//! - [`ReservationNotFound`] thrown when the reservation key is not active.
//!
//!  [`AccountNotFound`]: EngineError::AccountNotFound
//!  [`InsufficientFunds`]: EngineError::InsufficientFunds
//!  [`ReservationNotFound`]: EngineError::ReservationNotFound
use std::time::Duration;

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// Name of the CHECK constraint guarding `accounts.balance >= 0`.
pub const BALANCE_CHECK_CONSTRAINT: &str = "accounts_balance_non_negative";

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Reservation not found: {0}")]
    ReservationNotFound(String),
    #[error("Reservation already active: {0}")]
    ReservationExists(String),
    #[error("Service not found: {0}")]
    ServiceNotFound(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::AccountNotFound(a), Self::AccountNotFound(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::ReservationNotFound(a), Self::ReservationNotFound(b)) => a == b,
            (Self::ReservationExists(a), Self::ReservationExists(b)) => a == b,
            (Self::ServiceNotFound(a), Self::ServiceNotFound(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::InvalidRequest(a), Self::InvalidRequest(b)) => a == b,
            (Self::Timeout(a), Self::Timeout(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

/// Returns `true` when `err` was raised by the named CHECK constraint.
///
/// SQLite reports `CHECK constraint failed: <name>`, PostgreSQL reports
/// `violates check constraint "<name>"`; both carry the constraint name.
pub(crate) fn is_check_violation(err: &DbErr, constraint: &str) -> bool {
    let message = err.to_string();
    message.contains("CHECK constraint failed") && message.contains(constraint)
        || message.contains("violates check constraint") && message.contains(constraint)
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

pub(crate) fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}
