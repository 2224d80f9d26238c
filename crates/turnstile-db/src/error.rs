//! Error types for the inventory store.
//!
//! All errors are propagated via [`DbError`] which wraps the underlying
//! [`sqlx`] errors and adds the store-level conditions that the reservation
//! engine and the HTTP layer need to tell apart.

use turnstile_types::TicketId;

/// Errors that can occur in the inventory store.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A database operation failed.
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A migration failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A foreign key pointed at a record that does not exist.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// The backend cannot execute the requested operation.
    #[error("unsupported by this backend: {0}")]
    Unsupported(&'static str),

    /// A guarded claim matched no row: the ticket was no longer available.
    #[error("claim on ticket {0} matched no available row")]
    ClaimLost(TicketId),

    /// A stored row violates the data model.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl DbError {
    /// Classify a write error, turning constraint violations into
    /// [`DbError::Conflict`] and [`DbError::InvalidReference`].
    ///
    /// `what` names the value that was being written, for the message.
    pub fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return Self::Conflict(format!("{what} already exists"));
            }
            if db_err.is_foreign_key_violation() {
                return Self::InvalidReference(format!("{what} refers to a missing record"));
            }
        }
        Self::Sqlx(err)
    }
}
