//! Error taxonomy for reservations.
//!
//! [`ReserveError`] is the only error a `reserve` call can return. Storage
//! failures are normalized into [`ReserveError::TransientStore`] at the
//! transaction boundary, so callers never see a raw store error type.

use serde::{Deserialize, Serialize};
use turnstile_db::{Backend, DbError};
use turnstile_types::EventId;

use crate::locking::LockingMode;

/// The kind of a [`ReserveError`], for callers that map errors to codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The event does not exist.
    EventNotFound,
    /// Every ticket of the event is already reserved.
    NoInventoryAvailable,
    /// The store failed for reasons unrelated to business state.
    TransientStoreError,
}

impl ErrorKind {
    /// Stable name, as used in error payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventNotFound => "EventNotFound",
            Self::NoInventoryAvailable => "NoInventoryAvailable",
            Self::TransientStoreError => "TransientStoreError",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a reservation did not happen.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReserveError {
    /// The event does not exist. Retrying will not help.
    #[error("event {event_id} not found")]
    EventNotFound {
        /// The requested event.
        event_id: EventId,
    },

    /// Every ticket of the event is reserved. Retrying will not help.
    #[error("no tickets available for event {event_id}")]
    NoInventoryAvailable {
        /// The requested event.
        event_id: EventId,
    },

    /// The store failed (connection loss, lock timeout, aborted commit).
    /// The transaction was rolled back; the whole call may be retried.
    #[error("transient store error: {detail}")]
    TransientStore {
        /// Human-readable description of the failure.
        detail: String,
    },
}

impl ReserveError {
    /// The kind of this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EventNotFound { .. } => ErrorKind::EventNotFound,
            Self::NoInventoryAvailable { .. } => ErrorKind::NoInventoryAvailable,
            Self::TransientStore { .. } => ErrorKind::TransientStoreError,
        }
    }

    /// Whether repeating the same call can succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore { .. })
    }
}

impl From<DbError> for ReserveError {
    fn from(err: DbError) -> Self {
        Self::TransientStore {
            detail: err.to_string(),
        }
    }
}

/// Errors raised while building a [`ReservationEngine`](crate::ReservationEngine).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineBuildError {
    /// The requested locking mode needs a capability the backend lacks.
    #[error("locking mode `{mode}` is not supported by the {backend} backend")]
    UnsupportedLocking {
        /// The requested mode.
        mode: LockingMode,
        /// The backend that cannot provide it.
        backend: Backend,
    },
}
