//! Reservation engine for the Turnstile ticket reservation service.
//!
//! Given an event and a requesting user, the engine atomically claims one
//! unreserved ticket of that event, or reports that none remain. It is
//! correct under any number of concurrent callers: no ticket is ever granted
//! to two committed reservations.
//!
//! ```text
//! caller --> ReservationEngine::reserve(event_id, user_id)
//!                |
//!                +-- LockingStrategy (chosen once from store capabilities)
//!                |     SkipLocked:  read event, lock first free row, skip held rows
//!                |     Serialized:  lock event, read first free row
//!                |
//!                +-- InventoryTx: begin .. mark_reserved .. commit
//! ```
//!
//! # Modules
//!
//! - [`engine`] -- The reservation protocol and its settings
//! - [`locking`] -- Locking modes and the two strategies
//! - [`error`] -- Reservation and build errors

pub mod engine;
pub mod error;
pub mod locking;

pub use engine::{DEFAULT_TRANSACTION_TIMEOUT, EngineConfig, ReservationEngine};
pub use error::{EngineBuildError, ErrorKind, ReserveError};
pub use locking::{
    LockingMode, LockingStrategy, SerializedStrategy, SkipLockedStrategy, select_strategy,
};
