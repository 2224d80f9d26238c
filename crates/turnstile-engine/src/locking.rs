//! How a reservation excludes concurrent claims on the same ticket.
//!
//! Two strategies exist, one per store capability:
//!
//! | Strategy | Needs | Concurrent reservations for one event |
//! |----------|-------|---------------------------------------|
//! | [`SkipLockedStrategy`] | row locks + `SKIP LOCKED` | run in parallel, each claims a different row |
//! | [`SerializedStrategy`] | nothing | run one at a time |
//!
//! The strategy is chosen once, when the engine is built, from the store's
//! reported [`Capabilities`] and the configured [`LockingMode`]. The
//! reservation path itself never branches on the backend.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use turnstile_db::{Backend, Capabilities, DbError, InventoryTx, RowLock};
use turnstile_types::{Event, EventId, Ticket};

use crate::error::EngineBuildError;

/// Requested locking behavior, as it appears in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockingMode {
    /// Use skip-locked selection when the store supports it, otherwise
    /// serialize.
    #[default]
    Auto,
    /// Require skip-locked selection.
    SkipLocked,
    /// Serialize reservations per event even if the store could do better.
    Serialized,
}

impl LockingMode {
    /// Short lowercase name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::SkipLocked => "skip_locked",
            Self::Serialized => "serialized",
        }
    }
}

impl core::fmt::Display for LockingMode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for LockingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "skip_locked" | "skip-locked" => Ok(Self::SkipLocked),
            "serialized" => Ok(Self::Serialized),
            other => Err(format!(
                "unknown locking mode `{other}` (expected auto, skip_locked or serialized)"
            )),
        }
    }
}

/// Steps 2-4 of a reservation: find the event and pick a candidate ticket
/// such that no other in-flight reservation can pick the same one.
#[async_trait]
pub trait LockingStrategy: Send + Sync + core::fmt::Debug {
    /// The concrete mode this strategy implements (never
    /// [`LockingMode::Auto`]).
    fn mode(&self) -> LockingMode;

    /// Load the event inside `tx`, entering whatever critical section the
    /// strategy needs. `None` means the event does not exist.
    async fn enter(
        &self,
        tx: &mut dyn InventoryTx,
        event_id: EventId,
    ) -> Result<Option<Event>, DbError>;

    /// Select one unreserved ticket of the event that is exclusively this
    /// transaction's to claim. `None` means the event is sold out.
    async fn candidate(
        &self,
        tx: &mut dyn InventoryTx,
        event_id: EventId,
    ) -> Result<Option<Ticket>, DbError>;
}

/// Cooperative row skipping: lock the chosen row, and let other
/// transactions pass over rows that are already locked.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipLockedStrategy;

#[async_trait]
impl LockingStrategy for SkipLockedStrategy {
    fn mode(&self) -> LockingMode {
        LockingMode::SkipLocked
    }

    async fn enter(
        &self,
        tx: &mut dyn InventoryTx,
        event_id: EventId,
    ) -> Result<Option<Event>, DbError> {
        tx.event(event_id).await
    }

    async fn candidate(
        &self,
        tx: &mut dyn InventoryTx,
        event_id: EventId,
    ) -> Result<Option<Ticket>, DbError> {
        tx.first_available(event_id, RowLock::SkipLocked).await
    }
}

/// Whole-operation serialization: hold the event lock for the rest of the
/// transaction, so a plain read of the first available ticket cannot race.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerializedStrategy;

#[async_trait]
impl LockingStrategy for SerializedStrategy {
    fn mode(&self) -> LockingMode {
        LockingMode::Serialized
    }

    async fn enter(
        &self,
        tx: &mut dyn InventoryTx,
        event_id: EventId,
    ) -> Result<Option<Event>, DbError> {
        tx.lock_event(event_id).await
    }

    async fn candidate(
        &self,
        tx: &mut dyn InventoryTx,
        event_id: EventId,
    ) -> Result<Option<Ticket>, DbError> {
        tx.first_available(event_id, RowLock::None).await
    }
}

/// Pick the strategy for a store.
///
/// # Errors
///
/// Returns [`EngineBuildError::UnsupportedLocking`] when
/// [`LockingMode::SkipLocked`] is requested from a store without
/// skip-locked selection.
pub fn select_strategy(
    mode: LockingMode,
    backend: Backend,
    capabilities: Capabilities,
) -> Result<Arc<dyn LockingStrategy>, EngineBuildError> {
    let skip_locked = capabilities.row_locks && capabilities.skip_locked;
    match mode {
        LockingMode::Auto if skip_locked => Ok(Arc::new(SkipLockedStrategy)),
        LockingMode::Auto | LockingMode::Serialized => Ok(Arc::new(SerializedStrategy)),
        LockingMode::SkipLocked if skip_locked => Ok(Arc::new(SkipLockedStrategy)),
        LockingMode::SkipLocked => Err(EngineBuildError::UnsupportedLocking { mode, backend }),
    }
}
