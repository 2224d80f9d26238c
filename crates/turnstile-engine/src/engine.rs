//! The reservation protocol.
//!
//! One call to [`ReservationEngine::reserve`] runs exactly one store
//! transaction:
//!
//! 1. begin
//! 2. load the event (under the strategy's critical section)
//! 3. select a candidate ticket no other transaction can select
//! 4. mark it reserved by the requesting user
//! 5. commit
//!
//! Any failure or early return between 1 and 5 drops the transaction,
//! which rolls it back. The whole protocol runs under
//! [`EngineConfig::transaction_timeout`]; a call that waits on locks for
//! longer is abandoned and reported as transient.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use turnstile_db::{InventoryStore, InventoryTx};
use turnstile_types::{EventId, Reservation, UserId};

use crate::error::{EngineBuildError, ReserveError};
use crate::locking::{LockingMode, LockingStrategy, select_strategy};

/// Default bound on one reservation transaction.
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Requested locking behavior.
    pub locking: LockingMode,
    /// Upper bound on one reservation, lock waits included.
    pub transaction_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locking: LockingMode::Auto,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Override the locking mode.
    #[must_use]
    pub const fn with_locking(mut self, locking: LockingMode) -> Self {
        self.locking = locking;
        self
    }

    /// Override the transaction timeout.
    #[must_use]
    pub const fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }
}

/// Grants tickets exclusively under concurrent contention.
///
/// Cheap to clone; clones share the store and strategy.
#[derive(Clone)]
pub struct ReservationEngine {
    store: Arc<dyn InventoryStore>,
    strategy: Arc<dyn LockingStrategy>,
    config: EngineConfig,
}

impl ReservationEngine {
    /// Build an engine over `store`, choosing the locking strategy from the
    /// store's capabilities and `config.locking`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineBuildError::UnsupportedLocking`] if the configured
    /// mode cannot be honored by the store.
    pub fn new(
        store: Arc<dyn InventoryStore>,
        config: EngineConfig,
    ) -> Result<Self, EngineBuildError> {
        let strategy = select_strategy(config.locking, store.backend(), store.capabilities())?;
        info!(
            backend = %store.backend(),
            requested = %config.locking,
            selected = %strategy.mode(),
            timeout_ms = config.transaction_timeout.as_millis(),
            "Reservation engine ready"
        );
        Ok(Self {
            store,
            strategy,
            config,
        })
    }

    /// The strategy actually in use (never [`LockingMode::Auto`]).
    pub fn locking_mode(&self) -> LockingMode {
        self.strategy.mode()
    }

    /// The settings the engine was built with.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Reserve one ticket of `event_id` for `user_id`.
    ///
    /// On success exactly one previously unreserved ticket is now held by
    /// `user_id`. On any error no ticket changed.
    ///
    /// # Errors
    ///
    /// - [`ReserveError::EventNotFound`] if the event does not exist.
    /// - [`ReserveError::NoInventoryAvailable`] if every ticket is taken.
    /// - [`ReserveError::TransientStore`] on store failure or timeout.
    pub async fn reserve(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Reservation, ReserveError> {
        let timeout = self.config.transaction_timeout;
        let result = match tokio::time::timeout(timeout, self.attempt(event_id, user_id)).await {
            Ok(result) => result,
            Err(elapsed) => Err(ReserveError::TransientStore {
                detail: format!(
                    "reservation abandoned after {}ms: {elapsed}",
                    timeout.as_millis()
                ),
            }),
        };

        match &result {
            Ok(reservation) => info!(
                event_id = %event_id,
                user_id = %user_id,
                ticket_id = %reservation.ticket_id,
                "Ticket reserved"
            ),
            Err(err) if err.is_retryable() => warn!(
                event_id = %event_id,
                user_id = %user_id,
                error = %err,
                "Reservation failed"
            ),
            Err(err) => debug!(
                event_id = %event_id,
                user_id = %user_id,
                kind = %err.kind(),
                "Reservation rejected"
            ),
        }

        result
    }

    async fn attempt(&self, event_id: EventId, user_id: UserId) -> Result<Reservation, ReserveError> {
        let mut tx = self.store.begin().await?;

        if self.strategy.enter(&mut *tx, event_id).await?.is_none() {
            abandon(tx).await;
            return Err(ReserveError::EventNotFound { event_id });
        }

        let Some(candidate) = self.strategy.candidate(&mut *tx, event_id).await? else {
            abandon(tx).await;
            return Err(ReserveError::NoInventoryAvailable { event_id });
        };

        let claimed = tx.mark_reserved(candidate.id, user_id, Utc::now()).await?;
        tx.commit().await?;

        Reservation::from_ticket(&claimed).ok_or_else(|| ReserveError::TransientStore {
            detail: format!("ticket {} was not marked reserved", claimed.id),
        })
    }
}

/// Roll back a transaction that ended in a business rejection. A failed
/// rollback is not an error for the caller: the connection discards the
/// transaction either way.
async fn abandon(tx: Box<dyn InventoryTx>) {
    if let Err(err) = tx.rollback().await {
        debug!(error = %err, "Rollback after rejection failed");
    }
}

impl core::fmt::Debug for ReservationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReservationEngine")
            .field("backend", &self.store.backend())
            .field("strategy", &self.strategy)
            .field("config", &self.config)
            .finish()
    }
}
