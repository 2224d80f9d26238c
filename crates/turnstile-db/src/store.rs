//! The transactional contract between the reservation engine and the store.
//!
//! [`InventoryStore`] hands out transactions; [`InventoryTx`] is the set of
//! reads and writes the engine may issue inside one. The traits are object
//! safe so the engine can hold a backend chosen at runtime.
//!
//! [`Catalog`] covers everything outside the reservation path: creating
//! users and events and reading them back.
//!
//! ```text
//! Store::connect(url)
//!     |
//!     +-- inventory: Arc<dyn InventoryStore> --> ReservationEngine
//!     |
//!     +-- catalog:   Arc<dyn Catalog>        --> HTTP handlers, tests
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use turnstile_types::{
    Event, EventId, EventSummary, NewEvent, NewUser, Ticket, TicketId, User, UserId,
};

use crate::config::{Backend, StoreConfig};
use crate::error::DbError;
use crate::postgres::PgInventory;
use crate::sqlite::SqliteInventory;

/// Locking features a backend offers for reservation queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Rows can be locked exclusively for the rest of the transaction.
    pub row_locks: bool,
    /// A locking select can skip rows already locked by another
    /// transaction instead of waiting on them.
    pub skip_locked: bool,
}

/// Lock clause applied when selecting a candidate ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLock {
    /// Plain read. Exclusion must come from elsewhere.
    None,
    /// Lock the selected row and skip rows other transactions hold.
    SkipLocked,
}

/// A source of inventory transactions.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// The backend behind this store.
    fn backend(&self) -> Backend;

    /// What the backend can do under lock.
    fn capabilities(&self) -> Capabilities;

    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn InventoryTx>, DbError>;
}

/// One open transaction.
///
/// Dropping a transaction without calling [`commit`](InventoryTx::commit)
/// rolls it back, so every early return and every cancelled future leaves
/// the store untouched.
#[async_trait]
pub trait InventoryTx: Send {
    /// Read an event.
    async fn event(&mut self, event_id: EventId) -> Result<Option<Event>, DbError>;

    /// Read an event and hold an exclusive lock that every other
    /// `lock_event` on the same event waits for until this transaction ends.
    async fn lock_event(&mut self, event_id: EventId) -> Result<Option<Event>, DbError>;

    /// The lowest-id unreserved ticket of an event.
    async fn first_available(
        &mut self,
        event_id: EventId,
        lock: RowLock,
    ) -> Result<Option<Ticket>, DbError>;

    /// Mark a ticket reserved by `user_id` at `at`, returning the updated
    /// ticket.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ClaimLost`] if the ticket was already reserved.
    async fn mark_reserved(
        &mut self,
        ticket_id: TicketId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Ticket, DbError>;

    /// Commit the transaction.
    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    /// Roll the transaction back.
    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}

/// Creation and lookup of users and events.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Apply all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DbError>;

    /// Register a user.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Conflict`] if the e-mail is already registered.
    async fn create_user(&self, new: &NewUser) -> Result<User, DbError>;

    /// Look up a user.
    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, DbError>;

    /// Create an event and its whole ticket pool in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidReference`] if the creator does not exist.
    async fn create_event(&self, new: &NewEvent) -> Result<EventSummary, DbError>;

    /// Look up an event with its ticket counters.
    async fn find_event(&self, event_id: EventId) -> Result<Option<EventSummary>, DbError>;

    /// All events with their ticket counters, by ascending id.
    async fn list_events(&self) -> Result<Vec<EventSummary>, DbError>;

    /// All tickets of an event, by ascending id.
    async fn tickets_for_event(&self, event_id: EventId) -> Result<Vec<Ticket>, DbError>;

    /// Close all pooled connections.
    async fn close(&self);
}

/// A connected store: both handles share one connection pool.
#[derive(Clone)]
pub struct Store {
    /// The detected backend.
    pub backend: Backend,
    /// Transactional handle for the reservation engine.
    pub inventory: Arc<dyn InventoryStore>,
    /// Handle for everything else.
    pub catalog: Arc<dyn Catalog>,
}

impl Store {
    /// Connect to the backend named by the configured URL.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL is not supported or cannot be
    /// parsed, and [`DbError::Sqlx`] if the connection fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, DbError> {
        match config.backend()? {
            Backend::Postgres => Ok(Self::from_shared(Arc::new(
                PgInventory::connect(config).await?,
            ))),
            Backend::Sqlite => Ok(Self::from_shared(Arc::new(
                SqliteInventory::connect(config).await?,
            ))),
        }
    }

    fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: InventoryStore + Catalog + 'static,
    {
        let inventory: Arc<dyn InventoryStore> = Arc::<S>::clone(&store);
        Self {
            backend: store.backend(),
            inventory,
            catalog: store,
        }
    }
}

impl core::fmt::Debug for Store {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("capabilities", &self.inventory.capabilities())
            .finish_non_exhaustive()
    }
}
