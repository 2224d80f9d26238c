//! `SQLite` inventory store.
//!
//! `SQLite` has no row locks: a database admits one writer at a time and
//! readers never block. Exclusion therefore comes from taking the database
//! write lock at the start of the reservation transaction, which makes the
//! whole reservation critical section run for one caller at a time.
//!
//! Databases are opened in WAL mode with foreign keys enforced, and the
//! busy timeout bounds how long a transaction waits for the write lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use turnstile_types::{
    Event, EventId, EventSummary, NewEvent, NewUser, Ticket, TicketId, User, UserId, seat_label,
};

use crate::config::{Backend, StoreConfig};
use crate::error::DbError;
use crate::rows::{EventRow, EventSummaryRow, TicketRow, UserRow};
use crate::sql;
use crate::store::{Capabilities, Catalog, InventoryStore, InventoryTx, RowLock};

/// A no-op write that acquires the database write lock.
const TAKE_WRITE_LOCK: &str = "UPDATE events SET name = name WHERE id = $1";

/// Inventory store backed by an `SQLite` connection pool.
#[derive(Debug, Clone)]
pub struct SqliteInventory {
    pool: SqlitePool,
}

impl SqliteInventory {
    /// Open (creating if missing) the `SQLite` database named by the
    /// configured URL.
    ///
    /// In-memory databases exist per connection, so the pool is pinned to a
    /// single long-lived connection for them.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed, and
    /// [`DbError::Sqlx`] if the database cannot be opened.
    pub async fn connect(config: &StoreConfig) -> Result<Self, DbError> {
        let connect_options: SqliteConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;
        let connect_options = connect_options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(config.lock_timeout);

        let in_memory = config.url.contains(":memory:") || config.url.contains("mode=memory");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .idle_timeout(config.idle_timeout)
        };

        let pool = pool_options
            .acquire_timeout(config.acquire_timeout)
            .connect_with(connect_options)
            .await?;

        tracing::info!(
            max_connections = pool.options().get_max_connections(),
            in_memory,
            "opened SQLite database"
        );

        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub const fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return a reference to the underlying [`SqlitePool`].
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl InventoryStore for SqliteInventory {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            row_locks: false,
            skip_locked: false,
        }
    }

    async fn begin(&self) -> Result<Box<dyn InventoryTx>, DbError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteTx { tx }))
    }
}

/// An open `SQLite` transaction.
struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl InventoryTx for SqliteTx {
    async fn event(&mut self, event_id: EventId) -> Result<Option<Event>, DbError> {
        sqlx::query_as::<_, EventRow>(sql::SELECT_EVENT)
            .bind(event_id.get())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn lock_event(&mut self, event_id: EventId) -> Result<Option<Event>, DbError> {
        // Must be the first statement of the transaction: writing before
        // reading means no other writer can commit between our read and our
        // claim.
        sqlx::query(TAKE_WRITE_LOCK)
            .bind(event_id.get())
            .execute(&mut *self.tx)
            .await?;
        self.event(event_id).await
    }

    async fn first_available(
        &mut self,
        event_id: EventId,
        lock: RowLock,
    ) -> Result<Option<Ticket>, DbError> {
        if lock == RowLock::SkipLocked {
            return Err(DbError::Unsupported("FOR UPDATE SKIP LOCKED"));
        }
        sqlx::query_as::<_, TicketRow>(sql::FIRST_AVAILABLE)
            .bind(event_id.get())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Ticket::try_from)
            .transpose()
    }

    async fn mark_reserved(
        &mut self,
        ticket_id: TicketId,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<Ticket, DbError> {
        let row = sqlx::query_as::<_, TicketRow>(sql::MARK_RESERVED)
            .bind(ticket_id.get())
            .bind(user_id.get())
            .bind(at)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| DbError::from_write(e, "reserving user"))?
            .ok_or(DbError::ClaimLost(ticket_id))?;
        Ticket::try_from(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl Catalog for SqliteInventory {
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations/sqlite")
            .run(&self.pool)
            .await?;
        tracing::info!("SQLite migrations completed");
        Ok(())
    }

    async fn create_user(&self, new: &NewUser) -> Result<User, DbError> {
        let row = sqlx::query_as::<_, UserRow>(sql::INSERT_USER)
            .bind(&new.name)
            .bind(&new.email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DbError::from_write(e, "e-mail"))?;
        User::try_from(row)
    }

    async fn find_user(&self, user_id: UserId) -> Result<Option<User>, DbError> {
        sqlx::query_as::<_, UserRow>(sql::SELECT_USER)
            .bind(user_id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create_event(&self, new: &NewEvent) -> Result<EventSummary, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, EventRow>(sql::INSERT_EVENT)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.date)
            .bind(new.price.cents())
            .bind(new.creator_id.get())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| DbError::from_write(e, "event creator"))?;

        for index in 0..new.ticket_count {
            sqlx::query(sql::INSERT_TICKET)
                .bind(row.id)
                .bind(seat_label(index))
                .bind(new.price.cents())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        let event = Event::try_from(row)?;
        tracing::debug!(
            event_id = %event.id,
            tickets = new.ticket_count,
            "created event with ticket pool"
        );
        Ok(EventSummary {
            event,
            total_tickets: u64::from(new.ticket_count),
            available_tickets: u64::from(new.ticket_count),
        })
    }

    async fn find_event(&self, event_id: EventId) -> Result<Option<EventSummary>, DbError> {
        sqlx::query_as::<_, EventSummaryRow>(sql::SELECT_EVENT_SUMMARY)
            .bind(event_id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(EventSummary::try_from)
            .transpose()
    }

    async fn list_events(&self) -> Result<Vec<EventSummary>, DbError> {
        sqlx::query_as::<_, EventSummaryRow>(sql::LIST_EVENT_SUMMARIES)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(EventSummary::try_from)
            .collect()
    }

    async fn tickets_for_event(&self, event_id: EventId) -> Result<Vec<Ticket>, DbError> {
        sqlx::query_as::<_, TicketRow>(sql::SELECT_TICKETS_FOR_EVENT)
            .bind(event_id.get())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Ticket::try_from)
            .collect()
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("SQLite pool closed");
    }
}
