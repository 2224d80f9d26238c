//! `PostgreSQL` inventory store.
//!
//! `PostgreSQL` offers row-level locks and `FOR UPDATE SKIP LOCKED`, so
//! concurrent reservations for the same event can each claim a different
//! ticket without waiting on one another.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time checked)
//! to avoid requiring a live database at build time. All queries are
//! parameterized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, Postgres, Transaction};
use turnstile_types::{
    Event, EventId, EventSummary, NewEvent, NewUser, Ticket, TicketId, User, UserId, seat_label,
};

use crate::config::{Backend, StoreConfig};
use crate::error::DbError;
use crate::rows::{EventRow, EventSummaryRow, TicketRow, UserRow};
use crate::sql::{self, event_columns, ticket_columns};
use crate::store::{Capabilities, Catalog, InventoryStore, InventoryTx, RowLock};

const LOCK_EVENT: &str = concat!(
    "SELECT ",
    event_columns!(),
    " FROM events WHERE id = $1 FOR UPDATE"
);

const FIRST_AVAILABLE_SKIP_LOCKED: &str = concat!(
    "SELECT ",
    ticket_columns!(),
    " FROM tickets WHERE event_id = $1 AND is_reserved = FALSE ",
    "ORDER BY id LIMIT 1 FOR UPDATE SKIP LOCKED"
);

/// Inventory store backed by a `PostgreSQL` connection pool.
#[derive(Debug, Clone)]
pub struct PgInventory {
    pool: PgPool,
    lock_timeout: String,
}

impl PgInventory {
    /// Connect to `PostgreSQL` using the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed, and
    /// [`DbError::Sqlx`] if the connection fails.
    pub async fn connect(config: &StoreConfig) -> Result<Self, DbError> {
        let connect_options: PgConnectOptions = config
            .url
            .parse()
            .map_err(|e: sqlx::Error| DbError::Config(format!("invalid database URL: {e}")))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect_with(connect_options)
            .await?;

        tracing::info!(
            max_connections = config.max_connections,
            "connected to PostgreSQL"
        );

        Ok(Self::from_pool(pool, config))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool, config: &StoreConfig) -> Self {
        Self {
            pool,
            lock_timeout: format!("{}ms", config.lock_timeout.as_millis()),
        }
    }

    /// Return a reference to the underlying [`PgPool`].
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InventoryStore for PgInventory {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            row_locks: true,
            skip_locked: true,
        }
    }

    async fn begin(&self) -> Result<Box<dyn InventoryTx>, DbError> {
        let mut tx = self.pool.begin().await?;
        // Bounds server-side waits on row locks for this transaction only.
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(&self.lock_timeout)
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// An open `PostgreSQL` transaction.
struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl InventoryTx for PgTx {
    async fn event(&mut self, event_id: EventId) -> Result<Option<Event>, DbError> {
        sqlx::query_as::<_, EventRow>(sql::SELECT_EVENT)
            .bind(event_id.get())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn lock_event(&mut self, event_id: EventId) -> Result<Option<Event>, DbError> {
        sqlx::query_as::<_, EventRow>(LOCK_EVENT)
            .bind(event_id.get())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(Event::try_from)
            .transpose()
    }

    async fn first_available(
        &mut self,
        event_id: EventId,
        lock: RowLock,
    ) -> Result<Option<Ticket>, DbError> {
        let query = match lock {
            RowLock::None => sql::FIRST_AVAILABLE,
            RowLock::SkipLocked => FIRST_AVAILABLE_SKIP_LOCKED,
        };
        sqlx::query_as::<_, TicketRow>(query)
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
impl Catalog for PgInventory {
    async fn run_migrations(&self) -> Result<(), DbError> {
        sqlx::migrate!("./migrations/postgres")
            .run(&self.pool)
            .await?;
        tracing::info!("PostgreSQL migrations completed");
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
        tracing::info!("PostgreSQL pool closed");
    }
}
