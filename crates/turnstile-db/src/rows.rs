//! Raw table rows and their conversion into the data model.
//!
//! Rows decode the same way from both backends. Conversion into the
//! domain types validates keys and the ticket reservation invariant, so a
//! row that breaks the model surfaces as [`DbError::Corrupt`] instead of
//! flowing further.

use chrono::{DateTime, Utc};
use turnstile_types::{
    Event, EventId, EventSummary, InvalidId, Price, Ticket, TicketId, TicketStatus, User, UserId,
};

use crate::error::DbError;

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    /// User key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Unique e-mail.
    pub email: String,
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event key.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Scheduled date.
    pub date: DateTime<Utc>,
    /// Unit price in cents.
    pub price: i64,
    /// Creating user key.
    pub creator_id: i64,
}

/// An `events` row joined with its ticket counters.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventSummaryRow {
    /// The event columns.
    #[sqlx(flatten)]
    pub event: EventRow,
    /// Count of all tickets for the event.
    pub total_tickets: i64,
    /// Count of unreserved tickets for the event.
    pub available_tickets: i64,
}

/// A row from the `tickets` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TicketRow {
    /// Ticket key.
    pub id: i64,
    /// Owning event key.
    pub event_id: i64,
    /// Seat label.
    pub seat_number: String,
    /// Price in cents.
    pub price: i64,
    /// Reservation flag.
    pub is_reserved: bool,
    /// Holder, set iff reserved.
    pub user_id: Option<i64>,
    /// Claim time, set iff reserved.
    pub reserved_at: Option<DateTime<Utc>>,
}

fn key<T>(raw: i64, column: &str) -> Result<T, DbError>
where
    T: TryFrom<i64, Error = InvalidId>,
{
    T::try_from(raw).map_err(|e| DbError::Corrupt(format!("{column}: {e}")))
}

fn price(cents: i64, column: &str) -> Result<Price, DbError> {
    Price::from_cents(cents).map_err(|e| DbError::Corrupt(format!("{column}: {e}")))
}

fn count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or_default()
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: key::<UserId>(row.id, "users.id")?,
            name: row.name,
            email: row.email,
        })
    }
}

impl TryFrom<EventRow> for Event {
    type Error = DbError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: key::<EventId>(row.id, "events.id")?,
            name: row.name,
            description: row.description,
            date: row.date,
            price: price(row.price, "events.price")?,
            creator_id: key::<UserId>(row.creator_id, "events.creator_id")?,
        })
    }
}

impl TryFrom<EventSummaryRow> for EventSummary {
    type Error = DbError;

    fn try_from(row: EventSummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            event: Event::try_from(row.event)?,
            total_tickets: count(row.total_tickets),
            available_tickets: count(row.available_tickets),
        })
    }
}

impl TryFrom<TicketRow> for Ticket {
    type Error = DbError;

    fn try_from(row: TicketRow) -> Result<Self, Self::Error> {
        let status = match (row.is_reserved, row.user_id, row.reserved_at) {
            (false, None, None) => TicketStatus::Available,
            (true, Some(user_id), Some(reserved_at)) => TicketStatus::Reserved {
                user_id: key::<UserId>(user_id, "tickets.user_id")?,
                reserved_at,
            },
            _ => {
                return Err(DbError::Corrupt(format!(
                    "ticket {} has inconsistent reservation columns",
                    row.id
                )));
            }
        };

        Ok(Self {
            id: key::<TicketId>(row.id, "tickets.id")?,
            event_id: key::<EventId>(row.event_id, "tickets.event_id")?,
            seat_number: row.seat_number,
            price: price(row.price, "tickets.price")?,
            status,
        })
    }
}
