//! Core entity structs: users, events, and the tickets that make up an
//! event's inventory.
//!
//! Events and their ticket pools are created together and never resized.
//! The only field that changes after creation is a ticket's
//! [`TicketStatus`], and it changes exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EventId, TicketId, UserId};
use crate::money::Price;

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A registered user. Users create events and reserve tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// E-mail address, unique across all users.
    pub email: String,
}

/// Payload for creating a [`User`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// E-mail address, must not already be registered.
    pub email: String,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A scheduled event with a fixed pool of tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Store-assigned identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Unit price of one ticket.
    pub price: Price,
    /// The user who created the event.
    pub creator_id: UserId,
}

/// Payload for creating an [`Event`] together with its ticket pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Unit price, copied onto every ticket.
    pub price: Price,
    /// The creating user. Must exist.
    pub creator_id: UserId,
    /// Number of tickets in the pool.
    pub ticket_count: u32,
}

/// An event with its inventory counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// The event itself.
    #[serde(flatten)]
    pub event: Event,
    /// Size of the ticket pool.
    pub total_tickets: u64,
    /// Tickets not yet reserved.
    pub available_tickets: u64,
}

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Reservation state of a single ticket.
///
/// The reserved-by user and the reservation time exist only in the
/// [`Reserved`](TicketStatus::Reserved) variant, so a ticket can never hold
/// one without the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TicketStatus {
    /// Not yet claimed.
    Available,
    /// Claimed by a user. Terminal.
    Reserved {
        /// The user holding the ticket.
        user_id: UserId,
        /// When the reservation committed.
        reserved_at: DateTime<Utc>,
    },
}

impl TicketStatus {
    /// Whether the ticket has been claimed.
    pub const fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

/// One unit of inventory belonging to an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned identifier.
    pub id: TicketId,
    /// The owning event.
    pub event_id: EventId,
    /// Seat label, e.g. `Seat 12`.
    pub seat_number: String,
    /// Price at creation time.
    pub price: Price,
    /// Current reservation state.
    pub status: TicketStatus,
}

/// Seat label for the `index`-th ticket of a newly created pool.
pub fn seat_label(index: u32) -> String {
    format!("Seat {index}")
}
