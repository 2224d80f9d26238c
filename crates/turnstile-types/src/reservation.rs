//! The result of a successful reservation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Ticket, TicketStatus};
use crate::ids::{EventId, TicketId, UserId};

/// A ticket paired with the user who claimed it, at the instant the claim
/// committed.
///
/// Not stored separately: it is read off the reserved [`Ticket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// The claimed ticket.
    pub ticket_id: TicketId,
    /// The event the ticket belongs to.
    pub event_id: EventId,
    /// The requester.
    pub user_id: UserId,
    /// When the claim was written.
    pub reserved_at: DateTime<Utc>,
}

impl Reservation {
    /// Read the reservation off a ticket, if it is reserved.
    pub fn from_ticket(ticket: &Ticket) -> Option<Self> {
        match ticket.status {
            TicketStatus::Reserved {
                user_id,
                reserved_at,
            } => Some(Self {
                ticket_id: ticket.id,
                event_id: ticket.event_id,
                user_id,
                reserved_at,
            }),
            TicketStatus::Available => None,
        }
    }
}
