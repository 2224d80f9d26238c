//! Shared type definitions for the Turnstile ticket reservation service.
//!
//! This crate is the single source of truth for the data model used across
//! the workspace: the store maps rows into these types, the engine returns
//! them, and the HTTP layer serializes them.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for store-assigned integer keys
//! - [`money`] -- Exact ticket prices in minor units
//! - [`entities`] -- Users, events, tickets and creation payloads
//! - [`reservation`] -- The success payload of a reservation

pub mod entities;
pub mod ids;
pub mod money;
pub mod reservation;

// Re-export all public types at crate root for convenience.
pub use entities::{
    Event, EventSummary, NewEvent, NewUser, Ticket, TicketStatus, User, seat_label,
};
pub use ids::{EventId, InvalidId, TicketId, UserId};
pub use money::{InvalidPrice, PRICE_SCALE, Price};
pub use reservation::Reservation;
