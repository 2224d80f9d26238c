//! SQL text shared by both backends.
//!
//! `PostgreSQL` and `SQLite` both accept `$n` placeholders, `RETURNING`,
//! `TRUE`/`FALSE` literals and aggregate `FILTER` clauses, so everything
//! except the locking clauses is written once here. Lock-taking statements
//! live next to the backend that understands them.

/// Columns selected for a [`UserRow`](crate::rows::UserRow).
macro_rules! user_columns {
    () => {
        "id, name, email"
    };
}

/// Columns selected for an [`EventRow`](crate::rows::EventRow).
macro_rules! event_columns {
    () => {
        "id, name, description, date, price, creator_id"
    };
}

/// Columns selected for a [`TicketRow`](crate::rows::TicketRow).
macro_rules! ticket_columns {
    () => {
        "id, event_id, seat_number, price, is_reserved, user_id, reserved_at"
    };
}

pub(crate) use {event_columns, ticket_columns};

pub const INSERT_USER: &str =
    concat!("INSERT INTO users (name, email) VALUES ($1, $2) RETURNING ", user_columns!());

pub const SELECT_USER: &str = concat!("SELECT ", user_columns!(), " FROM users WHERE id = $1");

pub const INSERT_EVENT: &str = concat!(
    "INSERT INTO events (name, description, date, price, creator_id) ",
    "VALUES ($1, $2, $3, $4, $5) RETURNING ",
    event_columns!()
);

pub const INSERT_TICKET: &str = "INSERT INTO tickets (event_id, seat_number, price, is_reserved) \
     VALUES ($1, $2, $3, FALSE)";

pub const SELECT_EVENT: &str =
    concat!("SELECT ", event_columns!(), " FROM events WHERE id = $1");

/// Event plus counters; one aggregate query instead of a fetch per event.
macro_rules! event_summary_select {
    () => {
        "SELECT e.id, e.name, e.description, e.date, e.price, e.creator_id, \
         COUNT(t.id) AS total_tickets, \
         COUNT(t.id) FILTER (WHERE t.is_reserved = FALSE) AS available_tickets \
         FROM events e LEFT JOIN tickets t ON t.event_id = e.id "
    };
}

pub const SELECT_EVENT_SUMMARY: &str = concat!(
    event_summary_select!(),
    "WHERE e.id = $1 GROUP BY e.id"
);

pub const LIST_EVENT_SUMMARIES: &str =
    concat!(event_summary_select!(), "GROUP BY e.id ORDER BY e.id");

pub const SELECT_TICKETS_FOR_EVENT: &str = concat!(
    "SELECT ",
    ticket_columns!(),
    " FROM tickets WHERE event_id = $1 ORDER BY id"
);

/// Lowest-id unreserved ticket of an event, without any lock clause.
pub const FIRST_AVAILABLE: &str = concat!(
    "SELECT ",
    ticket_columns!(),
    " FROM tickets WHERE event_id = $1 AND is_reserved = FALSE ORDER BY id LIMIT 1"
);

/// Claim a ticket. The `is_reserved = FALSE` guard makes a second claim on
/// the same row match nothing.
pub const MARK_RESERVED: &str = concat!(
    "UPDATE tickets SET is_reserved = TRUE, user_id = $2, reserved_at = $3 ",
    "WHERE id = $1 AND is_reserved = FALSE RETURNING ",
    ticket_columns!()
);
