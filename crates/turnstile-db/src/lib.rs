//! Inventory store for the Turnstile ticket reservation service.
//!
//! The store owns all persisted state: users, events and each event's
//! ticket pool. Two backends are supported and chosen from the connection
//! URL at startup:
//!
//! ```text
//! Store::connect(url)
//!     |
//!     +-- postgres://... --> PgInventory     (row locks + SKIP LOCKED)
//!     |
//!     +-- sqlite:...     --> SqliteInventory (single writer)
//! ```
//!
//! Both expose the same transactional contract ([`InventoryStore`] and
//! [`InventoryTx`]) and report their locking [`Capabilities`], which the
//! reservation engine uses to pick how it excludes concurrent claims.
//!
//! # Modules
//!
//! - [`config`] -- Connection settings and backend detection
//! - [`store`] -- The transactional contract and the [`Store`] handle
//! - [`postgres`] -- `PostgreSQL` implementation
//! - [`sqlite`] -- `SQLite` implementation
//! - [`rows`] -- Table rows and their conversion into the data model
//! - [`error`] -- Shared error type

pub mod config;
pub mod error;
pub mod postgres;
pub mod rows;
pub mod sqlite;
pub mod store;

mod sql;

// Re-export primary types for convenience.
pub use config::{Backend, StoreConfig};
pub use error::DbError;
pub use postgres::PgInventory;
pub use sqlite::SqliteInventory;
pub use store::{Capabilities, Catalog, InventoryStore, InventoryTx, RowLock, Store};
