//! HTTP API for the Turnstile ticket reservation service.
//!
//! A thin caller of the reservation engine and the store catalog. Request
//! bodies are validated here, before anything reaches the engine, and
//! engine errors are mapped to status codes:
//!
//! | Engine result | Status |
//! |---------------|--------|
//! | reservation | 201 |
//! | `EventNotFound` | 404 |
//! | `NoInventoryAvailable` | 409 |
//! | `TransientStoreError` | 500 |
//!
//! # Modules
//!
//! - [`config`] -- `turnstile.yaml` loading and environment overrides
//! - [`handlers`] -- Endpoint handlers and request bodies
//! - [`router`] -- Route table and middleware
//! - [`server`] -- Listener lifecycle
//! - [`state`] -- Shared handler state
//! - [`error`] -- API error type and its JSON body

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use config::{ConfigError, TurnstileConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
