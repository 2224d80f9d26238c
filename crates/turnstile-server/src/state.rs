//! Shared application state for the HTTP API.

use std::sync::Arc;

use turnstile_db::{Backend, Catalog, Store};
use turnstile_engine::ReservationEngine;

/// Handles every request handler needs. Shared behind an [`Arc`].
#[derive(Clone)]
pub struct AppState {
    /// Reservation engine, the only writer of ticket state.
    pub engine: ReservationEngine,
    /// Creation and lookup of users and events.
    pub catalog: Arc<dyn Catalog>,
    /// The connected backend, reported by `/health`.
    pub backend: Backend,
}

impl AppState {
    /// Bundle a connected store with an engine built over it.
    pub fn new(store: &Store, engine: ReservationEngine) -> Self {
        Self {
            engine,
            catalog: Arc::clone(&store.catalog),
            backend: store.backend,
        }
    }
}

impl core::fmt::Debug for AppState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppState")
            .field("engine", &self.engine)
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}
