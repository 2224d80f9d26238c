//! Axum router construction for the Turnstile API.
//!
//! Assembles all routes into a single [`Router`] with request tracing and
//! permissive CORS.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness, backend and locking mode
/// - `POST /users`, `GET /users/{id}`
/// - `POST /events`, `GET /events`, `GET /events/{id}`
/// - `POST /tickets/reserve` -- the reservation engine
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/users", post(handlers::create_user))
        .route("/users/{id}", get(handlers::get_user))
        .route(
            "/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route("/events/{id}", get(handlers::get_event))
        .route("/tickets/reserve", post(handlers::reserve_ticket))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
