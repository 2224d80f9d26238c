//! REST API endpoint handlers.
//!
//! Handlers validate their input, call the catalog or the reservation
//! engine, and map the outcome to a status code. None of them touch ticket
//! state directly: `POST /tickets/reserve` is the only write path for
//! tickets and it goes through [`ReservationEngine`](turnstile_engine::ReservationEngine).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness plus backend and locking mode |
//! | `POST` | `/users` | Register a user |
//! | `GET` | `/users/{id}` | Get one user |
//! | `POST` | `/events` | Create an event and its ticket pool |
//! | `GET` | `/events` | List events with availability |
//! | `GET` | `/events/{id}` | Get one event with its tickets |
//! | `POST` | `/tickets/reserve` | Reserve one ticket |

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use turnstile_types::{EventId, NewEvent, NewUser, Price, UserId};
use validator::Validate;

use crate::error::ApiError;
use crate::state::AppState;

/// Largest ticket pool a single event may be created with.
pub const MAX_TICKETS_PER_EVENT: u32 = 10_000;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Body of `POST /users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// E-mail address.
    #[validate(email, length(max = 255))]
    pub email: String,
}

/// Body of `POST /events`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEventRequest {
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    #[validate(length(max = 4096))]
    pub description: String,
    /// When the event takes place.
    pub date: DateTime<Utc>,
    /// Unit price, as a decimal string or number with at most two places.
    pub price: Price,
    /// The creating user.
    #[validate(range(min = 1))]
    pub creator_id: i64,
    /// Size of the ticket pool.
    #[validate(range(max = MAX_TICKETS_PER_EVENT))]
    pub ticket_count: u32,
}

/// Body of `POST /tickets/reserve`.
#[derive(Debug, Deserialize, Validate)]
pub struct ReserveRequest {
    /// The event to reserve from.
    #[validate(range(min = 1))]
    pub event_id: i64,
    /// The requester.
    #[validate(range(min = 1))]
    pub user_id: i64,
}

/// Unwrap and validate a JSON body.
fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(body) = payload?;
    body.validate()?;
    Ok(body)
}

fn id<T>(raw: i64, field: &str) -> Result<T, ApiError>
where
    T: TryFrom<i64, Error = turnstile_types::InvalidId>,
{
    T::try_from(raw).map_err(|e| ApiError::Validation(format!("{field}: {e}")))
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Report liveness together with the backend and the locking mode in use.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "backend": state.backend,
        "locking": state.engine.locking_mode(),
    }))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Register a user. 409 if the e-mail is taken.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validated(payload)?;
    let user = state
        .catalog
        .create_user(&NewUser {
            name: body.name,
            email: body.email,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Return one user.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(raw) = path?;
    let user_id: UserId = id(raw, "id")?;
    let user = state
        .catalog
        .find_user(user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user {user_id} not found")))?;
    Ok(Json(user))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Create an event with its whole ticket pool.
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validated(payload)?;
    let summary = state
        .catalog
        .create_event(&NewEvent {
            name: body.name,
            description: body.description,
            date: body.date,
            price: body.price,
            creator_id: id(body.creator_id, "creator_id")?,
            ticket_count: body.ticket_count,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// List all events with their availability counters.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let events = state.catalog.list_events().await?;
    Ok(Json(serde_json::json!({
        "count": events.len(),
        "events": events,
    })))
}

/// Return one event with all of its tickets.
pub async fn get_event(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(raw) = path?;
    let event_id: EventId = id(raw, "id")?;
    let event = state
        .catalog
        .find_event(event_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("event {event_id} not found")))?;
    let tickets = state.catalog.tickets_for_event(event_id).await?;
    Ok(Json(serde_json::json!({
        "event": event,
        "tickets": tickets,
    })))
}

// ---------------------------------------------------------------------------
// POST /tickets/reserve
// ---------------------------------------------------------------------------

/// Reserve one ticket. 201 on success, 400 for an unknown user, 404 for an
/// unknown event, 409 when sold out, 500 on a transient store failure.
pub async fn reserve_ticket(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ReserveRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let body = validated(payload)?;
    let event_id: EventId = id(body.event_id, "event_id")?;
    let user_id: UserId = id(body.user_id, "user_id")?;

    // The engine would only see the foreign key failure, which is not retryable.
    if state.catalog.find_user(user_id).await?.is_none() {
        return Err(ApiError::InvalidReference(format!(
            "user {user_id} does not exist"
        )));
    }

    let reservation = state.engine.reserve(event_id, user_id).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}
