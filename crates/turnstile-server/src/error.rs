//! Error types for the HTTP API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that
//! converts into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! error body has the same shape:
//!
//! ```json
//! { "error": "NoInventoryAvailable", "detail": "...", "status": 409 }
//! ```

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;
use turnstile_db::DbError;
use turnstile_engine::{ErrorKind, ReserveError};

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A reservation was refused or failed.
    #[error(transparent)]
    Reserve(#[from] ReserveError),

    /// The request body or path failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested resource does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request conflicts with existing data.
    #[error("{0}")]
    Conflict(String),

    /// The request names a record that does not exist.
    #[error("{0}")]
    InvalidReference(String),

    /// The store failed outside the reservation path.
    #[error("store error: {0}")]
    Store(String),
}

impl ApiError {
    /// Stable error kind reported in the body.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Reserve(err) => err.kind().as_str(),
            Self::Validation(_) => "ValidationError",
            Self::NotFound(_) => "NotFound",
            Self::Conflict(_) => "Conflict",
            Self::InvalidReference(_) => "InvalidReference",
            Self::Store(_) => "StoreError",
        }
    }

    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Reserve(err) => match err.kind() {
                ErrorKind::EventNotFound => StatusCode::NOT_FOUND,
                ErrorKind::NoInventoryAvailable => StatusCode::CONFLICT,
                ErrorKind::TransientStoreError => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Validation(_) | Self::InvalidReference(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text for the `detail` field. Store failures are opaque to clients.
    fn detail(&self) -> String {
        match self {
            Self::Reserve(ReserveError::TransientStore { .. }) => {
                String::from("the reservation could not be completed; it is safe to retry")
            }
            Self::Store(_) => String::from("internal store error"),
            other => other.to_string(),
        }
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::InvalidReference(msg) => Self::InvalidReference(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let Self::Store(msg) = &self {
            error!(error = %msg, "Store failure while serving request");
        }

        let body = serde_json::json!({
            "error": self.kind(),
            "detail": self.detail(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use turnstile_types::EventId;

    use super::*;

    #[test]
    fn reserve_errors_map_to_documented_statuses() {
        let event_id = EventId::try_new(1).unwrap();

        let not_found = ApiError::from(ReserveError::EventNotFound { event_id });
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.kind(), "EventNotFound");

        let sold_out = ApiError::from(ReserveError::NoInventoryAvailable { event_id });
        assert_eq!(sold_out.status(), StatusCode::CONFLICT);
        assert_eq!(sold_out.kind(), "NoInventoryAvailable");

        let transient = ApiError::from(ReserveError::TransientStore {
            detail: "database is locked".to_owned(),
        });
        assert_eq!(transient.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transient.kind(), "TransientStoreError");
        assert!(!transient.detail().contains("locked"));
    }

    #[test]
    fn store_conflicts_keep_their_meaning() {
        let conflict = ApiError::from(DbError::Conflict("email taken".to_owned()));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let missing = ApiError::from(DbError::InvalidReference("no such user".to_owned()));
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let other = ApiError::from(DbError::Config("bad url".to_owned()));
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(other.detail(), "internal store error");
    }
}
