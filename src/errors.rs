use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Failure kinds surfaced by the booking core and the HTTP layer above it.
///
/// Everything except `Infrastructure` is a deterministic outcome of the input
/// and the current state, so callers should not retry those.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("unprocessable: {0}")]
    Unprocessable(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("infrastructure error: {0}")]
    Infrastructure(#[from] rusqlite::Error),

    /// The shared connection is unusable, e.g. its lock was poisoned.
    #[error("infrastructure error: {0}")]
    Unavailable(String),
}

impl BookingError {
    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::Infrastructure(_) | BookingError::Unavailable(_))
    }
}

impl IntoResponse for BookingError {
    fn into_response(self) -> Response {
        let status = match &self {
            BookingError::NotFound(_) => StatusCode::NOT_FOUND,
            BookingError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BookingError::Conflict(_) => StatusCode::CONFLICT,
            BookingError::InvalidTransition { .. } => StatusCode::CONFLICT,
            BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::Unauthorized => StatusCode::UNAUTHORIZED,
            BookingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            BookingError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (BookingError::NotFound("service".into()), StatusCode::NOT_FOUND),
            (BookingError::Unprocessable("inactive".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::Conflict("booked".into()), StatusCode::CONFLICT),
            (
                BookingError::InvalidTransition {
                    from: "completed".into(),
                    to: "cancelled".into(),
                },
                StatusCode::CONFLICT,
            ),
            (BookingError::Forbidden("nope".into()), StatusCode::FORBIDDEN),
            (BookingError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (BookingError::Unauthorized, StatusCode::UNAUTHORIZED),
            (
                BookingError::Infrastructure(rusqlite::Error::QueryReturnedNoRows),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                BookingError::Unavailable("database lock poisoned".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_only_infrastructure_is_retryable() {
        assert!(BookingError::Unavailable("db lock poisoned".into()).is_retryable());
        assert!(!BookingError::Conflict("booked".into()).is_retryable());
        assert!(!BookingError::Forbidden("nope".into()).is_retryable());
    }
}
