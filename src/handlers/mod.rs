pub mod extract;
pub mod health;
pub mod identity;
pub mod reservations;
pub mod services;
pub mod time_slots;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;
use chrono::{DateTime, NaiveDateTime};
use tower_http::trace::TraceLayer;

use crate::errors::BookingError;
use crate::models::{ensure_storable, truncate_to_seconds};
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route(
            "/api/reservations",
            get(reservations::list_recent).post(reservations::create_reservation),
        )
        .route("/api/reservations/my", get(reservations::list_mine))
        .route(
            "/api/reservations/:id",
            get(reservations::get_reservation).patch(reservations::update_reservation),
        )
        .route(
            "/api/providers/reservations",
            get(reservations::list_for_provider),
        )
        .route(
            "/api/admin/reservations/:id",
            axum::routing::delete(reservations::admin_delete_reservation),
        )
        .route("/api/services", post(services::create_service))
        .route(
            "/api/services/:id",
            get(services::get_service)
                .patch(services::update_service)
                .delete(services::delete_service),
        )
        .route(
            "/api/services/:id/time-slots",
            get(time_slots::list_available).post(time_slots::create_time_slot),
        )
        .route(
            "/api/time-slots/:id",
            patch(time_slots::update_time_slot).delete(time_slots::delete_time_slot),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ── Request validation ──
//
// Shape checks on untrusted input. Business rules live in `services`.

pub(crate) fn require<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, BookingError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(BookingError::Validation(format!("{field} is required"))),
    }
}

pub(crate) fn check_length(value: &str, field: &str, min: usize, max: usize) -> Result<(), BookingError> {
    let len = value.chars().count();
    if len < min {
        return Err(BookingError::Validation(format!(
            "{field} must be at least {min} characters long"
        )));
    }
    if len > max {
        return Err(BookingError::Validation(format!(
            "{field} must be at most {max} characters long"
        )));
    }
    Ok(())
}

pub(crate) fn validate_phone(phone: &str) -> Result<(), BookingError> {
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    if !allowed || digits < 10 {
        return Err(BookingError::Validation("invalid phone number format".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_email(email: &str) -> Result<(), BookingError> {
    let invalid = || BookingError::Validation("invalid email format".to_string());
    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    let has_dot = domain
        .rsplit_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty());
    if local.is_empty() || domain.contains('@') || !has_dot {
        return Err(invalid());
    }
    Ok(())
}

/// Accepts RFC 3339 (converted to UTC) or a naive UTC timestamp with `T` or
/// space separator and optional seconds.
pub(crate) fn parse_timestamp(value: &str, field: &str) -> Result<NaiveDateTime, BookingError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        let dt = truncate_to_seconds(dt.naive_utc());
        ensure_storable(&dt, field)?;
        return Ok(dt);
    }
    const NAIVE_FORMATS: [&str; 5] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    let dt = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(truncate_to_seconds)
        .ok_or_else(|| BookingError::Validation(format!("{field} must be a valid date")))?;
    ensure_storable(&dt, field)?;
    Ok(dt)
}

pub(crate) fn parse_future_timestamp(
    value: &str,
    field: &str,
    now: &NaiveDateTime,
) -> Result<NaiveDateTime, BookingError> {
    let dt = parse_timestamp(value, field)?;
    if dt < *now {
        return Err(BookingError::Validation(format!("{field} must be in the future")));
    }
    Ok(dt)
}
