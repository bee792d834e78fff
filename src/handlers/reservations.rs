use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db;
use crate::errors::BookingError;
use crate::handlers::extract::JsonBody;
use crate::handlers::identity::check_admin;
use crate::handlers::{check_length, parse_future_timestamp, require, validate_email, validate_phone};
use crate::models::{
    now_utc, Actor, CustomerContact, Reservation, ReservationDetails, ReservationUpdate, Role,
};
use crate::services::booking::{self, BookingRequest, BookingTarget};
use crate::services::{ledger, lifecycle};
use crate::state::AppState;

const NAME_MAX: usize = 100;
const NOTES_MAX: usize = 2000;

// POST /api/reservations
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    service_id: Option<String>,
    time_slot_id: Option<String>,
    reservation_date: Option<String>,
    notes: Option<String>,
}

#[derive(Serialize)]
pub struct CreateReservationResponse {
    message: &'static str,
    id: String,
}

impl CreateReservationRequest {
    fn into_booking(self, user_id: Option<String>) -> Result<BookingRequest, BookingError> {
        let first_name = require(&self.first_name, "first_name")?;
        check_length(first_name, "first_name", 1, NAME_MAX)?;
        let last_name = require(&self.last_name, "last_name")?;
        check_length(last_name, "last_name", 1, NAME_MAX)?;
        let phone = require(&self.phone, "phone")?;
        validate_phone(phone)?;
        let service_id = require(&self.service_id, "service_id")?;

        let email = match self.email.as_deref().map(str::trim) {
            Some(e) if !e.is_empty() => {
                validate_email(e)?;
                Some(e.to_string())
            }
            _ => None,
        };

        if let Some(notes) = &self.notes {
            check_length(notes, "notes", 0, NOTES_MAX)?;
        }

        let now = now_utc();
        let at = match self.reservation_date.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => Some(parse_future_timestamp(d, "reservation_date", &now)?),
            _ => None,
        };

        let slot_id = self
            .time_slot_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let target = match (slot_id, at) {
            (Some(slot_id), at) => BookingTarget::Slot {
                slot_id: slot_id.to_string(),
                at,
            },
            (None, Some(at)) => BookingTarget::CustomTime(at),
            (None, None) => {
                return Err(BookingError::Validation(
                    "time_slot_id or reservation_date is required".to_string(),
                ))
            }
        };

        Ok(BookingRequest {
            user_id,
            contact: CustomerContact {
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                phone: phone.to_string(),
                email,
            },
            service_id: service_id.to_string(),
            target,
            notes: self.notes,
        })
    }
}

pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    actor: Option<Actor>,
    JsonBody(req): JsonBody<CreateReservationRequest>,
) -> Result<(StatusCode, Json<CreateReservationResponse>), BookingError> {
    let request = req.into_booking(actor.map(|a| a.user_id))?;

    let id = {
        let mut db = db::lock(&state.db)?;
        booking::create_reservation(&mut db, &request)?
    };

    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse {
            message: "Reservation created successfully",
            id,
        }),
    ))
}

// GET /api/reservations
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    limit: Option<i64>,
}

pub async fn list_recent(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<Vec<Reservation>>, BookingError> {
    let max = state.config.recent_reservations_limit;
    let limit = query.limit.unwrap_or(max).clamp(0, max);

    let db = db::lock(&state.db)?;
    Ok(Json(ledger::find_recent(&db, limit)?))
}

// GET /api/reservations/my
pub async fn list_mine(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Reservation>>, BookingError> {
    let db = db::lock(&state.db)?;
    Ok(Json(ledger::find_by_user(&db, &actor.user_id)?))
}

// GET /api/reservations/:id
pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ReservationDetails>, BookingError> {
    let db = db::lock(&state.db)?;
    Ok(Json(ledger::find_details(&db, &id)?))
}

// PATCH /api/reservations/:id
pub async fn update_reservation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ReservationUpdate>,
) -> Result<Json<Reservation>, BookingError> {
    if let Some(notes) = &update.notes {
        check_length(notes, "notes", 0, NOTES_MAX)?;
    }

    let mut db = db::lock(&state.db)?;
    Ok(Json(lifecycle::update_reservation(&mut db, &id, &actor, update)?))
}

// GET /api/providers/reservations
pub async fn list_for_provider(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Reservation>>, BookingError> {
    if actor.role != Role::Provider {
        return Err(BookingError::Forbidden(
            "only providers can list provider reservations".to_string(),
        ));
    }

    let db = db::lock(&state.db)?;
    Ok(Json(ledger::find_by_provider(&db, &actor.user_id)?))
}

// DELETE /api/admin/reservations/:id
pub async fn admin_delete_reservation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, BookingError> {
    check_admin(&headers, &state.config.admin_token)?;

    let mut db = db::lock(&state.db)?;
    ledger::delete(&mut db, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
