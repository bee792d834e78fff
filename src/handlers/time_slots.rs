use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db;
use crate::errors::BookingError;
use crate::handlers::extract::JsonBody;
use crate::handlers::{parse_future_timestamp, parse_timestamp, require};
use crate::models::{now_utc, Actor, SlotUpdate, SlotView, TimeSlot};
use crate::services::{catalog, slots};
use crate::state::AppState;

// GET /api/services/:id/time-slots
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

fn optional_timestamp(value: &Option<String>, field: &str) -> Result<Option<chrono::NaiveDateTime>, BookingError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => parse_timestamp(v, field).map(Some),
        _ => Ok(None),
    }
}

pub async fn list_available(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SlotView>>, BookingError> {
    let from = optional_timestamp(&query.start_date, "start_date")?;
    let to = optional_timestamp(&query.end_date, "end_date")?;

    let db = db::lock(&state.db)?;
    catalog::get_service(&db, &service_id)?;
    Ok(Json(slots::find_available(&db, &service_id, from, to, now_utc())?))
}

// POST /api/services/:id/time-slots
#[derive(Debug, Deserialize)]
pub struct CreateSlotRequest {
    start_time: Option<String>,
    end_time: Option<String>,
    is_available: Option<bool>,
}

pub async fn create_time_slot(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(service_id): Path<String>,
    JsonBody(req): JsonBody<CreateSlotRequest>,
) -> Result<(StatusCode, Json<TimeSlot>), BookingError> {
    let now = now_utc();
    let start = parse_future_timestamp(require(&req.start_time, "start_time")?, "start_time", &now)?;
    let end = parse_future_timestamp(require(&req.end_time, "end_time")?, "end_time", &now)?;

    let db = db::lock(&state.db)?;
    let slot = slots::create_slot(
        &db,
        &actor,
        &service_id,
        start,
        end,
        req.is_available.unwrap_or(true),
        now,
    )?;
    Ok((StatusCode::CREATED, Json(slot)))
}

// PATCH /api/time-slots/:id
#[derive(Debug, Deserialize)]
pub struct UpdateSlotRequest {
    start_time: Option<String>,
    end_time: Option<String>,
    is_available: Option<bool>,
}

pub async fn update_time_slot(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(slot_id): Path<String>,
    JsonBody(req): JsonBody<UpdateSlotRequest>,
) -> Result<Json<TimeSlot>, BookingError> {
    let update = SlotUpdate {
        start_time: optional_timestamp(&req.start_time, "start_time")?,
        end_time: optional_timestamp(&req.end_time, "end_time")?,
        is_available: req.is_available,
    };

    let mut db = db::lock(&state.db)?;
    Ok(Json(slots::update_slot(&mut db, &actor, &slot_id, update, now_utc())?))
}

// DELETE /api/time-slots/:id
pub async fn delete_time_slot(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(slot_id): Path<String>,
) -> Result<StatusCode, BookingError> {
    let mut db = db::lock(&state.db)?;
    slots::delete_slot(&mut db, &actor, &slot_id)?;
    Ok(StatusCode::NO_CONTENT)
}
