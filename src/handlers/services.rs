use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::db;
use crate::errors::BookingError;
use crate::handlers::extract::JsonBody;
use crate::handlers::{check_length, require};
use crate::models::{now_utc, Actor, NewService, Service, ServiceUpdate};
use crate::services::catalog;
use crate::state::AppState;

// POST /api/services
#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    name: Option<String>,
    description: Option<String>,
    duration_minutes: Option<i64>,
    #[serde(default)]
    price_cents: i64,
    #[serde(default)]
    allow_custom_time: bool,
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    JsonBody(req): JsonBody<CreateServiceRequest>,
) -> Result<(StatusCode, Json<Service>), BookingError> {
    let name = require(&req.name, "name")?;
    check_length(name, "name", 1, 100)?;
    if let Some(description) = &req.description {
        check_length(description, "description", 0, 2000)?;
    }
    let duration_minutes = req
        .duration_minutes
        .ok_or_else(|| BookingError::Validation("duration_minutes is required".to_string()))?;

    let new = NewService {
        name: name.to_string(),
        description: req.description.filter(|d| !d.trim().is_empty()),
        duration_minutes,
        price_cents: req.price_cents,
        allow_custom_time: req.allow_custom_time,
    };

    let db = db::lock(&state.db)?;
    let service = catalog::create_service(&db, &actor, new, now_utc())?;
    Ok((StatusCode::CREATED, Json(service)))
}

// GET /api/services/:id
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Service>, BookingError> {
    let db = db::lock(&state.db)?;
    Ok(Json(catalog::get_service(&db, &id)?))
}

// PATCH /api/services/:id
pub async fn update_service(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<ServiceUpdate>,
) -> Result<Json<Service>, BookingError> {
    let db = db::lock(&state.db)?;
    Ok(Json(catalog::update_service(&db, &actor, &id, update, now_utc())?))
}

// DELETE /api/services/:id
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, BookingError> {
    let mut db = db::lock(&state.db)?;
    catalog::delete_service(&mut db, &actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
