use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::BookingError;
use crate::models::{new_id, Actor, NewService, Role, Service, ServiceUpdate, MAX_DURATION_MINUTES};
use crate::services::lifecycle::ensure_service_owner;

pub fn create_service(
    conn: &Connection,
    actor: &Actor,
    new: NewService,
    now: NaiveDateTime,
) -> Result<Service, BookingError> {
    if actor.role != Role::Provider {
        return Err(BookingError::Forbidden(
            "only providers can create services".to_string(),
        ));
    }
    if new.name.trim().is_empty() {
        return Err(BookingError::Validation("name must not be empty".to_string()));
    }
    if !(1..=MAX_DURATION_MINUTES).contains(&new.duration_minutes) {
        return Err(BookingError::Validation(format!(
            "duration_minutes must be between 1 and {MAX_DURATION_MINUTES}"
        )));
    }
    if new.price_cents < 0 {
        return Err(BookingError::Validation(
            "price_cents must not be negative".to_string(),
        ));
    }

    let service = Service {
        id: new_id(),
        provider_id: actor.user_id.clone(),
        name: new.name.trim().to_string(),
        description: new.description,
        duration_minutes: new.duration_minutes,
        price_cents: new.price_cents,
        is_active: true,
        allow_custom_time: new.allow_custom_time,
        created_at: now,
        updated_at: now,
    };
    queries::create_service(conn, &service)?;

    tracing::info!(service_id = %service.id, provider_id = %service.provider_id, "service created");
    Ok(service)
}

pub fn get_service(conn: &Connection, id: &str) -> Result<Service, BookingError> {
    queries::get_service(conn, id)?.ok_or_else(|| BookingError::NotFound(format!("service {id}")))
}

/// Toggles the active and custom-time flags. Deactivation is the normal way
/// to retire a service that still has reservations.
pub fn update_service(
    conn: &Connection,
    actor: &Actor,
    id: &str,
    update: ServiceUpdate,
    now: NaiveDateTime,
) -> Result<Service, BookingError> {
    let mut service = get_service(conn, id)?;
    ensure_service_owner(actor, &service)?;

    if let Some(is_active) = update.is_active {
        service.is_active = is_active;
    }
    if let Some(allow_custom_time) = update.allow_custom_time {
        service.allow_custom_time = allow_custom_time;
    }
    service.updated_at = now;

    queries::update_service_flags(conn, &service)?;
    Ok(service)
}

/// Hard delete, refused while any pending or confirmed reservation still
/// references the service.
pub fn delete_service(conn: &mut Connection, actor: &Actor, id: &str) -> Result<(), BookingError> {
    let tx = db::begin_write(conn)?;

    let service = get_service(&tx, id)?;
    ensure_service_owner(actor, &service)?;

    let active = queries::count_active_reservations_for_service(&tx, id)?;
    if active > 0 {
        tracing::warn!(service_id = %id, active, "refusing to delete service with active reservations");
        return Err(BookingError::Conflict(format!(
            "service has {active} active reservation(s); deactivate it instead"
        )));
    }

    queries::delete_service(&tx, id)?;
    tx.commit()?;

    tracing::info!(service_id = %id, "service deleted");
    Ok(())
}
