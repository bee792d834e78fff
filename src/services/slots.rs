//! Time slot store.
//!
//! Slot rows never carry a "booked" flag. Booked status is derived from the
//! reservation ledger on every read so that it cannot drift from it.

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::BookingError;
use crate::models::{ensure_storable, new_id, truncate_to_seconds, Actor, SlotUpdate, SlotView, TimeSlot};
use crate::services::catalog;
use crate::services::lifecycle::ensure_service_owner;

fn validate_interval(start: &NaiveDateTime, end: &NaiveDateTime) -> Result<(), BookingError> {
    ensure_storable(start, "start time")?;
    ensure_storable(end, "end time")?;
    if start >= end {
        return Err(BookingError::Validation(
            "start time must be before end time".to_string(),
        ));
    }
    Ok(())
}

pub fn create_slot(
    conn: &Connection,
    actor: &Actor,
    service_id: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
    is_available: bool,
    now: NaiveDateTime,
) -> Result<TimeSlot, BookingError> {
    let start = truncate_to_seconds(start);
    let end = truncate_to_seconds(end);
    validate_interval(&start, &end)?;

    let service = catalog::get_service(conn, service_id)?;
    ensure_service_owner(actor, &service)?;

    let slot = TimeSlot {
        id: new_id(),
        service_id: service.id,
        start_time: start,
        end_time: end,
        is_available,
        created_at: now,
        updated_at: now,
    };
    queries::create_time_slot(conn, &slot)?;

    tracing::info!(slot_id = %slot.id, service_id = %slot.service_id, "time slot created");
    Ok(slot)
}

pub fn get_slot(conn: &Connection, id: &str) -> Result<TimeSlot, BookingError> {
    queries::get_time_slot(conn, id)?.ok_or_else(|| BookingError::NotFound(format!("time slot {id}")))
}

/// Bookable candidates for a service with booked status attached.
///
/// Starts at `from` when given, otherwise at `now`. Slots flagged
/// unavailable are left out entirely; booked ones stay in the list, marked.
pub fn find_available(
    conn: &Connection,
    service_id: &str,
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Result<Vec<SlotView>, BookingError> {
    let from = from.unwrap_or(now);
    let candidates = queries::get_available_slots(conn, service_id, &from, to.as_ref())?;
    with_booked_status(conn, candidates)
}

/// Every slot of a service, for its provider's management view.
pub fn find_by_service(conn: &Connection, service_id: &str) -> Result<Vec<SlotView>, BookingError> {
    let slots = queries::get_slots_for_service(conn, service_id)?;
    with_booked_status(conn, slots)
}

pub fn with_booked_status(conn: &Connection, slots: Vec<TimeSlot>) -> Result<Vec<SlotView>, BookingError> {
    let ids: Vec<String> = slots.iter().map(|s| s.id.clone()).collect();
    let booked = queries::get_booked_slot_ids(conn, &ids)?;

    Ok(slots
        .into_iter()
        .map(|slot| {
            let is_booked = booked.contains(&slot.id);
            SlotView { slot, is_booked }
        })
        .collect())
}

/// Moving a slot that already holds an active reservation is refused, since
/// the reservation would no longer fall inside it.
pub fn update_slot(
    conn: &mut Connection,
    actor: &Actor,
    slot_id: &str,
    update: SlotUpdate,
    now: NaiveDateTime,
) -> Result<TimeSlot, BookingError> {
    let tx = db::begin_write(conn)?;

    let mut slot = get_slot(&tx, slot_id)?;
    let service = catalog::get_service(&tx, &slot.service_id)?;
    ensure_service_owner(actor, &service)?;

    let start = update.start_time.map(truncate_to_seconds).unwrap_or(slot.start_time);
    let end = update.end_time.map(truncate_to_seconds).unwrap_or(slot.end_time);
    validate_interval(&start, &end)?;

    if start != slot.start_time || end != slot.end_time {
        let occupied = queries::count_active_reservations_in_window(
            &tx,
            &slot.service_id,
            &slot.start_time,
            &slot.end_time,
        )?;
        if occupied > 0 {
            return Err(BookingError::Conflict(
                "cannot move a time slot that is already booked".to_string(),
            ));
        }
    }

    slot.start_time = start;
    slot.end_time = end;
    if let Some(is_available) = update.is_available {
        slot.is_available = is_available;
    }
    slot.updated_at = now;

    queries::update_time_slot(&tx, &slot)?;
    tx.commit()?;
    Ok(slot)
}

pub fn delete_slot(conn: &mut Connection, actor: &Actor, slot_id: &str) -> Result<(), BookingError> {
    let tx = db::begin_write(conn)?;

    let slot = get_slot(&tx, slot_id)?;
    let service = catalog::get_service(&tx, &slot.service_id)?;
    ensure_service_owner(actor, &service)?;

    let occupied = queries::count_active_reservations_in_window(
        &tx,
        &slot.service_id,
        &slot.start_time,
        &slot.end_time,
    )?;
    if occupied > 0 {
        tracing::warn!(slot_id = %slot_id, "refusing to delete booked time slot");
        return Err(BookingError::Conflict(
            "time slot is occupied by an active reservation".to_string(),
        ));
    }

    queries::delete_time_slot(&tx, slot_id)?;
    tx.commit()?;

    tracing::info!(slot_id = %slot_id, "time slot deleted");
    Ok(())
}
