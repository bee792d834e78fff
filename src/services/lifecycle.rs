//! Reservation lifecycle guard.
//!
//! Owns both halves of "may this change happen": the status graph (see
//! [`ReservationStatus::can_transition_to`]) and the ownership rule deciding
//! who may ask for it. Handlers never re-implement either.

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::BookingError;
use crate::models::{
    now_utc, Actor, Reservation, ReservationAccess, ReservationStatus, ReservationUpdate, Service,
};

/// The customer user linked to the reservation may only cancel. The provider
/// owning the service may request any legal transition. Both may edit notes.
/// Nobody else may touch the reservation.
///
/// The customer rule is checked first, so a provider who booked their own
/// service is held to it for that reservation.
pub fn authorize(
    actor: &Actor,
    access: &ReservationAccess,
    requested: Option<ReservationStatus>,
) -> Result<(), BookingError> {
    let is_owner = access.reservation_user_id.as_deref() == Some(actor.user_id.as_str());
    if is_owner {
        return match requested {
            None | Some(ReservationStatus::Cancelled) => Ok(()),
            Some(_) => Err(BookingError::Forbidden(
                "customers can only cancel reservations".to_string(),
            )),
        };
    }

    if actor.user_id == access.service_provider_id {
        return Ok(());
    }

    Err(BookingError::Forbidden(
        "you do not have permission to update this reservation".to_string(),
    ))
}

pub fn ensure_service_owner(actor: &Actor, service: &Service) -> Result<(), BookingError> {
    if actor.user_id == service.provider_id {
        Ok(())
    } else {
        Err(BookingError::Forbidden(
            "you do not own this service".to_string(),
        ))
    }
}

pub fn update_reservation(
    conn: &mut Connection,
    reservation_id: &str,
    actor: &Actor,
    update: ReservationUpdate,
) -> Result<Reservation, BookingError> {
    update_reservation_at(conn, reservation_id, actor, update, now_utc())
}

/// Read-modify-write of status and notes on one write transaction, so the
/// transition is checked against the state it is applied to.
pub fn update_reservation_at(
    conn: &mut Connection,
    reservation_id: &str,
    actor: &Actor,
    update: ReservationUpdate,
    now: NaiveDateTime,
) -> Result<Reservation, BookingError> {
    let tx = db::begin_write(conn)?;

    let mut reservation = queries::get_reservation(&tx, reservation_id)?
        .ok_or_else(|| BookingError::NotFound(format!("reservation {reservation_id}")))?;
    let access = queries::get_reservation_access(&tx, reservation_id)?
        .ok_or_else(|| BookingError::NotFound(format!("reservation {reservation_id}")))?;

    authorize(actor, &access, update.status)?;

    if update.status.is_none() && update.notes.is_none() {
        return Ok(reservation);
    }

    let previous = reservation.status;
    if let Some(next) = update.status {
        reservation.status = previous.transition(next)?;
    }
    if let Some(notes) = update.notes {
        reservation.notes = Some(notes).filter(|n| !n.trim().is_empty());
    }
    reservation.updated_at = now;

    queries::update_reservation(&tx, &reservation)?;
    tx.commit()?;

    if previous != reservation.status {
        tracing::info!(
            reservation_id = %reservation.id,
            from = previous.as_str(),
            to = reservation.status.as_str(),
            actor = %actor.user_id,
            "reservation status changed"
        );
    }

    Ok(reservation)
}

pub fn confirm(conn: &mut Connection, reservation_id: &str, actor: &Actor) -> Result<Reservation, BookingError> {
    change_status(conn, reservation_id, actor, ReservationStatus::Confirmed)
}

pub fn complete(conn: &mut Connection, reservation_id: &str, actor: &Actor) -> Result<Reservation, BookingError> {
    change_status(conn, reservation_id, actor, ReservationStatus::Completed)
}

pub fn cancel(conn: &mut Connection, reservation_id: &str, actor: &Actor) -> Result<Reservation, BookingError> {
    change_status(conn, reservation_id, actor, ReservationStatus::Cancelled)
}

fn change_status(
    conn: &mut Connection,
    reservation_id: &str,
    actor: &Actor,
    status: ReservationStatus,
) -> Result<Reservation, BookingError> {
    update_reservation(
        conn,
        reservation_id,
        actor,
        ReservationUpdate {
            status: Some(status),
            notes: None,
        },
    )
}
