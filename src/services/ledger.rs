use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::BookingError;
use crate::models::{Reservation, ReservationAccess, ReservationDetails};

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Reservation, BookingError> {
    queries::get_reservation(conn, id)?.ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))
}

pub fn find_details(conn: &Connection, id: &str) -> Result<ReservationDetails, BookingError> {
    queries::get_reservation_details(conn, id)?
        .ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))
}

/// Linked user id and owning provider id, for callers rendering what an
/// identity may do with the reservation.
pub fn access(conn: &Connection, id: &str) -> Result<ReservationAccess, BookingError> {
    queries::get_reservation_access(conn, id)?
        .ok_or_else(|| BookingError::NotFound(format!("reservation {id}")))
}

pub fn find_by_user(conn: &Connection, user_id: &str) -> Result<Vec<Reservation>, BookingError> {
    Ok(queries::get_reservations_for_user(conn, user_id)?)
}

pub fn find_by_provider(conn: &Connection, provider_id: &str) -> Result<Vec<Reservation>, BookingError> {
    Ok(queries::get_reservations_for_provider(conn, provider_id)?)
}

pub fn find_recent(conn: &Connection, limit: i64) -> Result<Vec<Reservation>, BookingError> {
    Ok(queries::get_recent_reservations(conn, limit.max(0))?)
}

/// Administrative hard delete. Normal flow cancels instead; callers gate
/// this behind their admin credential.
pub fn delete(conn: &mut Connection, id: &str) -> Result<(), BookingError> {
    let tx = db::begin_write(conn)?;
    if !queries::delete_reservation(&tx, id)? {
        return Err(BookingError::NotFound(format!("reservation {id}")));
    }
    tx.commit()?;

    tracing::warn!(reservation_id = %id, "reservation hard-deleted");
    Ok(())
}
