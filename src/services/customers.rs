use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::{new_id, Customer, CustomerContact};

/// Maps a booking's contact details onto a single customer row keyed by
/// phone number.
///
/// Must run on the same transaction as the reservation insert. The insert
/// path is an upsert on the unique phone column, so a row created by a
/// concurrent writer is merged into rather than duplicated.
pub fn resolve(
    conn: &Connection,
    contact: &CustomerContact,
    user_id: Option<&str>,
    now: NaiveDateTime,
) -> Result<Customer, BookingError> {
    if let Some(mut existing) = queries::get_customer_by_phone(conn, &contact.phone)? {
        if existing.merge(contact, user_id) {
            existing.updated_at = now;
            queries::update_customer(conn, &existing)?;
            tracing::debug!(customer_id = %existing.id, "updated customer details");
        }
        return Ok(existing);
    }

    let customer = Customer {
        id: new_id(),
        user_id: user_id.map(str::to_string),
        first_name: contact.first_name.clone(),
        last_name: contact.last_name.clone(),
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        created_at: now,
        updated_at: now,
    };

    let stored = queries::upsert_customer(conn, &customer)?;
    tracing::debug!(customer_id = %stored.id, "created customer");
    Ok(stored)
}
