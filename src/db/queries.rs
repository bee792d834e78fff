use std::collections::HashSet;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::models::{
    Customer, Reservation, ReservationAccess, ReservationDetails, ReservationStatus, Service,
    TimeSlot,
};

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_status(row: &Row, idx: usize) -> rusqlite::Result<ReservationStatus> {
    let raw: String = row.get(idx)?;
    ReservationStatus::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown reservation status: {raw}").into(),
        )
    })
}

// ── Services ──

const SERVICE_COLUMNS: &str = "id, provider_id, name, description, duration_minutes, price_cents, \
     is_active, allow_custom_time, created_at, updated_at";

fn parse_service_row(row: &Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        provider_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        duration_minutes: row.get(4)?,
        price_cents: row.get(5)?,
        is_active: row.get(6)?,
        allow_custom_time: row.get(7)?,
        created_at: get_datetime(row, 8)?,
        updated_at: get_datetime(row, 9)?,
    })
}

pub fn create_service(conn: &Connection, service: &Service) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO services (id, provider_id, name, description, duration_minutes, price_cents, is_active, allow_custom_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            service.id,
            service.provider_id,
            service.name,
            service.description,
            service.duration_minutes,
            service.price_cents,
            service.is_active,
            service.allow_custom_time,
            format_datetime(&service.created_at),
            format_datetime(&service.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_service(conn: &Connection, id: &str) -> rusqlite::Result<Option<Service>> {
    conn.query_row(
        &format!("SELECT {SERVICE_COLUMNS} FROM services WHERE id = ?1"),
        params![id],
        parse_service_row,
    )
    .optional()
}

pub fn update_service_flags(conn: &Connection, service: &Service) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE services SET is_active = ?1, allow_custom_time = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            service.is_active,
            service.allow_custom_time,
            format_datetime(&service.updated_at),
            service.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn count_active_reservations_for_service(
    conn: &Connection,
    service_id: &str,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM reservations
         WHERE service_id = ?1 AND status IN ('pending', 'confirmed')",
        params![service_id],
        |row| row.get(0),
    )
}

pub fn delete_service(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Time Slots ──

const SLOT_COLUMNS: &str =
    "id, service_id, start_time, end_time, is_available, created_at, updated_at";

fn parse_slot_row(row: &Row) -> rusqlite::Result<TimeSlot> {
    Ok(TimeSlot {
        id: row.get(0)?,
        service_id: row.get(1)?,
        start_time: get_datetime(row, 2)?,
        end_time: get_datetime(row, 3)?,
        is_available: row.get(4)?,
        created_at: get_datetime(row, 5)?,
        updated_at: get_datetime(row, 6)?,
    })
}

pub fn create_time_slot(conn: &Connection, slot: &TimeSlot) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO time_slots (id, service_id, start_time, end_time, is_available, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            slot.id,
            slot.service_id,
            format_datetime(&slot.start_time),
            format_datetime(&slot.end_time),
            slot.is_available,
            format_datetime(&slot.created_at),
            format_datetime(&slot.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_time_slot(conn: &Connection, id: &str) -> rusqlite::Result<Option<TimeSlot>> {
    conn.query_row(
        &format!("SELECT {SLOT_COLUMNS} FROM time_slots WHERE id = ?1"),
        params![id],
        parse_slot_row,
    )
    .optional()
}

/// Candidate slots: flagged available, starting at or after `from`, and
/// ending no later than `to` when given.
pub fn get_available_slots(
    conn: &Connection,
    service_id: &str,
    from: &NaiveDateTime,
    to: Option<&NaiveDateTime>,
) -> rusqlite::Result<Vec<TimeSlot>> {
    let from_str = format_datetime(from);
    let to_str = to.map(format_datetime);

    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM time_slots
         WHERE service_id = ?1 AND is_available = 1 AND start_time >= ?2
           AND (?3 IS NULL OR end_time <= ?3)
         ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![service_id, from_str, to_str], parse_slot_row)?;
    rows.collect()
}

pub fn get_slots_for_service(conn: &Connection, service_id: &str) -> rusqlite::Result<Vec<TimeSlot>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SLOT_COLUMNS} FROM time_slots WHERE service_id = ?1 ORDER BY start_time ASC"
    ))?;

    let rows = stmt.query_map(params![service_id], parse_slot_row)?;
    rows.collect()
}

pub fn update_time_slot(conn: &Connection, slot: &TimeSlot) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE time_slots SET start_time = ?1, end_time = ?2, is_available = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            format_datetime(&slot.start_time),
            format_datetime(&slot.end_time),
            slot.is_available,
            format_datetime(&slot.updated_at),
            slot.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_time_slot(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM time_slots WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

/// Ids of the given slots that hold an active reservation inside their
/// `[start, end)` window on the same service.
pub fn get_booked_slot_ids(conn: &Connection, slot_ids: &[String]) -> rusqlite::Result<HashSet<String>> {
    if slot_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = (1..=slot_ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT ts.id
         FROM time_slots ts
         INNER JOIN reservations r
            ON r.service_id = ts.service_id
           AND r.reservation_date >= ts.start_time
           AND r.reservation_date < ts.end_time
         WHERE ts.id IN ({placeholders})
           AND r.status IN ('pending', 'confirmed')"
    ))?;

    let rows = stmt.query_map(params_from_iter(slot_ids.iter()), |row| row.get::<_, String>(0))?;
    rows.collect()
}

// ── Customers ──

const CUSTOMER_COLUMNS: &str =
    "id, user_id, first_name, last_name, email, phone, created_at, updated_at";

fn parse_customer_row(row: &Row) -> rusqlite::Result<Customer> {
    Ok(Customer {
        id: row.get(0)?,
        user_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        created_at: get_datetime(row, 6)?,
        updated_at: get_datetime(row, 7)?,
    })
}

pub fn get_customer(conn: &Connection, id: &str) -> rusqlite::Result<Option<Customer>> {
    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"),
        params![id],
        parse_customer_row,
    )
    .optional()
}

pub fn get_customer_by_phone(conn: &Connection, phone: &str) -> rusqlite::Result<Option<Customer>> {
    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"),
        params![phone],
        parse_customer_row,
    )
    .optional()
}

pub fn count_customers_with_phone(conn: &Connection, phone: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM customers WHERE phone = ?1",
        params![phone],
        |row| row.get(0),
    )
}

/// Inserts a customer, falling back to a merge into the existing row when
/// the phone number is already taken. Absent email or user id never clear
/// stored values.
pub fn upsert_customer(conn: &Connection, customer: &Customer) -> rusqlite::Result<Customer> {
    conn.execute(
        "INSERT INTO customers (id, user_id, first_name, last_name, email, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(phone) DO UPDATE SET
           user_id = COALESCE(excluded.user_id, customers.user_id),
           first_name = excluded.first_name,
           last_name = excluded.last_name,
           email = COALESCE(excluded.email, customers.email),
           updated_at = excluded.updated_at",
        params![
            customer.id,
            customer.user_id,
            customer.first_name,
            customer.last_name,
            customer.email,
            customer.phone,
            format_datetime(&customer.created_at),
            format_datetime(&customer.updated_at),
        ],
    )?;

    conn.query_row(
        &format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE phone = ?1"),
        params![customer.phone],
        parse_customer_row,
    )
}

pub fn update_customer(conn: &Connection, customer: &Customer) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE customers SET user_id = ?1, first_name = ?2, last_name = ?3, email = ?4, updated_at = ?5
         WHERE id = ?6",
        params![
            customer.user_id,
            customer.first_name,
            customer.last_name,
            customer.email,
            format_datetime(&customer.updated_at),
            customer.id,
        ],
    )?;
    Ok(count > 0)
}

// ── Reservations ──

const RESERVATION_COLUMNS: &str = "r.id, r.customer_id, r.service_id, r.user_id, r.reservation_date, \
     r.status, r.notes, r.created_at, r.updated_at";

fn parse_reservation_row(row: &Row) -> rusqlite::Result<Reservation> {
    Ok(Reservation {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        service_id: row.get(2)?,
        user_id: row.get(3)?,
        reservation_date: get_datetime(row, 4)?,
        status: get_status(row, 5)?,
        notes: row.get(6)?,
        created_at: get_datetime(row, 7)?,
        updated_at: get_datetime(row, 8)?,
    })
}

pub fn create_reservation(conn: &Connection, reservation: &Reservation) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO reservations (id, customer_id, service_id, user_id, reservation_date, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            reservation.id,
            reservation.customer_id,
            reservation.service_id,
            reservation.user_id,
            format_datetime(&reservation.reservation_date),
            reservation.status.as_str(),
            reservation.notes,
            format_datetime(&reservation.created_at),
            format_datetime(&reservation.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_reservation(conn: &Connection, id: &str) -> rusqlite::Result<Option<Reservation>> {
    conn.query_row(
        &format!("SELECT {RESERVATION_COLUMNS} FROM reservations r WHERE r.id = ?1"),
        params![id],
        parse_reservation_row,
    )
    .optional()
}

pub fn get_reservations_for_user(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations r
         WHERE r.user_id = ?1 ORDER BY r.reservation_date DESC"
    ))?;

    let rows = stmt.query_map(params![user_id], parse_reservation_row)?;
    rows.collect()
}

pub fn get_reservations_for_provider(
    conn: &Connection,
    provider_id: &str,
) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations r
         INNER JOIN services s ON r.service_id = s.id
         WHERE s.provider_id = ?1
         ORDER BY r.reservation_date DESC"
    ))?;

    let rows = stmt.query_map(params![provider_id], parse_reservation_row)?;
    rows.collect()
}

pub fn get_recent_reservations(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<Reservation>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RESERVATION_COLUMNS} FROM reservations r
         ORDER BY r.reservation_date DESC LIMIT ?1"
    ))?;

    let rows = stmt.query_map(params![limit], parse_reservation_row)?;
    rows.collect()
}

/// First active reservation on the service whose timestamp falls in
/// `[start, end)`, if any.
pub fn find_active_reservation_in_window(
    conn: &Connection,
    service_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> rusqlite::Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM reservations
         WHERE service_id = ?1
           AND status IN ('pending', 'confirmed')
           AND reservation_date >= ?2
           AND reservation_date < ?3
         LIMIT 1",
        params![service_id, format_datetime(start), format_datetime(end)],
        |row| row.get(0),
    )
    .optional()
}

pub fn count_active_reservations_in_window(
    conn: &Connection,
    service_id: &str,
    start: &NaiveDateTime,
    end: &NaiveDateTime,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM reservations
         WHERE service_id = ?1
           AND status IN ('pending', 'confirmed')
           AND reservation_date >= ?2
           AND reservation_date < ?3",
        params![service_id, format_datetime(start), format_datetime(end)],
        |row| row.get(0),
    )
}

pub fn update_reservation(conn: &Connection, reservation: &Reservation) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE reservations SET status = ?1, notes = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            reservation.status.as_str(),
            reservation.notes,
            format_datetime(&reservation.updated_at),
            reservation.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_reservation(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM reservations WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_reservation_access(conn: &Connection, id: &str) -> rusqlite::Result<Option<ReservationAccess>> {
    conn.query_row(
        "SELECT r.user_id, s.provider_id
         FROM reservations r
         INNER JOIN services s ON r.service_id = s.id
         WHERE r.id = ?1",
        params![id],
        |row| {
            Ok(ReservationAccess {
                reservation_user_id: row.get(0)?,
                service_provider_id: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn get_reservation_details(conn: &Connection, id: &str) -> rusqlite::Result<Option<ReservationDetails>> {
    conn.query_row(
        &format!(
            "SELECT {RESERVATION_COLUMNS},
                    c.first_name, c.last_name, c.email, c.phone,
                    s.name, s.duration_minutes, s.price_cents, s.provider_id
             FROM reservations r
             INNER JOIN customers c ON r.customer_id = c.id
             INNER JOIN services s ON r.service_id = s.id
             WHERE r.id = ?1"
        ),
        params![id],
        |row| {
            Ok(ReservationDetails {
                reservation: parse_reservation_row(row)?,
                customer_first_name: row.get(9)?,
                customer_last_name: row.get(10)?,
                customer_email: row.get(11)?,
                customer_phone: row.get(12)?,
                service_name: row.get(13)?,
                service_duration_minutes: row.get(14)?,
                service_price_cents: row.get(15)?,
                provider_id: row.get(16)?,
            })
        },
    )
    .optional()
}
