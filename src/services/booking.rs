//! Booking engine: validates a booking request, checks for conflicting
//! reservations, resolves the customer and records the reservation.
//!
//! The conflict check, customer resolution and insert share one
//! `BEGIN IMMEDIATE` transaction. SQLite grants that lock to a single writer
//! per database file, so two requests for the same window are serialized:
//! the second one runs its conflict query only after the first has committed
//! (or rolled back), and any failure leaves no customer or reservation row.

use chrono::{Duration, NaiveDateTime};
use rusqlite::Connection;

use crate::db::{self, queries};
use crate::errors::BookingError;
use crate::models::{
    ensure_storable, new_id, now_utc, truncate_to_seconds, CustomerContact, Reservation,
    ReservationStatus, Service,
};
use crate::services::customers;

#[derive(Debug, Clone, PartialEq)]
pub enum BookingTarget {
    /// A published slot. `at` defaults to the slot start and must lie inside
    /// the slot when given.
    Slot {
        slot_id: String,
        at: Option<NaiveDateTime>,
    },
    /// A free-form time, only for services that allow custom times.
    CustomTime(NaiveDateTime),
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: Option<String>,
    pub contact: CustomerContact,
    pub service_id: String,
    pub target: BookingTarget,
    pub notes: Option<String>,
}

/// Half-open `[start, end)` range of reservation timestamps that would
/// collide with the requested booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl ConflictWindow {
    /// Every start time whose appointment overlaps one of the same length at
    /// `at`. A booking ending exactly at `at` does not overlap, and stored
    /// timestamps have whole seconds, hence the one-second lower edge.
    /// `None` when either edge falls outside the representable range.
    pub fn around(at: NaiveDateTime, duration: Duration) -> Option<Self> {
        Some(Self {
            start: at
                .checked_sub_signed(duration)?
                .checked_add_signed(Duration::seconds(1))?,
            end: at.checked_add_signed(duration)?,
        })
    }
}

pub fn create_reservation(conn: &mut Connection, request: &BookingRequest) -> Result<String, BookingError> {
    create_reservation_at(conn, request, now_utc())
}

pub fn create_reservation_at(
    conn: &mut Connection,
    request: &BookingRequest,
    now: NaiveDateTime,
) -> Result<String, BookingError> {
    let tx = db::begin_write(conn)?;

    let service = queries::get_service(&tx, &request.service_id)?
        .ok_or_else(|| BookingError::NotFound(format!("service {}", request.service_id)))?;
    if !service.is_bookable() {
        return Err(BookingError::Unprocessable("service is not available".to_string()));
    }

    let (reservation_date, window) = resolve_target(&tx, &service, &request.target, now)?;

    if let Some(existing) =
        queries::find_active_reservation_in_window(&tx, &service.id, &window.start, &window.end)?
    {
        tracing::warn!(
            service_id = %service.id,
            existing_reservation = %existing,
            requested = %reservation_date,
            "booking rejected: slot already booked"
        );
        return Err(BookingError::Conflict("time slot is already booked".to_string()));
    }

    let customer = customers::resolve(&tx, &request.contact, request.user_id.as_deref(), now)?;

    let reservation = Reservation {
        id: new_id(),
        customer_id: customer.id,
        service_id: service.id,
        user_id: request.user_id.clone(),
        reservation_date,
        status: ReservationStatus::Pending,
        notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };
    queries::create_reservation(&tx, &reservation)?;
    tx.commit()?;

    tracing::info!(
        reservation_id = %reservation.id,
        service_id = %reservation.service_id,
        customer_id = %reservation.customer_id,
        reservation_date = %reservation.reservation_date,
        guest = reservation.user_id.is_none(),
        "reservation created"
    );

    Ok(reservation.id)
}

fn resolve_target(
    conn: &Connection,
    service: &Service,
    target: &BookingTarget,
    now: NaiveDateTime,
) -> Result<(NaiveDateTime, ConflictWindow), BookingError> {
    match target {
        BookingTarget::Slot { slot_id, at } => {
            let slot = queries::get_time_slot(conn, slot_id)?
                .ok_or_else(|| BookingError::NotFound(format!("time slot {slot_id}")))?;

            if slot.service_id != service.id {
                return Err(BookingError::Conflict(
                    "time slot does not belong to the selected service".to_string(),
                ));
            }
            if !slot.is_available_for_booking(&now) {
                return Err(BookingError::Unprocessable(
                    "time slot is not available for booking".to_string(),
                ));
            }

            let reservation_date = at.map(truncate_to_seconds).unwrap_or(slot.start_time);
            if !slot.contains(&reservation_date) {
                return Err(BookingError::Validation(
                    "reservation date must fall within the selected time slot".to_string(),
                ));
            }

            Ok((
                reservation_date,
                ConflictWindow {
                    start: slot.start_time,
                    end: slot.end_time,
                },
            ))
        }
        BookingTarget::CustomTime(at) => {
            if !service.allow_custom_time {
                return Err(BookingError::Unprocessable(
                    "service only accepts bookings for published time slots".to_string(),
                ));
            }
            let at = truncate_to_seconds(*at);
            ensure_storable(&at, "reservation date")?;
            let window = service
                .duration()
                .and_then(|duration| ConflictWindow::around(at, duration))
                .ok_or_else(|| {
                    BookingError::Validation(
                        "reservation date is out of range for this service".to_string(),
                    )
                })?;
            Ok((at, window))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Actor, NewService, Role, ServiceUpdate};
    use crate::services::{catalog, ledger, slots};

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn now() -> NaiveDateTime {
        dt("2025-06-10 09:00")
    }

    struct Fixture {
        conn: Connection,
        provider: Actor,
        service: Service,
        slot_id: String,
    }

    fn setup(allow_custom_time: bool) -> Fixture {
        let conn = db::init_db(":memory:").unwrap();
        let provider = Actor::new("provider-1", Role::Provider);
        let service = catalog::create_service(
            &conn,
            &provider,
            NewService {
                name: "Haircut".to_string(),
                description: None,
                duration_minutes: 30,
                price_cents: 2500,
                allow_custom_time,
            },
            dt("2025-06-01 08:00"),
        )
        .unwrap();
        let slot = slots::create_slot(
            &conn,
            &provider,
            &service.id,
            dt("2025-06-16 10:00"),
            dt("2025-06-16 10:30"),
            true,
            dt("2025-06-01 08:00"),
        )
        .unwrap();
        Fixture {
            conn,
            provider,
            service,
            slot_id: slot.id,
        }
    }

    fn request(service_id: &str, phone: &str, target: BookingTarget) -> BookingRequest {
        BookingRequest {
            user_id: None,
            contact: CustomerContact {
                first_name: "Jane".to_string(),
                last_name: "Doe".to_string(),
                phone: phone.to_string(),
                email: None,
            },
            service_id: service_id.to_string(),
            target,
            notes: None,
        }
    }

    fn slot_target(slot_id: &str) -> BookingTarget {
        BookingTarget::Slot {
            slot_id: slot_id.to_string(),
            at: None,
        }
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_books_slot_as_pending_at_slot_start() {
        let mut f = setup(false);
        let id = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), now()).unwrap();

        let reservation = ledger::find_by_id(&f.conn, &id).unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        assert_eq!(reservation.reservation_date, dt("2025-06-16 10:00"));
        assert_eq!(reservation.user_id, None);
    }

    #[test]
    fn test_second_booking_of_slot_conflicts() {
        let mut f = setup(false);
        create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), now()).unwrap();
        let second = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0200", slot_target(&f.slot_id)), now());

        assert!(matches!(second, Err(BookingError::Conflict(_))));
        assert_eq!(count(&f.conn, "reservations"), 1);
        // The losing request must not leave its customer behind.
        assert_eq!(queries::count_customers_with_phone(&f.conn, "555-0200").unwrap(), 0);
    }

    #[test]
    fn test_cancelled_reservation_frees_slot() {
        let mut f = setup(false);
        let id = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), now()).unwrap();
        crate::services::lifecycle::cancel(&mut f.conn, &id, &f.provider).unwrap();

        let again = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0200", slot_target(&f.slot_id)), now());
        assert!(again.is_ok());
    }

    #[test]
    fn test_missing_service() {
        let mut f = setup(false);
        let result = create_reservation_at(&mut f.conn, &request("nope", "555-0100", slot_target(&f.slot_id)), now());
        assert!(matches!(result, Err(BookingError::NotFound(_))));
    }

    #[test]
    fn test_inactive_service_is_unprocessable() {
        let mut f = setup(false);
        catalog::update_service(
            &f.conn,
            &f.provider,
            &f.service.id,
            ServiceUpdate {
                is_active: Some(false),
                allow_custom_time: None,
            },
            now(),
        )
        .unwrap();

        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), now());
        assert!(matches!(result, Err(BookingError::Unprocessable(_))));
    }

    #[test]
    fn test_missing_slot() {
        let mut f = setup(false);
        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target("nope")), now());
        assert!(matches!(result, Err(BookingError::NotFound(_))));
    }

    #[test]
    fn test_slot_of_other_service_conflicts() {
        let mut f = setup(false);
        let other = catalog::create_service(
            &f.conn,
            &f.provider,
            NewService {
                name: "Shave".to_string(),
                description: None,
                duration_minutes: 15,
                price_cents: 1000,
                allow_custom_time: false,
            },
            now(),
        )
        .unwrap();

        let result = create_reservation_at(&mut f.conn, &request(&other.id, "555-0100", slot_target(&f.slot_id)), now());
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    #[test]
    fn test_past_or_disabled_slot_is_unprocessable() {
        let mut f = setup(false);
        let after_slot = dt("2025-06-16 10:15");
        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), after_slot);
        assert!(matches!(result, Err(BookingError::Unprocessable(_))));

        let disabled = slots::create_slot(
            &f.conn,
            &f.provider,
            &f.service.id,
            dt("2025-06-17 10:00"),
            dt("2025-06-17 10:30"),
            false,
            now(),
        )
        .unwrap();
        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&disabled.id)), now());
        assert!(matches!(result, Err(BookingError::Unprocessable(_))));
    }

    #[test]
    fn test_reservation_date_must_fall_inside_slot() {
        let mut f = setup(false);
        let outside = BookingTarget::Slot {
            slot_id: f.slot_id.clone(),
            at: Some(dt("2025-06-16 10:30")),
        };
        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", outside), now());
        assert!(matches!(result, Err(BookingError::Validation(_))));

        let inside = BookingTarget::Slot {
            slot_id: f.slot_id.clone(),
            at: Some(dt("2025-06-16 10:10")),
        };
        let id = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", inside), now()).unwrap();
        assert_eq!(ledger::find_by_id(&f.conn, &id).unwrap().reservation_date, dt("2025-06-16 10:10"));
    }

    #[test]
    fn test_custom_time_requires_service_opt_in() {
        let mut f = setup(false);
        let result = create_reservation_at(
            &mut f.conn,
            &request(&f.service.id, "555-0100", BookingTarget::CustomTime(dt("2025-06-18 15:00"))),
            now(),
        );
        assert!(matches!(result, Err(BookingError::Unprocessable(_))));
    }

    #[test]
    fn test_custom_time_overlap_conflicts_but_adjacent_is_fine() {
        let mut f = setup(true);
        let book = |conn: &mut Connection, phone: &str, at: &str| {
            create_reservation_at(conn, &request(&f.service.id, phone, BookingTarget::CustomTime(dt(at))), now())
        };

        book(&mut f.conn, "555-0100", "2025-06-18 15:00").unwrap();

        // 30 minute service: 15:15 and 14:45 overlap the 15:00 booking.
        assert!(matches!(book(&mut f.conn, "555-0200", "2025-06-18 15:15"), Err(BookingError::Conflict(_))));
        assert!(matches!(book(&mut f.conn, "555-0200", "2025-06-18 14:45"), Err(BookingError::Conflict(_))));

        // Back-to-back appointments do not.
        assert!(book(&mut f.conn, "555-0200", "2025-06-18 15:30").is_ok());
        assert!(book(&mut f.conn, "555-0300", "2025-06-18 14:30").is_ok());
    }

    #[test]
    fn test_slot_booking_sees_custom_time_booking() {
        let mut f = setup(true);
        create_reservation_at(
            &mut f.conn,
            &request(&f.service.id, "555-0100", BookingTarget::CustomTime(dt("2025-06-16 10:05"))),
            now(),
        )
        .unwrap();

        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0200", slot_target(&f.slot_id)), now());
        assert!(matches!(result, Err(BookingError::Conflict(_))));
    }

    #[test]
    fn test_custom_time_before_slot_start_leaves_slot_bookable() {
        let mut f = setup(true);
        create_reservation_at(
            &mut f.conn,
            &request(&f.service.id, "555-0100", BookingTarget::CustomTime(dt("2025-06-16 09:45"))),
            now(),
        )
        .unwrap();

        let result = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0200", slot_target(&f.slot_id)), now());
        assert!(result.is_ok());
    }

    #[test]
    fn test_booked_status_is_derived_from_ledger() {
        let mut f = setup(false);
        let views = slots::find_available(&f.conn, &f.service.id, None, None, now()).unwrap();
        assert_eq!(views.len(), 1);
        assert!(!views[0].is_booked);

        let id = create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), now()).unwrap();
        let views = slots::find_available(&f.conn, &f.service.id, None, None, now()).unwrap();
        assert!(views[0].is_booked);

        crate::services::lifecycle::cancel(&mut f.conn, &id, &f.provider).unwrap();
        let views = slots::find_available(&f.conn, &f.service.id, None, None, now()).unwrap();
        assert!(!views[0].is_booked);
    }

    #[test]
    fn test_occupied_slot_and_service_cannot_be_deleted() {
        let mut f = setup(false);
        create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", slot_target(&f.slot_id)), now()).unwrap();

        let slot_id = f.slot_id.clone();
        let provider = f.provider.clone();
        assert!(matches!(
            slots::delete_slot(&mut f.conn, &provider, &slot_id),
            Err(BookingError::Conflict(_))
        ));
        let service_id = f.service.id.clone();
        assert!(matches!(
            catalog::delete_service(&mut f.conn, &provider, &service_id),
            Err(BookingError::Conflict(_))
        ));
    }

    #[test]
    fn test_conflict_window_around() {
        let window = ConflictWindow::around(dt("2025-06-18 15:00"), Duration::minutes(30)).unwrap();
        assert_eq!(window.start, dt("2025-06-18 14:30") + Duration::seconds(1));
        assert_eq!(window.end, dt("2025-06-18 15:30"));

        assert_eq!(ConflictWindow::around(NaiveDateTime::MAX, Duration::minutes(30)), None);
        assert_eq!(ConflictWindow::around(NaiveDateTime::MIN, Duration::minutes(30)), None);
    }

    #[test]
    fn test_oversized_duration_is_rejected_without_panicking() {
        let mut f = setup(true);
        let mut huge = f.service.clone();
        huge.id = new_id();
        huge.duration_minutes = 1_000_000_000_000;
        queries::create_service(&f.conn, &huge).unwrap();

        let target = BookingTarget::CustomTime(dt("2025-06-18 15:00"));
        let result = create_reservation_at(&mut f.conn, &request(&huge.id, "555-0100", target), now());
        assert!(matches!(result, Err(BookingError::Validation(_))));
        assert_eq!(count(&f.conn, "reservations"), 0);

        // The write transaction was rolled back, so the connection stays usable.
        let target = BookingTarget::CustomTime(dt("2025-06-18 15:00"));
        assert!(create_reservation_at(&mut f.conn, &request(&f.service.id, "555-0100", target), now()).is_ok());
    }

    #[test]
    fn test_custom_time_beyond_year_9999_is_rejected() {
        let mut f = setup(true);
        let far = chrono::NaiveDate::from_ymd_opt(262_142, 12, 31)
            .unwrap()
            .and_hms_opt(23, 59, 0)
            .unwrap();
        let result = create_reservation_at(
            &mut f.conn,
            &request(&f.service.id, "555-0100", BookingTarget::CustomTime(far)),
            now(),
        );
        assert!(matches!(result, Err(BookingError::Validation(_))));
    }
}
