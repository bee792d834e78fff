use chrono::NaiveDateTime;
use rusqlite::Connection;

use bookings::db;
use bookings::errors::BookingError;
use bookings::models::{Actor, CustomerContact, NewService, ReservationStatus, Role};
use bookings::services::booking::{create_reservation_at, BookingRequest, BookingTarget};
use bookings::services::{catalog, ledger, lifecycle, slots};

fn dt(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
}

struct Fixture {
    conn: Connection,
    provider: Actor,
    customer: Actor,
    service_id: String,
    slot_id: String,
}

fn now() -> NaiveDateTime {
    dt("2025-06-10 09:00")
}

fn fixture() -> Fixture {
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
            allow_custom_time: false,
        },
        now(),
    )
    .unwrap();
    let slot = slots::create_slot(
        &conn,
        &provider,
        &service.id,
        dt("2025-06-16 10:00"),
        dt("2025-06-16 10:30"),
        true,
        now(),
    )
    .unwrap();

    Fixture {
        conn,
        provider,
        customer: Actor::new("user-1", Role::Customer),
        service_id: service.id,
        slot_id: slot.id,
    }
}

fn book(f: &mut Fixture, first_name: &str, phone: &str, target: BookingTarget) -> Result<String, BookingError> {
    let request = BookingRequest {
        user_id: Some(f.customer.user_id.clone()),
        contact: CustomerContact {
            first_name: first_name.to_string(),
            last_name: "Doe".to_string(),
            phone: phone.to_string(),
            email: None,
        },
        service_id: f.service_id.clone(),
        target,
        notes: None,
    };
    create_reservation_at(&mut f.conn, &request, now())
}

fn slot(f: &Fixture) -> BookingTarget {
    BookingTarget::Slot {
        slot_id: f.slot_id.clone(),
        at: None,
    }
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_scenarios_a_b_c() {
    let mut f = fixture();

    let target = slot(&f);
    let id = book(&mut f, "Jane", "555-0100", target).unwrap();
    let reservation = ledger::find_by_id(&f.conn, &id).unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(reservation.reservation_date, dt("2025-06-16 10:00"));

    let target = slot(&f);
    assert!(matches!(
        book(&mut f, "John", "555-0200", target),
        Err(BookingError::Conflict(_))
    ));

    let provider = f.provider.clone();
    assert_eq!(
        lifecycle::confirm(&mut f.conn, &id, &provider).unwrap().status,
        ReservationStatus::Confirmed
    );
    assert_eq!(
        lifecycle::complete(&mut f.conn, &id, &provider).unwrap().status,
        ReservationStatus::Completed
    );
    assert!(matches!(
        lifecycle::cancel(&mut f.conn, &id, &provider),
        Err(BookingError::InvalidTransition { .. })
    ));
}

#[test]
fn test_scenario_d_customer_may_only_cancel() {
    let mut f = fixture();
    let target = slot(&f);
    let id = book(&mut f, "Jane", "555-0100", target).unwrap();

    let customer = f.customer.clone();
    assert!(matches!(
        lifecycle::confirm(&mut f.conn, &id, &customer),
        Err(BookingError::Forbidden(_))
    ));
    assert_eq!(
        lifecycle::cancel(&mut f.conn, &id, &customer).unwrap().status,
        ReservationStatus::Cancelled
    );
}

#[test]
fn test_scenario_e_same_phone_reuses_customer() {
    let mut f = fixture();
    let target = slot(&f);
    let first = book(&mut f, "Jane", "555-0100", target).unwrap();

    let second_slot = slots::create_slot(
        &f.conn,
        &f.provider,
        &f.service_id,
        dt("2025-06-16 11:00"),
        dt("2025-06-16 11:30"),
        true,
        now(),
    )
    .unwrap();
    let second = book(
        &mut f,
        "Janet",
        "555-0100",
        BookingTarget::Slot {
            slot_id: second_slot.id,
            at: None,
        },
    )
    .unwrap();

    assert_eq!(count(&f.conn, "customers"), 1);
    assert_eq!(count(&f.conn, "reservations"), 2);

    let details = ledger::find_details(&f.conn, &second).unwrap();
    assert_eq!(details.customer_first_name, "Janet");
    assert_eq!(
        ledger::find_by_id(&f.conn, &first).unwrap().customer_id,
        details.reservation.customer_id
    );
}
