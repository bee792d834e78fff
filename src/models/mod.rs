pub mod customer;
pub mod identity;
pub mod reservation;
pub mod service;
pub mod time_slot;

use chrono::{Datelike, NaiveDateTime, Timelike, Utc};

use crate::errors::BookingError;

pub use customer::{Customer, CustomerContact};
pub use identity::{Actor, Role};
pub use reservation::{
    Reservation, ReservationAccess, ReservationDetails, ReservationStatus, ReservationUpdate,
};
pub use service::{NewService, Service, ServiceUpdate, MAX_DURATION_MINUTES};
pub use time_slot::{SlotUpdate, SlotView, TimeSlot};

/// Timestamps are persisted at second precision, so everything compared
/// against stored values is truncated the same way.
pub fn truncate_to_seconds(dt: NaiveDateTime) -> NaiveDateTime {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Stored timestamps compare as text, which only matches chronological order
/// for four-digit years.
pub fn ensure_storable(dt: &NaiveDateTime, field: &str) -> Result<(), BookingError> {
    if !(1..=9999).contains(&dt.year()) {
        return Err(BookingError::Validation(format!(
            "{field} must be between years 1 and 9999"
        )));
    }
    Ok(())
}

pub fn now_utc() -> NaiveDateTime {
    truncate_to_seconds(Utc::now().naive_utc())
}

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_storable_bounds_years() {
        let ok = NaiveDateTime::parse_from_str("9999-12-31 23:59:59", "%Y-%m-%d %H:%M:%S").unwrap();
        assert!(ensure_storable(&ok, "date").is_ok());

        let too_late = chrono::NaiveDate::from_ymd_opt(10000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert!(matches!(
            ensure_storable(&too_late, "date"),
            Err(BookingError::Validation(_))
        ));
    }
}
