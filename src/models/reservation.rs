use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::errors::BookingError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub customer_id: String,
    pub service_id: String,
    pub user_id: Option<String>,
    pub reservation_date: NaiveDateTime,
    pub status: ReservationStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl ReservationStatus {
    pub const ACTIVE: [ReservationStatus; 2] =
        [ReservationStatus::Pending, ReservationStatus::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Completed => "completed",
            ReservationStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ReservationStatus::Pending),
            "confirmed" => Some(ReservationStatus::Confirmed),
            "completed" => Some(ReservationStatus::Completed),
            "cancelled" => Some(ReservationStatus::Cancelled),
            _ => None,
        }
    }

    /// Active reservations occupy their time window.
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Completed | ReservationStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: ReservationStatus) -> bool {
        use ReservationStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed) | (Pending, Cancelled) | (Confirmed, Completed) | (Confirmed, Cancelled)
        )
    }

    pub fn transition(&self, next: ReservationStatus) -> Result<ReservationStatus, BookingError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(BookingError::InvalidTransition {
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationUpdate {
    pub status: Option<ReservationStatus>,
    /// An empty string clears the notes.
    pub notes: Option<String>,
}

/// Ownership facts the lifecycle guard decides on.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReservationAccess {
    pub reservation_user_id: Option<String>,
    pub service_provider_id: String,
}

/// A reservation joined with the customer and service it points at.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationDetails {
    #[serde(flatten)]
    pub reservation: Reservation,
    pub customer_first_name: String,
    pub customer_last_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: String,
    pub service_name: String,
    pub service_duration_minutes: i64,
    pub service_price_cents: i64,
    pub provider_id: String,
}
