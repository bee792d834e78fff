use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    pub id: String,
    pub service_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl TimeSlot {
    pub fn is_in_past(&self, now: &NaiveDateTime) -> bool {
        self.start_time < *now
    }

    /// Flag and clock only. Whether an active reservation already sits in the
    /// slot is derived from the ledger separately.
    pub fn is_available_for_booking(&self, now: &NaiveDateTime) -> bool {
        self.is_available && !self.is_in_past(now)
    }

    /// Half-open `[start, end)` membership.
    pub fn contains(&self, dt: &NaiveDateTime) -> bool {
        self.start_time <= *dt && *dt < self.end_time
    }
}

/// A slot as read by clients, with its booked status derived at read time.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SlotView {
    #[serde(flatten)]
    pub slot: TimeSlot,
    pub is_booked: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SlotUpdate {
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub is_available: Option<bool>,
}
