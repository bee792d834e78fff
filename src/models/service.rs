use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Longest appointment a service may offer: one day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Service {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price_cents: i64,
    pub is_active: bool,
    pub allow_custom_time: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Service {
    pub fn is_bookable(&self) -> bool {
        self.is_active
    }

    /// `None` when the stored minutes do not fit a `Duration`.
    pub fn duration(&self) -> Option<chrono::Duration> {
        chrono::Duration::try_minutes(self.duration_minutes)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default)]
    pub allow_custom_time: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceUpdate {
    pub is_active: Option<bool>,
    pub allow_custom_time: Option<bool>,
}
