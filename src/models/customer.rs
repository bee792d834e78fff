use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: String,
    pub user_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Contact details as supplied with a booking request. The phone number is
/// the identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerContact {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Option<String>,
}

impl Customer {
    /// Folds newer contact details into this record. Absent optional fields
    /// never clear what is already stored. Returns whether anything changed.
    pub fn merge(&mut self, contact: &CustomerContact, user_id: Option<&str>) -> bool {
        let mut changed = false;

        if self.first_name != contact.first_name {
            self.first_name = contact.first_name.clone();
            changed = true;
        }
        if self.last_name != contact.last_name {
            self.last_name = contact.last_name.clone();
            changed = true;
        }
        if let Some(email) = contact.email.as_deref() {
            if self.email.as_deref() != Some(email) {
                self.email = Some(email.to_string());
                changed = true;
            }
        }
        if let Some(user_id) = user_id {
            if self.user_id.as_deref() != Some(user_id) {
                self.user_id = Some(user_id.to_string());
                changed = true;
            }
        }

        changed
    }
}
