use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A platform contact number handed to approved deals.
///
/// Assignment is a least-loaded rotation: the store claims the active
/// number with the lowest `assignment_count` and bumps the counter in the
/// same atomic step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminNumber {
    pub id: Uuid,
    pub phone_number: String,
    pub is_active: bool,
    pub assignment_count: u64,
    pub last_assigned_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AdminNumber {
    pub fn new(phone_number: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            phone_number,
            is_active: true,
            assignment_count: 0,
            last_assigned_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn record_assignment(&mut self) {
        self.assignment_count += 1;
        self.last_assigned_at = Some(Utc::now());
    }

    pub fn revert_assignment(&mut self) {
        self.assignment_count = self.assignment_count.saturating_sub(1);
    }
}
