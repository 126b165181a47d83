use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// A candidate booking window derived from an availability rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub time: NaiveTime,
    pub is_available: bool,
}
