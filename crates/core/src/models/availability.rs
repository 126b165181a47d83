use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{SchedulingError, SchedulingResult};

/// Weekday index used by availability rules: 0 = Sunday .. 6 = Saturday.
pub type Weekday = u8;

pub fn weekday_of(date: NaiveDate) -> Weekday {
    date.weekday().num_days_from_sunday() as Weekday
}

/// A provider's recurring availability for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub provider_id: Uuid,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
}

impl AvailabilityRule {
    /// Builds a rule, rejecting out-of-range weekdays and empty or inverted windows.
    pub fn new(
        provider_id: Uuid,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
        is_available: bool,
    ) -> SchedulingResult<Self> {
        if weekday > 6 {
            return Err(SchedulingError::Validation(format!(
                "weekday must be between 0 (Sunday) and 6 (Saturday), got {}",
                weekday
            )));
        }
        if end_time <= start_time {
            return Err(SchedulingError::Validation(format!(
                "end time {} must be after start time {}",
                end_time.format("%H:%M"),
                start_time.format("%H:%M")
            )));
        }

        Ok(Self {
            provider_id,
            weekday,
            start_time,
            end_time,
            is_available,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAvailabilityRequest {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}
