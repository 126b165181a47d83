//! Coarse per-date availability.
//!
//! A date counts as available when its weekday has an enabled rule. Existing
//! bookings are not consulted, so a fully booked day is still listed; use
//! [`crate::slots::SlotGenerator`] for per-slot capacity.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::availability::{AvailabilityRule, weekday_of};
use crate::ports::AvailabilityStore;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const MAX_WINDOW_DAYS: u32 = 366;

/// Dates in `from ..= from + window_days - 1` whose weekday has an enabled rule.
pub fn matching_dates(rules: &[AvailabilityRule], from: NaiveDate, window_days: u32) -> Vec<NaiveDate> {
    let mut open_weekdays = [false; 7];
    for rule in rules.iter().filter(|rule| rule.is_available) {
        if let Some(open) = open_weekdays.get_mut(usize::from(rule.weekday)) {
            *open = true;
        }
    }

    (0..i64::from(window_days))
        .map(|offset| from + Duration::days(offset))
        .filter(|date| open_weekdays[usize::from(weekday_of(*date))])
        .collect()
}

#[derive(Clone)]
pub struct AvailabilityCalendar {
    availability: Arc<dyn AvailabilityStore>,
}

impl AvailabilityCalendar {
    pub fn new(availability: Arc<dyn AvailabilityStore>) -> Self {
        Self { availability }
    }

    pub async fn available_dates(
        &self,
        provider_id: Uuid,
        window_days: u32,
        from: NaiveDate,
    ) -> SchedulingResult<Vec<NaiveDate>> {
        if window_days > MAX_WINDOW_DAYS {
            return Err(SchedulingError::Validation(format!(
                "window of {} days exceeds the maximum of {}",
                window_days, MAX_WINDOW_DAYS
            )));
        }

        let rules = self.availability.get_rules(provider_id).await?;
        let dates = matching_dates(&rules, from, window_days);
        debug!(%provider_id, %from, window_days, found = dates.len(), "Computed available dates");
        Ok(dates)
    }
}
