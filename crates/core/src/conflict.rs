//! Double-booking detection.
//!
//! An existing appointment conflicts with a candidate interval when its status
//! is in [`AppointmentStatus::OCCUPYING`] and the two half-open intervals
//! `[start, start + duration)` intersect. Completed and cancelled
//! appointments never occupy time.

use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::errors::SchedulingResult;
use crate::models::appointment::{Appointment, AppointmentStatus};
use crate::ports::AppointmentStore;

pub fn interval_end(start: NaiveDateTime, duration_minutes: i32) -> NaiveDateTime {
    start + Duration::minutes(i64::from(duration_minutes))
}

/// Half-open interval intersection; touching endpoints do not overlap.
pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// First appointment in `existing` that occupies any part of `[start, end)`.
pub fn first_conflict(
    existing: &[Appointment],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Option<&Appointment> {
    existing.iter().find(|appointment| {
        appointment.status.is_occupying()
            && intervals_overlap(appointment.start_time, appointment.end_time(), start, end)
    })
}

#[derive(Clone)]
pub struct ConflictChecker {
    appointments: Arc<dyn AppointmentStore>,
}

impl ConflictChecker {
    pub fn new(appointments: Arc<dyn AppointmentStore>) -> Self {
        Self { appointments }
    }

    /// Whether `[start_time, start_time + duration_minutes)` is free on the
    /// provider's calendar. Unknown providers are vacuously free.
    pub async fn is_free(
        &self,
        provider_id: Uuid,
        start_time: NaiveDateTime,
        duration_minutes: i32,
    ) -> SchedulingResult<bool> {
        Ok(self
            .find_conflict(provider_id, start_time, duration_minutes)
            .await?
            .is_none())
    }

    /// The appointment blocking the interval, if any.
    pub async fn find_conflict(
        &self,
        provider_id: Uuid,
        start_time: NaiveDateTime,
        duration_minutes: i32,
    ) -> SchedulingResult<Option<Appointment>> {
        let end_time = interval_end(start_time, duration_minutes);
        let occupying = self.occupying_between(provider_id, start_time, end_time).await?;
        let conflict = first_conflict(&occupying, start_time, end_time).cloned();

        if let Some(existing) = &conflict {
            debug!(
                %provider_id,
                %start_time,
                conflicting_id = %existing.id,
                "Interval conflicts with existing appointment"
            );
        }

        Ok(conflict)
    }

    /// Occupying appointments intersecting `[from, to)`, for batch checks.
    pub async fn occupying_between(
        &self,
        provider_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SchedulingResult<Vec<Appointment>> {
        let mut appointments = self.appointments.find_occupying(provider_id, from, to).await?;
        appointments.retain(|a| AppointmentStatus::OCCUPYING.contains(&a.status));
        Ok(appointments)
    }
}
