//! Slot generation from weekly availability rules.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use tracing::debug;
use uuid::Uuid;

use crate::conflict::{ConflictChecker, first_conflict, interval_end};
use crate::errors::SchedulingResult;
use crate::models::appointment::Appointment;
use crate::models::availability::weekday_of;
use crate::models::time_slot::TimeSlot;
use crate::ports::AvailabilityStore;

/// Slot length and step. Not configurable per provider.
pub const SLOT_MINUTES: i32 = 30;

/// Slot start times from `start`, stepping by [`SLOT_MINUTES`], while strictly
/// before `end`. The step that would reach or pass `end` is dropped and the
/// walk never wraps past midnight.
pub fn slot_starts(start: NaiveTime, end: NaiveTime) -> impl Iterator<Item = NaiveTime> {
    let step = Duration::minutes(i64::from(SLOT_MINUTES));
    std::iter::successors(Some(start), move |current| {
        let (next, wrapped) = current.overflowing_add_signed(step);
        (wrapped == 0).then_some(next)
    })
    .take_while(move |time| *time < end)
}

/// Slots of one provider on one date.
///
/// Holds the day's rule window and the occupying appointments loaded when it
/// was built; iterating computes each slot lazily and can be repeated.
#[derive(Debug, Clone)]
pub struct SlotSequence {
    date: NaiveDate,
    window: Option<(NaiveTime, NaiveTime)>,
    occupied: Vec<Appointment>,
}

impl SlotSequence {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            window: None,
            occupied: Vec::new(),
        }
    }

    pub fn new(date: NaiveDate, start: NaiveTime, end: NaiveTime, occupied: Vec<Appointment>) -> Self {
        Self {
            date,
            window: Some((start, end)),
            occupied,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn iter(&self) -> SlotIter<'_> {
        let times: Box<dyn Iterator<Item = NaiveTime>> = match self.window {
            Some((start, end)) => Box::new(slot_starts(start, end)),
            None => Box::new(std::iter::empty()),
        };
        SlotIter {
            sequence: self,
            times,
        }
    }

    pub fn to_vec(&self) -> Vec<TimeSlot> {
        self.iter().collect()
    }
}

impl<'a> IntoIterator for &'a SlotSequence {
    type Item = TimeSlot;
    type IntoIter = SlotIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct SlotIter<'a> {
    sequence: &'a SlotSequence,
    times: Box<dyn Iterator<Item = NaiveTime>>,
}

impl Iterator for SlotIter<'_> {
    type Item = TimeSlot;

    fn next(&mut self) -> Option<Self::Item> {
        let time = self.times.next()?;
        let start = self.sequence.date.and_time(time);
        let end = interval_end(start, SLOT_MINUTES);
        let is_available = first_conflict(&self.sequence.occupied, start, end).is_none();
        Some(TimeSlot { time, is_available })
    }
}

#[derive(Clone)]
pub struct SlotGenerator {
    availability: Arc<dyn AvailabilityStore>,
    conflicts: ConflictChecker,
}

impl SlotGenerator {
    pub fn new(availability: Arc<dyn AvailabilityStore>, conflicts: ConflictChecker) -> Self {
        Self {
            availability,
            conflicts,
        }
    }

    /// Slots for `provider_id` on `date`; empty when the weekday has no rule
    /// or the rule is switched off.
    pub async fn slots_for(&self, provider_id: Uuid, date: NaiveDate) -> SchedulingResult<SlotSequence> {
        let weekday = weekday_of(date);
        let rule = match self.availability.get_rule(provider_id, weekday).await? {
            Some(rule) if rule.is_available => rule,
            _ => {
                debug!(%provider_id, %date, weekday, "No availability on this weekday");
                return Ok(SlotSequence::empty(date));
            }
        };

        // The last slot may run past the rule's end by up to one slot length.
        let occupied = self
            .conflicts
            .occupying_between(
                provider_id,
                date.and_time(rule.start_time),
                interval_end(date.and_time(rule.end_time), SLOT_MINUTES),
            )
            .await?;

        debug!(
            %provider_id,
            %date,
            occupied = occupied.len(),
            "Generating slots from {} to {}",
            rule.start_time,
            rule.end_time
        );

        Ok(SlotSequence::new(date, rule.start_time, rule.end_time, occupied))
    }
}
