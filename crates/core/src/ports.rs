//! Storage and collaborator interfaces the scheduling core is written against.
//!
//! Postgres-backed implementations live in `careslot-db`; [`crate::store::InMemoryStore`]
//! implements both store traits for tests and single-process deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime};
use tracing::info;
use uuid::Uuid;

use crate::errors::SchedulingResult;
use crate::models::appointment::{ActorRole, Appointment, AppointmentStatus};
use crate::models::availability::{AvailabilityRule, Weekday};

/// Weekly availability rules, at most one per provider and weekday.
#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    /// Inserts the rule or replaces the existing one for the same provider and weekday.
    async fn upsert_rule(&self, rule: AvailabilityRule) -> SchedulingResult<AvailabilityRule>;

    /// All rules of a provider ordered by weekday.
    async fn get_rules(&self, provider_id: Uuid) -> SchedulingResult<Vec<AvailabilityRule>>;

    async fn get_rule(
        &self,
        provider_id: Uuid,
        weekday: Weekday,
    ) -> SchedulingResult<Option<AvailabilityRule>>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Appointments of `provider_id` in an occupying status whose interval
    /// intersects `[from, to)`, ordered by start time.
    async fn find_occupying(
        &self,
        provider_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SchedulingResult<Vec<Appointment>>;

    /// Persists the appointment if its interval is still free.
    ///
    /// The overlap check and the insert are a single atomic step; a conflict
    /// fails with `SchedulingError::SlotUnavailable`.
    async fn reserve(&self, appointment: Appointment) -> SchedulingResult<Appointment>;

    async fn get_appointment(&self, id: Uuid) -> SchedulingResult<Option<Appointment>>;

    /// Appointments where the party identified by `party_id` plays `role`,
    /// ordered by start time.
    async fn list_for_party(
        &self,
        party_id: Uuid,
        role: ActorRole,
    ) -> SchedulingResult<Vec<Appointment>>;

    /// Moves the appointment from `from` to `to` only if it is still in `from`.
    ///
    /// Returns `None` when the appointment no longer has status `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> SchedulingResult<Option<Appointment>>;
}

/// Resolves display names of providers and requesters.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn display_name(&self, id: Uuid) -> eyre::Result<Option<String>>;
}

/// Receives appointment status changes. Delivery is best-effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        appointment_id: Uuid,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> eyre::Result<()>;
}

/// Source of the provider-local "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Notifier that only records status changes in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        appointment_id: Uuid,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> eyre::Result<()> {
        info!(
            %appointment_id,
            %old_status,
            %new_status,
            "Appointment status changed"
        );
        Ok(())
    }
}

/// Fixed table of display names.
#[derive(Debug, Clone, Default)]
pub struct StaticProfiles {
    names: HashMap<Uuid, String>,
}

impl StaticProfiles {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, S)>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(|(id, name)| (id, name.into())).collect(),
        }
    }
}

#[async_trait]
impl ProfileLookup for StaticProfiles {
    async fn display_name(&self, id: Uuid) -> eyre::Result<Option<String>> {
        Ok(self.names.get(&id).cloned())
    }
}
