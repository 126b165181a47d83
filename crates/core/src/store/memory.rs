use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::conflict::{first_conflict, intervals_overlap};
use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::appointment::{ActorRole, Appointment, AppointmentStatus};
use crate::models::availability::{AvailabilityRule, Weekday};
use crate::ports::{AppointmentStore, AvailabilityStore};

/// Process-local store implementing both store traits.
///
/// Rules are keyed by `(provider_id, weekday)`, so duplicates cannot exist.
/// Reservations check and insert under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    rules: RwLock<BTreeMap<(Uuid, Weekday), AvailabilityRule>>,
    appointments: RwLock<HashMap<Uuid, Appointment>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn by_start_time(appointments: &mut [Appointment]) {
    appointments.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.created_at.cmp(&b.created_at)));
}

#[async_trait]
impl AvailabilityStore for InMemoryStore {
    async fn upsert_rule(&self, rule: AvailabilityRule) -> SchedulingResult<AvailabilityRule> {
        let mut rules = self.rules.write().await;
        rules.insert((rule.provider_id, rule.weekday), rule.clone());
        Ok(rule)
    }

    async fn get_rules(&self, provider_id: Uuid) -> SchedulingResult<Vec<AvailabilityRule>> {
        let rules = self.rules.read().await;
        Ok(rules
            .range((provider_id, 0)..=(provider_id, Weekday::MAX))
            .map(|(_, rule)| rule.clone())
            .collect())
    }

    async fn get_rule(
        &self,
        provider_id: Uuid,
        weekday: Weekday,
    ) -> SchedulingResult<Option<AvailabilityRule>> {
        Ok(self.rules.read().await.get(&(provider_id, weekday)).cloned())
    }
}

#[async_trait]
impl AppointmentStore for InMemoryStore {
    async fn find_occupying(
        &self,
        provider_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SchedulingResult<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| {
                a.provider_id == provider_id
                    && a.status.is_occupying()
                    && intervals_overlap(a.start_time, a.end_time(), from, to)
            })
            .cloned()
            .collect();
        by_start_time(&mut found);
        Ok(found)
    }

    async fn reserve(&self, appointment: Appointment) -> SchedulingResult<Appointment> {
        let mut appointments = self.appointments.write().await;

        let existing: Vec<Appointment> = appointments
            .values()
            .filter(|a| a.provider_id == appointment.provider_id)
            .cloned()
            .collect();
        if let Some(conflict) =
            first_conflict(&existing, appointment.start_time, appointment.end_time())
        {
            debug!(
                provider_id = %appointment.provider_id,
                conflicting_id = %conflict.id,
                "Reservation lost to an existing appointment"
            );
            return Err(SchedulingError::slot_unavailable(conflict));
        }

        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn get_appointment(&self, id: Uuid) -> SchedulingResult<Option<Appointment>> {
        Ok(self.appointments.read().await.get(&id).cloned())
    }

    async fn list_for_party(
        &self,
        party_id: Uuid,
        role: ActorRole,
    ) -> SchedulingResult<Vec<Appointment>> {
        let appointments = self.appointments.read().await;
        let mut found: Vec<Appointment> = appointments
            .values()
            .filter(|a| match role {
                ActorRole::Provider => a.provider_id == party_id,
                ActorRole::Requester => a.requester_id == party_id,
            })
            .cloned()
            .collect();
        by_start_time(&mut found);
        Ok(found)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> SchedulingResult<Option<Appointment>> {
        let mut appointments = self.appointments.write().await;
        let appointment = appointments
            .get_mut(&id)
            .ok_or_else(|| SchedulingError::NotFound(format!("Appointment with ID {} not found", id)))?;

        if appointment.status != from {
            return Ok(None);
        }

        appointment.status = to;
        if cancellation_reason.is_some() {
            appointment.cancellation_reason = cancellation_reason;
        }
        Ok(Some(appointment.clone()))
    }
}
