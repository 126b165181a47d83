use async_trait::async_trait;
use careslot_core::errors::{SchedulingError, SchedulingResult};
use careslot_core::models::appointment::{ActorRole, Appointment, AppointmentStatus};
use careslot_core::models::availability::{AvailabilityRule, Weekday};
use careslot_core::ports::{AppointmentStore, AvailabilityStore};
use chrono::NaiveDateTime;
use uuid::Uuid;

use crate::DbPool;
use crate::models::DbAppointment;
use crate::repositories::appointment::{self, Reservation};
use crate::repositories::availability;

/// Postgres implementation of the core store traits.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_appointments(rows: Vec<DbAppointment>) -> SchedulingResult<Vec<Appointment>> {
    rows.into_iter()
        .map(|row| Appointment::try_from(row).map_err(SchedulingError::from))
        .collect()
}

#[async_trait]
impl AvailabilityStore for PgStore {
    async fn upsert_rule(&self, rule: AvailabilityRule) -> SchedulingResult<AvailabilityRule> {
        let row = availability::upsert_rule(
            &self.pool,
            rule.provider_id,
            i16::from(rule.weekday),
            rule.start_time,
            rule.end_time,
            rule.is_available,
        )
        .await?;

        Ok(AvailabilityRule::try_from(row)?)
    }

    async fn get_rules(&self, provider_id: Uuid) -> SchedulingResult<Vec<AvailabilityRule>> {
        let rows = availability::get_rules_by_provider_id(&self.pool, provider_id).await?;

        rows.into_iter()
            .map(|row| AvailabilityRule::try_from(row).map_err(SchedulingError::from))
            .collect()
    }

    async fn get_rule(
        &self,
        provider_id: Uuid,
        weekday: Weekday,
    ) -> SchedulingResult<Option<AvailabilityRule>> {
        let row = availability::get_rule(&self.pool, provider_id, i16::from(weekday)).await?;

        Ok(row.map(AvailabilityRule::try_from).transpose()?)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find_occupying(
        &self,
        provider_id: Uuid,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> SchedulingResult<Vec<Appointment>> {
        let rows = appointment::find_occupying(&self.pool, provider_id, from, to).await?;
        into_appointments(rows)
    }

    async fn reserve(&self, candidate: Appointment) -> SchedulingResult<Appointment> {
        match appointment::reserve(&self.pool, &candidate).await? {
            Reservation::Reserved(row) => Ok(Appointment::try_from(row)?),
            Reservation::Conflict(row) => {
                let existing = Appointment::try_from(row)?;
                Err(SchedulingError::slot_unavailable(&existing))
            }
        }
    }

    async fn get_appointment(&self, id: Uuid) -> SchedulingResult<Option<Appointment>> {
        let row = appointment::get_appointment_by_id(&self.pool, id).await?;
        Ok(row.map(Appointment::try_from).transpose()?)
    }

    async fn list_for_party(
        &self,
        party_id: Uuid,
        role: ActorRole,
    ) -> SchedulingResult<Vec<Appointment>> {
        let rows = match role {
            ActorRole::Provider => {
                appointment::get_appointments_by_provider_id(&self.pool, party_id).await?
            }
            ActorRole::Requester => {
                appointment::get_appointments_by_requester_id(&self.pool, party_id).await?
            }
        };
        into_appointments(rows)
    }

    async fn transition(
        &self,
        id: Uuid,
        from: AppointmentStatus,
        to: AppointmentStatus,
        cancellation_reason: Option<String>,
    ) -> SchedulingResult<Option<Appointment>> {
        let updated =
            appointment::update_status(&self.pool, id, from, to, cancellation_reason.as_deref())
                .await?;

        match updated {
            Some(row) => Ok(Some(Appointment::try_from(row)?)),
            None if self.get_appointment(id).await?.is_none() => Err(SchedulingError::NotFound(
                format!("Appointment with ID {} not found", id),
            )),
            None => Ok(None),
        }
    }
}
