use careslot_core::models::{
    appointment::{ActorRole, Appointment, AppointmentStatus},
    availability::AvailabilityRule,
};
use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAvailabilityRule {
    pub provider_id: Uuid,
    pub weekday: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbAvailabilityRule> for AvailabilityRule {
    type Error = eyre::Report;

    fn try_from(row: DbAvailabilityRule) -> Result<Self> {
        let weekday = u8::try_from(row.weekday)
            .map_err(|_| eyre!("Stored weekday {} is out of range", row.weekday))?;

        Ok(AvailabilityRule {
            provider_id: row.provider_id,
            weekday,
            start_time: row.start_time,
            end_time: row.end_time,
            is_available: row.is_available,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbAppointment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub requester_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub status: String,
    pub location: Option<String>,
    pub cancellation_reason: Option<String>,
    pub requester_role: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbAppointment> for Appointment {
    type Error = eyre::Report;

    fn try_from(row: DbAppointment) -> Result<Self> {
        let status = row.status.parse::<AppointmentStatus>().map_err(|e| eyre!(e))?;
        let requester_role = row.requester_role.parse::<ActorRole>().map_err(|e| eyre!(e))?;

        Ok(Appointment {
            id: row.id,
            provider_id: row.provider_id,
            requester_id: row.requester_id,
            title: row.title,
            description: row.description,
            start_time: row.start_time,
            duration_minutes: row.duration_minutes,
            location: row.location,
            status,
            cancellation_reason: row.cancellation_reason,
            requester_role,
            created_at: row.created_at,
        })
    }
}
