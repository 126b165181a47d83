use crate::models::DbAppointment;
use careslot_core::models::appointment::{Appointment, AppointmentStatus};
use chrono::NaiveDateTime;
use eyre::Result;
use sqlx::{Executor, Pool, Postgres};
use uuid::Uuid;

const APPOINTMENT_COLUMNS: &str = "id, provider_id, requester_id, title, description, start_time, \
     duration_minutes, status, location, cancellation_reason, requester_role, created_at";

/// Outcome of an attempted reservation.
#[derive(Debug)]
pub enum Reservation {
    Reserved(DbAppointment),
    /// The interval is held by this existing appointment.
    Conflict(DbAppointment),
}

fn occupying_statuses() -> Vec<String> {
    AppointmentStatus::OCCUPYING
        .iter()
        .map(|status| status.as_str().to_string())
        .collect()
}

/// Occupying appointments of a provider intersecting `[from, to)`.
pub async fn find_occupying<'e, E>(
    executor: E,
    provider_id: Uuid,
    from: NaiveDateTime,
    to: NaiveDateTime,
) -> Result<Vec<DbAppointment>>
where
    E: Executor<'e, Database = Postgres>,
{
    let sql = format!(
        r#"
        SELECT {APPOINTMENT_COLUMNS}
        FROM appointments
        WHERE provider_id = $1
          AND status = ANY($2)
          AND start_time < $4
          AND start_time + make_interval(mins => duration_minutes) > $3
        ORDER BY start_time ASC
        "#
    );

    let appointments = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(provider_id)
        .bind(occupying_statuses())
        .bind(from)
        .bind(to)
        .fetch_all(executor)
        .await?;

    Ok(appointments)
}

/// Inserts the appointment unless an occupying appointment overlaps it.
///
/// Runs in one transaction holding a per-provider advisory lock, so
/// concurrent reservations for the same provider are serialised between the
/// overlap check and the insert.
pub async fn reserve(pool: &Pool<Postgres>, appointment: &Appointment) -> Result<Reservation> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 0))")
        .bind(appointment.provider_id)
        .execute(&mut *tx)
        .await?;

    let conflicts = find_occupying(
        &mut *tx,
        appointment.provider_id,
        appointment.start_time,
        appointment.end_time(),
    )
    .await?;

    if let Some(existing) = conflicts.into_iter().next() {
        tx.rollback().await?;
        tracing::debug!(
            "Reservation conflict: provider_id={}, conflicting_id={}",
            appointment.provider_id, existing.id
        );
        return Ok(Reservation::Conflict(existing));
    }

    let sql = format!(
        r#"
        INSERT INTO appointments ({APPOINTMENT_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    );

    let inserted = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(appointment.id)
        .bind(appointment.provider_id)
        .bind(appointment.requester_id)
        .bind(&appointment.title)
        .bind(&appointment.description)
        .bind(appointment.start_time)
        .bind(appointment.duration_minutes)
        .bind(appointment.status.as_str())
        .bind(&appointment.location)
        .bind(&appointment.cancellation_reason)
        .bind(appointment.requester_role.as_str())
        .bind(appointment.created_at)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;

    tracing::debug!("Appointment reserved: id={}", inserted.id);
    Ok(Reservation::Reserved(inserted))
}

pub async fn get_appointment_by_id(
    pool: &Pool<Postgres>,
    id: Uuid,
) -> Result<Option<DbAppointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");

    let appointment = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(appointment)
}

pub async fn get_appointments_by_provider_id(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
) -> Result<Vec<DbAppointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE provider_id = $1 ORDER BY start_time ASC, created_at ASC"
    );

    let appointments = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(provider_id)
        .fetch_all(pool)
        .await?;

    Ok(appointments)
}

pub async fn get_appointments_by_requester_id(
    pool: &Pool<Postgres>,
    requester_id: Uuid,
) -> Result<Vec<DbAppointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE requester_id = $1 ORDER BY start_time ASC, created_at ASC"
    );

    let appointments = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(requester_id)
        .fetch_all(pool)
        .await?;

    Ok(appointments)
}

/// Compare-and-set status update. Returns `None` when the row is no longer
/// in `from`.
pub async fn update_status(
    pool: &Pool<Postgres>,
    id: Uuid,
    from: AppointmentStatus,
    to: AppointmentStatus,
    cancellation_reason: Option<&str>,
) -> Result<Option<DbAppointment>> {
    let sql = format!(
        r#"
        UPDATE appointments
        SET status = $3, cancellation_reason = COALESCE($4, cancellation_reason)
        WHERE id = $1 AND status = $2
        RETURNING {APPOINTMENT_COLUMNS}
        "#
    );

    let appointment = sqlx::query_as::<_, DbAppointment>(&sql)
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .bind(cancellation_reason)
        .fetch_optional(pool)
        .await?;

    Ok(appointment)
}
