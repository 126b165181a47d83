use crate::models::DbAvailabilityRule;
use chrono::{NaiveTime, Utc};
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn upsert_rule(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
    weekday: i16,
    start_time: NaiveTime,
    end_time: NaiveTime,
    is_available: bool,
) -> Result<DbAvailabilityRule> {
    let now = Utc::now();

    tracing::debug!(
        "Upserting availability rule: provider_id={}, weekday={}, {}-{}, is_available={}",
        provider_id, weekday, start_time, end_time, is_available
    );

    let rule = sqlx::query_as::<_, DbAvailabilityRule>(
        r#"
        INSERT INTO availability_rules (provider_id, weekday, start_time, end_time, is_available, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (provider_id, weekday)
        DO UPDATE SET start_time = $3, end_time = $4, is_available = $5, updated_at = $6
        RETURNING provider_id, weekday, start_time, end_time, is_available, updated_at
        "#,
    )
    .bind(provider_id)
    .bind(weekday)
    .bind(start_time)
    .bind(end_time)
    .bind(is_available)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(rule)
}

pub async fn get_rules_by_provider_id(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
) -> Result<Vec<DbAvailabilityRule>> {
    let rules = sqlx::query_as::<_, DbAvailabilityRule>(
        r#"
        SELECT provider_id, weekday, start_time, end_time, is_available, updated_at
        FROM availability_rules
        WHERE provider_id = $1
        ORDER BY weekday ASC
        "#,
    )
    .bind(provider_id)
    .fetch_all(pool)
    .await?;

    Ok(rules)
}

pub async fn get_rule(
    pool: &Pool<Postgres>,
    provider_id: Uuid,
    weekday: i16,
) -> Result<Option<DbAvailabilityRule>> {
    let rule = sqlx::query_as::<_, DbAvailabilityRule>(
        r#"
        SELECT provider_id, weekday, start_time, end_time, is_available, updated_at
        FROM availability_rules
        WHERE provider_id = $1 AND weekday = $2
        "#,
    )
    .bind(provider_id)
    .bind(weekday)
    .fetch_optional(pool)
    .await?;

    Ok(rule)
}
