use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    // One rule per provider and weekday; writes go through upserts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS availability_rules (
            provider_id UUID NOT NULL,
            weekday SMALLINT NOT NULL,
            start_time TIME NOT NULL,
            end_time TIME NOT NULL,
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            PRIMARY KEY (provider_id, weekday),
            CONSTRAINT valid_weekday CHECK (weekday BETWEEN 0 AND 6),
            CONSTRAINT valid_time_range CHECK (end_time > start_time)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Start times are provider-local and stored without a zone
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS appointments (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            provider_id UUID NOT NULL,
            requester_id UUID NOT NULL,
            title VARCHAR(255) NOT NULL,
            description TEXT NULL,
            start_time TIMESTAMP NOT NULL,
            duration_minutes INTEGER NOT NULL DEFAULT 30,
            status VARCHAR(32) NOT NULL,
            location VARCHAR(255) NULL,
            cancellation_reason TEXT NULL,
            requester_role VARCHAR(16) NOT NULL,
            created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
            CONSTRAINT valid_duration CHECK (duration_minutes > 0),
            CONSTRAINT valid_status CHECK (status IN (
                'pending_provider_approval',
                'pending_requester_approval',
                'scheduled',
                'completed',
                'cancelled',
                'rescheduled'
            )),
            CONSTRAINT valid_requester_role CHECK (requester_role IN ('provider', 'requester'))
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_appointments_provider_start ON appointments(provider_id, start_time)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_requester_id ON appointments(requester_id)",
        "CREATE INDEX IF NOT EXISTS idx_appointments_status ON appointments(status)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
