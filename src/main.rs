use std::sync::Arc;

use careslot_api::config::ApiConfig;
use careslot_core::{
    ports::{LoggingNotifier, StaticProfiles, SystemClock},
    service::SchedulingService,
};
use careslot_db::{PgStore, create_pool, schema::initialize_database};
use color_eyre::eyre::Result;
use dotenv::dotenv;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let config = ApiConfig::from_env()?;

    let db_pool = create_pool(&config.database_url, config.db_max_connections).await?;
    initialize_database(&db_pool).await?;

    // Profiles and notifications are served by external systems; until they
    // are wired in, names resolve to "Unknown" and status changes are logged.
    let service = SchedulingService::with_store(
        Arc::new(PgStore::new(db_pool)),
        Arc::new(StaticProfiles::default()),
        Arc::new(LoggingNotifier),
        Arc::new(SystemClock),
    );

    careslot_api::start_server(config, service).await?;

    Ok(())
}
