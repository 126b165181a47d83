//! # CareSlot API
//!
//! HTTP host for the CareSlot scheduling service. Every route delegates to
//! [`SchedulingService`]; the calling actor comes from the identity headers
//! read by [`middleware::auth::AuthenticatedActor`].
//!
//! ## Architecture
//!
//! - **Routes**: Define API endpoints and URL structure
//! - **Handlers**: Translate requests into service calls
//! - **Middleware**: Actor resolution and error mapping
//! - **Config**: Environment-driven server configuration

/// Configuration module for API settings
pub mod config;
/// Request handlers
pub mod handlers;
/// Actor resolution and error mapping
pub mod middleware;
/// Route definitions
pub mod routes;

use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    error_handling::HandleErrorLayer,
    http::{HeaderName, HeaderValue, Method, StatusCode, header},
};
use careslot_core::{calendar::DEFAULT_WINDOW_DAYS, service::SchedulingService};
use eyre::Result;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::{BoxError, ServiceBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use middleware::auth::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};

/// Shared application state that is accessible to all request handlers
pub struct ApiState {
    pub service: SchedulingService,
    /// Window used by available-date queries that do not name one
    pub default_window_days: u32,
}

impl ApiState {
    pub fn new(service: SchedulingService) -> Self {
        Self {
            service,
            default_window_days: DEFAULT_WINDOW_DAYS,
        }
    }

    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.default_window_days = window_days;
        self
    }
}

/// Builds the router with every endpoint and request tracing.
///
/// CORS and the request timeout are added by [`start_server`].
pub fn app(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(routes::health::routes())
        .merge(routes::availability::routes())
        .merge(routes::appointments::routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(ACTOR_ID_HEADER),
            HeaderName::from_static(ACTOR_ROLE_HEADER),
        ])
        .allow_origin(allowed)
        .allow_credentials(true)
}

async fn handle_timeout_error(err: BoxError) -> (StatusCode, Json<Value>) {
    if err.is::<tower::timeout::error::Elapsed>() {
        (
            StatusCode::REQUEST_TIMEOUT,
            Json(json!({ "error": { "kind": "timeout", "message": "Request timed out" } })),
        )
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "kind": "internal_error", "message": err.to_string() } })),
        )
    }
}

/// Starts the API server with the provided configuration and service
///
/// # Example
///
/// ```ignore
/// let config = ApiConfig::from_env()?;
/// let service = SchedulingService::with_store(store, profiles, notifier, clock);
/// start_server(config, service).await?;
/// ```
pub async fn start_server(config: config::ApiConfig, service: SchedulingService) -> Result<()> {
    // Initialize tracing for logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let state = Arc::new(ApiState::new(service).with_window_days(config.calendar_window_days));
    let app = app(state);

    // Apply CORS configuration if origins are specified
    let app = match &config.cors_origins {
        Some(origins) => app.layer(cors_layer(origins)),
        None => app,
    };

    let app = app.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(handle_timeout_error))
            .timeout(Duration::from_secs(config.request_timeout)),
    );

    // Start the HTTP server
    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
