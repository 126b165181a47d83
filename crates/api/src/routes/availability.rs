use axum::{
    Router,
    routing::{get, put},
};
use std::sync::Arc;

use crate::{ApiState, handlers};

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route(
            "/api/providers/:id/availability",
            get(handlers::availability::get_availability),
        )
        .route(
            "/api/providers/:id/availability/:weekday",
            put(handlers::availability::set_availability),
        )
        .route(
            "/api/providers/:id/slots",
            get(handlers::availability::get_slots),
        )
        .route(
            "/api/providers/:id/available-dates",
            get(handlers::availability::get_available_dates),
        )
}
