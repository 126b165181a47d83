//! # Availability Handlers
//!
//! Weekly availability rules, bookable slots for a single date and the dates
//! within a window on which a provider works.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};
use careslot_core::{
    errors::SchedulingError,
    models::{
        availability::{AvailabilityRule, SetAvailabilityRequest, Weekday},
        time_slot::TimeSlot,
    },
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::AuthenticatedActor, error_handling::AppError},
};

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SlotsResponse {
    pub provider_id: Uuid,
    pub date: NaiveDate,
    pub slots: Vec<TimeSlot>,
}

#[derive(Debug, Deserialize)]
pub struct AvailableDatesQuery {
    pub window_days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AvailableDatesResponse {
    pub provider_id: Uuid,
    pub dates: Vec<NaiveDate>,
}

fn query_error(rejection: QueryRejection) -> AppError {
    AppError(SchedulingError::Validation(rejection.body_text()))
}

fn path_error(rejection: PathRejection) -> AppError {
    AppError(SchedulingError::Validation(rejection.body_text()))
}

#[axum::debug_handler]
pub async fn get_availability(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    let rules = state.service.get_availability(provider_id).await?;
    Ok(Json(rules))
}

/// Creates or replaces the rule for one weekday (0 = Sunday).
///
/// # Endpoint
///
/// ```text
/// PUT /api/providers/:id/availability/:weekday
/// { "start_time": "09:00:00", "end_time": "17:00:00", "is_available": true }
/// ```
#[axum::debug_handler]
pub async fn set_availability(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    path: Result<Path<(Uuid, Weekday)>, PathRejection>,
    Json(payload): Json<SetAvailabilityRequest>,
) -> Result<Json<AvailabilityRule>, AppError> {
    let Path((provider_id, weekday)) = path.map_err(path_error)?;

    let rule = state
        .service
        .set_availability(
            &actor,
            provider_id,
            weekday,
            payload.start_time,
            payload.end_time,
            payload.is_available,
        )
        .await?;

    Ok(Json(rule))
}

/// Slots of the provider's working window on `date`, each flagged as free or
/// taken. Empty when the provider does not work that weekday.
#[axum::debug_handler]
pub async fn get_slots(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
    query: Result<Query<SlotsQuery>, QueryRejection>,
) -> Result<Json<SlotsResponse>, AppError> {
    let Query(query) = query.map_err(query_error)?;

    let slots = state.service.available_slots(provider_id, query.date).await?;

    Ok(Json(SlotsResponse {
        provider_id,
        date: slots.date(),
        slots: slots.to_vec(),
    }))
}

#[axum::debug_handler]
pub async fn get_available_dates(
    State(state): State<Arc<ApiState>>,
    Path(provider_id): Path<Uuid>,
    query: Result<Query<AvailableDatesQuery>, QueryRejection>,
) -> Result<Json<AvailableDatesResponse>, AppError> {
    let Query(query) = query.map_err(query_error)?;
    let window_days = query.window_days.unwrap_or(state.default_window_days);

    let dates = state
        .service
        .available_dates(provider_id, Some(window_days))
        .await?;

    Ok(Json(AvailableDatesResponse { provider_id, dates }))
}
