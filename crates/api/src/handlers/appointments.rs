use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use careslot_core::models::appointment::{
    Appointment, AppointmentRequest, AppointmentView, StatusChangeRequest,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    ApiState,
    middleware::{auth::AuthenticatedActor, error_handling::AppError},
};

/// Appointments of the calling actor, with counterparty names.
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
) -> Result<Json<Vec<AppointmentView>>, AppError> {
    let appointments = state.service.list_appointments(&actor).await?;
    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Json(payload): Json<AppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.service.request_appointment(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.service.get_appointment(&actor, id).await?;
    Ok(Json(appointment))
}

/// Applies a status change on behalf of the calling actor.
#[axum::debug_handler]
pub async fn change_status(
    State(state): State<Arc<ApiState>>,
    AuthenticatedActor(actor): AuthenticatedActor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChangeRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .service
        .change_status(id, &actor, payload.action, payload.reason)
        .await?;

    Ok(Json(appointment))
}
