use thiserror::Error;

use crate::models::appointment::{Appointment, AppointmentAction, AppointmentStatus, ActorRole};

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Slot unavailable: {reason}")]
    SlotUnavailable {
        reason: String,
        conflicting_status: AppointmentStatus,
    },

    #[error("Invalid transition: {reason}")]
    InvalidTransition {
        reason: String,
        current_status: AppointmentStatus,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),
}

impl SchedulingError {
    /// Stable machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SchedulingError::Validation(_) => "validation_error",
            SchedulingError::SlotUnavailable { .. } => "slot_unavailable",
            SchedulingError::InvalidTransition { .. } => "invalid_transition",
            SchedulingError::NotFound(_) => "not_found",
            SchedulingError::Authentication(_) => "authentication_error",
            SchedulingError::Authorization(_) => "authorization_error",
            SchedulingError::Database(_) => "database_error",
        }
    }

    /// Status relevant to the failure: the conflicting appointment's status for
    /// `SlotUnavailable`, the appointment's current status for `InvalidTransition`.
    pub fn status(&self) -> Option<AppointmentStatus> {
        match self {
            SchedulingError::SlotUnavailable {
                conflicting_status, ..
            } => Some(*conflicting_status),
            SchedulingError::InvalidTransition { current_status, .. } => Some(*current_status),
            _ => None,
        }
    }

    pub fn slot_unavailable(conflicting: &Appointment) -> Self {
        SchedulingError::SlotUnavailable {
            reason: format!(
                "provider already has a {} appointment from {} to {}",
                conflicting.status,
                conflicting.start_time.format("%Y-%m-%d %H:%M"),
                conflicting.end_time().format("%H:%M"),
            ),
            conflicting_status: conflicting.status,
        }
    }

    pub fn invalid_transition(
        current_status: AppointmentStatus,
        role: ActorRole,
        action: AppointmentAction,
    ) -> Self {
        SchedulingError::InvalidTransition {
            reason: format!(
                "{} cannot {} an appointment that is {}",
                role, action, current_status
            ),
            current_status,
        }
    }
}

pub type SchedulingResult<T> = Result<T, SchedulingError>;
