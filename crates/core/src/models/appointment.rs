use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Appointment length used when a request does not specify one.
pub const DEFAULT_DURATION_MINUTES: i32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    PendingProviderApproval,
    PendingRequesterApproval,
    Scheduled,
    Completed,
    Cancelled,
    /// Reserved. No transition produces or consumes it.
    Rescheduled,
}

impl AppointmentStatus {
    /// Statuses that reserve time on the provider's calendar.
    pub const OCCUPYING: [AppointmentStatus; 3] = [
        AppointmentStatus::PendingProviderApproval,
        AppointmentStatus::PendingRequesterApproval,
        AppointmentStatus::Scheduled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::PendingProviderApproval => "pending_provider_approval",
            AppointmentStatus::PendingRequesterApproval => "pending_requester_approval",
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rescheduled => "rescheduled",
        }
    }

    pub fn is_occupying(&self) -> bool {
        Self::OCCUPYING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending_provider_approval" => Ok(AppointmentStatus::PendingProviderApproval),
            "pending_requester_approval" => Ok(AppointmentStatus::PendingRequesterApproval),
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            other => Err(format!("Unknown appointment status: '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Provider,
    Requester,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Provider => "provider",
            ActorRole::Requester => "requester",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "provider" => Ok(ActorRole::Provider),
            "requester" => Ok(ActorRole::Requester),
            other => Err(format!(
                "Invalid role: '{}'. Must be one of: provider, requester",
                other
            )),
        }
    }
}

/// The authenticated party making a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: Uuid, role: ActorRole) -> Self {
        Self { id, role }
    }

    pub fn provider(id: Uuid) -> Self {
        Self::new(id, ActorRole::Provider)
    }

    pub fn requester(id: Uuid) -> Self {
        Self::new(id, ActorRole::Requester)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentAction {
    Approve,
    Decline,
    Cancel,
    Complete,
}

impl AppointmentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentAction::Approve => "approve",
            AppointmentAction::Decline => "decline",
            AppointmentAction::Cancel => "cancel",
            AppointmentAction::Complete => "complete",
        }
    }
}

impl fmt::Display for AppointmentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub requester_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Provider-local start time.
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,
    pub location: Option<String>,
    pub status: AppointmentStatus,
    pub cancellation_reason: Option<String>,
    /// Which party initiated the request.
    pub requester_role: ActorRole,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end_time(&self) -> NaiveDateTime {
        self.start_time + Duration::minutes(i64::from(self.duration_minutes))
    }

    pub fn is_party(&self, actor: &Actor) -> bool {
        match actor.role {
            ActorRole::Provider => self.provider_id == actor.id,
            ActorRole::Requester => self.requester_id == actor.id,
        }
    }

    /// The other party from the point of view of `role`.
    pub fn counterparty_id(&self, role: ActorRole) -> Uuid {
        match role {
            ActorRole::Provider => self.requester_id,
            ActorRole::Requester => self.provider_id,
        }
    }
}

fn default_duration() -> i32 {
    DEFAULT_DURATION_MINUTES
}

/// Input for booking a new appointment. The initiating role comes from the
/// calling actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRequest {
    pub provider_id: Uuid,
    pub requester_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: NaiveDateTime,
    #[serde(default = "default_duration")]
    pub duration_minutes: i32,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub action: AppointmentAction,
    #[serde(default)]
    pub reason: Option<String>,
}

/// An appointment together with the counterparty's display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub counterparty_name: String,
}
