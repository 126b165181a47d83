//! Appointment status state machine.
//!
//! Every permitted move is listed in [`TRANSITIONS`]; anything not listed is
//! rejected with `SchedulingError::InvalidTransition`. `completed` and
//! `cancelled` have no outgoing entries and `rescheduled` has none at all.

use tracing::warn;

use crate::errors::{SchedulingError, SchedulingResult};
use crate::models::appointment::{ActorRole, AppointmentAction, AppointmentStatus};

/// One permitted move. `actor: None` means either party may perform it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: AppointmentStatus,
    pub actor: Option<ActorRole>,
    pub action: AppointmentAction,
    pub to: AppointmentStatus,
}

impl Transition {
    const fn new(
        from: AppointmentStatus,
        actor: Option<ActorRole>,
        action: AppointmentAction,
        to: AppointmentStatus,
    ) -> Self {
        Self {
            from,
            actor,
            action,
            to,
        }
    }

    fn permits(&self, from: AppointmentStatus, role: ActorRole, action: AppointmentAction) -> bool {
        self.from == from && self.action == action && self.actor.is_none_or(|actor| actor == role)
    }

    /// Whether this move records a cancellation reason.
    pub fn records_reason(&self) -> bool {
        self.to == AppointmentStatus::Cancelled
    }
}

use AppointmentAction::{Approve, Cancel, Complete, Decline};
use AppointmentStatus::{Cancelled, Completed, PendingProviderApproval, PendingRequesterApproval, Scheduled};

pub const TRANSITIONS: [Transition; 6] = [
    Transition::new(PendingProviderApproval, Some(ActorRole::Provider), Approve, Scheduled),
    Transition::new(PendingProviderApproval, Some(ActorRole::Provider), Decline, Cancelled),
    Transition::new(PendingRequesterApproval, Some(ActorRole::Requester), Approve, Scheduled),
    Transition::new(PendingRequesterApproval, Some(ActorRole::Requester), Decline, Cancelled),
    Transition::new(Scheduled, None, Cancel, Cancelled),
    Transition::new(Scheduled, Some(ActorRole::Provider), Complete, Completed),
];

/// Status of a freshly requested appointment: it waits on the party that did
/// not initiate it.
pub fn initial_status(initiator: ActorRole) -> AppointmentStatus {
    match initiator {
        ActorRole::Requester => PendingProviderApproval,
        ActorRole::Provider => PendingRequesterApproval,
    }
}

pub fn find_transition(
    current: AppointmentStatus,
    role: ActorRole,
    action: AppointmentAction,
) -> SchedulingResult<Transition> {
    TRANSITIONS
        .iter()
        .copied()
        .find(|transition| transition.permits(current, role, action))
        .ok_or_else(|| {
            warn!(
                %current,
                %role,
                %action,
                terminal = current.is_terminal(),
                "Rejected appointment status transition"
            );
            SchedulingError::invalid_transition(current, role, action)
        })
}

/// Actions `role` may take on an appointment in `current`.
pub fn allowed_actions(current: AppointmentStatus, role: ActorRole) -> Vec<AppointmentAction> {
    TRANSITIONS
        .iter()
        .filter(|transition| transition.from == current && transition.actor.is_none_or(|actor| actor == role))
        .map(|transition| transition.action)
        .collect()
}
