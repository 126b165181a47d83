//! # Scheduling Service
//!
//! Façade over availability rules, slot generation, conflict checks and the
//! appointment lifecycle. Every call takes the acting party explicitly.
//!
//! ## Booking
//!
//! `request_appointment` validates the input, runs a conflict pre-check for a
//! precise error, then asks the store to reserve the interval. The store's
//! reservation repeats the overlap check atomically with the insert, so two
//! concurrent requests for the same interval cannot both succeed.
//!
//! ## Status changes
//!
//! `change_status` looks up the move in [`crate::lifecycle::TRANSITIONS`] and
//! applies it as a compare-and-set on the current status. Successful moves are
//! reported to the [`Notifier`] on a detached task; its failures are logged
//! and never undo the change.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::calendar::{AvailabilityCalendar, DEFAULT_WINDOW_DAYS};
use crate::conflict::ConflictChecker;
use crate::errors::{SchedulingError, SchedulingResult};
use crate::lifecycle;
use crate::models::appointment::{
    Actor, ActorRole, Appointment, AppointmentAction, AppointmentRequest, AppointmentStatus,
    AppointmentView,
};
use crate::models::availability::{AvailabilityRule, Weekday};
use crate::ports::{AppointmentStore, AvailabilityStore, Clock, Notifier, ProfileLookup};
use crate::slots::{SlotGenerator, SlotSequence};

/// Name shown when the profile collaborator cannot resolve a party.
pub const UNKNOWN_PARTY_NAME: &str = "Unknown";

/// Longest bookable appointment.
pub const MAX_DURATION_MINUTES: i32 = 24 * 60;

#[derive(Clone)]
pub struct SchedulingService {
    availability: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    profiles: Arc<dyn ProfileLookup>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    conflicts: ConflictChecker,
    slots: SlotGenerator,
    calendar: AvailabilityCalendar,
}

impl SchedulingService {
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        appointments: Arc<dyn AppointmentStore>,
        profiles: Arc<dyn ProfileLookup>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let conflicts = ConflictChecker::new(Arc::clone(&appointments));
        let slots = SlotGenerator::new(Arc::clone(&availability), conflicts.clone());
        let calendar = AvailabilityCalendar::new(Arc::clone(&availability));

        Self {
            availability,
            appointments,
            profiles,
            notifier,
            clock,
            conflicts,
            slots,
            calendar,
        }
    }

    /// Builds the service over a single store implementing both store traits.
    pub fn with_store<S>(
        store: Arc<S>,
        profiles: Arc<dyn ProfileLookup>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self
    where
        S: AvailabilityStore + AppointmentStore + 'static,
    {
        let availability: Arc<dyn AvailabilityStore> = store.clone();
        let appointments: Arc<dyn AppointmentStore> = store;
        Self::new(availability, appointments, profiles, notifier, clock)
    }

    pub fn conflicts(&self) -> &ConflictChecker {
        &self.conflicts
    }

    /// Appointments where `actor` takes part in their role, ordered by start
    /// time, each with the counterparty's display name.
    pub async fn list_appointments(&self, actor: &Actor) -> SchedulingResult<Vec<AppointmentView>> {
        let appointments = self.appointments.list_for_party(actor.id, actor.role).await?;
        debug!(actor_id = %actor.id, role = %actor.role, count = appointments.len(), "Listing appointments");

        let mut names: HashMap<Uuid, String> = HashMap::new();
        let mut views = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            let counterparty = appointment.counterparty_id(actor.role);
            let counterparty_name = match names.get(&counterparty) {
                Some(name) => name.clone(),
                None => {
                    let name = self.resolve_name(counterparty).await;
                    names.insert(counterparty, name.clone());
                    name
                }
            };
            views.push(AppointmentView {
                appointment,
                counterparty_name,
            });
        }

        Ok(views)
    }

    async fn resolve_name(&self, id: Uuid) -> String {
        match self.profiles.display_name(id).await {
            Ok(Some(name)) => name,
            Ok(None) => UNKNOWN_PARTY_NAME.to_string(),
            Err(e) => {
                warn!(party_id = %id, error = %e, "Failed to resolve display name");
                UNKNOWN_PARTY_NAME.to_string()
            }
        }
    }

    /// A single appointment, visible only to its parties.
    pub async fn get_appointment(&self, actor: &Actor, id: Uuid) -> SchedulingResult<Appointment> {
        let appointment = self.load(id).await?;
        ensure_party(actor, &appointment)?;
        Ok(appointment)
    }

    /// Books an appointment initiated by `actor`.
    ///
    /// The actor must be the provider (role provider) or the requester (role
    /// requester) named in the request. The new appointment waits on the other
    /// party's approval.
    pub async fn request_appointment(
        &self,
        actor: &Actor,
        request: AppointmentRequest,
    ) -> SchedulingResult<Appointment> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(SchedulingError::Validation("title must not be empty".to_string()));
        }
        if request.duration_minutes <= 0 || request.duration_minutes > MAX_DURATION_MINUTES {
            return Err(SchedulingError::Validation(format!(
                "duration must be between 1 and {} minutes, got {}",
                MAX_DURATION_MINUTES, request.duration_minutes
            )));
        }
        if request.provider_id == request.requester_id {
            return Err(SchedulingError::Validation(
                "provider and requester must be different parties".to_string(),
            ));
        }
        let now = self.clock.now();
        if request.start_time < now {
            return Err(SchedulingError::Validation(format!(
                "start time {} is in the past",
                request.start_time.format("%Y-%m-%d %H:%M")
            )));
        }

        let initiator_matches = match actor.role {
            ActorRole::Provider => actor.id == request.provider_id,
            ActorRole::Requester => actor.id == request.requester_id,
        };
        if !initiator_matches {
            return Err(SchedulingError::Authorization(format!(
                "{} {} cannot request appointments on behalf of another party",
                actor.role, actor.id
            )));
        }

        if let Some(conflict) = self
            .conflicts
            .find_conflict(request.provider_id, request.start_time, request.duration_minutes)
            .await?
        {
            return Err(SchedulingError::slot_unavailable(&conflict));
        }

        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            requester_id: request.requester_id,
            title: title.to_string(),
            description: normalize(request.description),
            start_time: request.start_time,
            duration_minutes: request.duration_minutes,
            location: normalize(request.location),
            status: lifecycle::initial_status(actor.role),
            cancellation_reason: None,
            requester_role: actor.role,
            created_at: Utc::now(),
        };

        let appointment = self.appointments.reserve(appointment).await?;
        info!(
            appointment_id = %appointment.id,
            provider_id = %appointment.provider_id,
            start_time = %appointment.start_time,
            status = %appointment.status,
            "Appointment requested"
        );

        Ok(appointment)
    }

    /// Applies `action` on behalf of `actor`, who must be a party to the
    /// appointment.
    pub async fn change_status(
        &self,
        appointment_id: Uuid,
        actor: &Actor,
        action: AppointmentAction,
        reason: Option<String>,
    ) -> SchedulingResult<Appointment> {
        let appointment = self.load(appointment_id).await?;
        ensure_party(actor, &appointment)?;

        let transition = lifecycle::find_transition(appointment.status, actor.role, action)?;
        let reason = if transition.records_reason() {
            normalize(reason)
        } else {
            None
        };

        let updated = match self
            .appointments
            .transition(appointment_id, transition.from, transition.to, reason)
            .await?
        {
            Some(updated) => updated,
            None => {
                // Lost a race with another status change; report what is there now.
                let current = self.load(appointment_id).await?;
                warn!(
                    %appointment_id,
                    expected = %transition.from,
                    found = %current.status,
                    "Appointment changed concurrently"
                );
                return Err(SchedulingError::invalid_transition(current.status, actor.role, action));
            }
        };

        info!(
            %appointment_id,
            actor_id = %actor.id,
            %action,
            from = %transition.from,
            to = %transition.to,
            "Appointment status changed"
        );
        self.dispatch_notification(appointment_id, transition.from, transition.to);

        Ok(updated)
    }

    fn dispatch_notification(
        &self,
        appointment_id: Uuid,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(appointment_id, old_status, new_status).await {
                warn!(%appointment_id, error = %e, "Failed to deliver status change notification");
            }
        });
    }

    /// Creates or replaces the provider's rule for `weekday`.
    pub async fn set_availability(
        &self,
        actor: &Actor,
        provider_id: Uuid,
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
        is_available: bool,
    ) -> SchedulingResult<AvailabilityRule> {
        if actor.role != ActorRole::Provider || actor.id != provider_id {
            return Err(SchedulingError::Authorization(
                "only the provider may change their own availability".to_string(),
            ));
        }

        let rule = AvailabilityRule::new(provider_id, weekday, start_time, end_time, is_available)?;
        let rule = self.availability.upsert_rule(rule).await?;
        info!(
            %provider_id,
            weekday,
            start_time = %rule.start_time,
            end_time = %rule.end_time,
            is_available,
            "Availability rule saved"
        );
        Ok(rule)
    }

    pub async fn get_availability(&self, provider_id: Uuid) -> SchedulingResult<Vec<AvailabilityRule>> {
        self.availability.get_rules(provider_id).await
    }

    /// Bookable slots of `provider_id` on `date`.
    pub async fn available_slots(&self, provider_id: Uuid, date: NaiveDate) -> SchedulingResult<SlotSequence> {
        self.slots.slots_for(provider_id, date).await
    }

    /// Dates from today on whose weekday the provider is available.
    pub async fn available_dates(
        &self,
        provider_id: Uuid,
        window_days: Option<u32>,
    ) -> SchedulingResult<Vec<NaiveDate>> {
        self.calendar
            .available_dates(
                provider_id,
                window_days.unwrap_or(DEFAULT_WINDOW_DAYS),
                self.clock.today(),
            )
            .await
    }

    async fn load(&self, id: Uuid) -> SchedulingResult<Appointment> {
        self.appointments
            .get_appointment(id)
            .await?
            .ok_or_else(|| SchedulingError::NotFound(format!("Appointment with ID {} not found", id)))
    }
}

fn ensure_party(actor: &Actor, appointment: &Appointment) -> SchedulingResult<()> {
    if appointment.is_party(actor) {
        Ok(())
    } else {
        Err(SchedulingError::Authorization(format!(
            "{} {} is not a party to appointment {}",
            actor.role, actor.id, appointment.id
        )))
    }
}

fn normalize(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
