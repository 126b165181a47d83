use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use careslot_core::{
    errors::SchedulingError,
    mock::{MockNotifier, MockProfileLookup},
    models::appointment::{
        Actor, Appointment, AppointmentAction, AppointmentRequest, AppointmentStatus,
    },
    ports::{FixedClock, LoggingNotifier, Notifier, StaticProfiles},
    service::{SchedulingService, UNKNOWN_PARTY_NAME},
    store::InMemoryStore,
};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pretty_assertions::assert_eq;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

type StatusEvent = (Uuid, AppointmentStatus, AppointmentStatus);

struct ChannelNotifier(mpsc::UnboundedSender<StatusEvent>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(
        &self,
        appointment_id: Uuid,
        old_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> eyre::Result<()> {
        self.0
            .send((appointment_id, old_status, new_status))
            .map_err(|e| eyre::eyre!("notification channel closed: {}", e))
    }
}

fn t(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn monday_at(hour: u32, minute: u32) -> NaiveDateTime {
    monday().and_time(t(hour, minute))
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_time(t(8, 0))
}

struct TestContext {
    service: SchedulingService,
    provider: Actor,
    requester: Actor,
}

impl TestContext {
    fn with_notifier(notifier: Arc<dyn Notifier>) -> Self {
        let service = SchedulingService::with_store(
            Arc::new(InMemoryStore::new()),
            Arc::new(StaticProfiles::default()),
            notifier,
            Arc::new(FixedClock(now())),
        );

        Self {
            service,
            provider: Actor::provider(Uuid::new_v4()),
            requester: Actor::requester(Uuid::new_v4()),
        }
    }

    fn new() -> Self {
        Self::with_notifier(Arc::new(LoggingNotifier))
    }

    async fn open_monday_morning(&self) {
        self.service
            .set_availability(&self.provider, self.provider.id, 1, t(9, 0), t(12, 0), true)
            .await
            .unwrap();
    }

    fn request(&self, start_time: NaiveDateTime) -> AppointmentRequest {
        AppointmentRequest {
            provider_id: self.provider.id,
            requester_id: self.requester.id,
            title: "Annual checkup".to_string(),
            description: None,
            start_time,
            duration_minutes: 30,
            location: Some("Room 4".to_string()),
        }
    }

    async fn book_as_requester(&self, start_time: NaiveDateTime) -> Appointment {
        self.service
            .request_appointment(&self.requester, self.request(start_time))
            .await
            .unwrap()
    }

    async fn slot_at(&self, time: NaiveTime) -> bool {
        self.service
            .available_slots(self.provider.id, monday())
            .await
            .unwrap()
            .iter()
            .find(|slot| slot.time == time)
            .map(|slot| slot.is_available)
            .unwrap()
    }
}

#[tokio::test]
async fn end_to_end_booking_flow() {
    let ctx = TestContext::new();
    ctx.open_monday_morning().await;

    let first = ctx.book_as_requester(monday_at(10, 0)).await;
    assert_eq!(first.status, AppointmentStatus::PendingProviderApproval);
    assert!(!ctx.slot_at(t(10, 0)).await);

    let approved = ctx
        .service
        .change_status(first.id, &ctx.provider, AppointmentAction::Approve, None)
        .await
        .unwrap();
    assert_eq!(approved.status, AppointmentStatus::Scheduled);

    let second_requester = Actor::requester(Uuid::new_v4());
    let mut second = ctx.request(monday_at(10, 0));
    second.requester_id = second_requester.id;
    let err = ctx
        .service
        .request_appointment(&second_requester, second)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "slot_unavailable");
    assert_eq!(err.status(), Some(AppointmentStatus::Scheduled));

    let completed = ctx
        .service
        .change_status(first.id, &ctx.provider, AppointmentAction::Complete, None)
        .await
        .unwrap();
    assert_eq!(completed.status, AppointmentStatus::Completed);
    assert!(ctx.slot_at(t(10, 0)).await);
    assert!(
        ctx.service
            .conflicts()
            .is_free(ctx.provider.id, monday_at(10, 0), 30)
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn provider_initiated_request_waits_on_requester() {
    let ctx = TestContext::new();
    let appointment = ctx
        .service
        .request_appointment(&ctx.provider, ctx.request(monday_at(9, 0)))
        .await
        .unwrap();
    assert_eq!(appointment.status, AppointmentStatus::PendingRequesterApproval);
    assert_eq!(appointment.requester_role, ctx.provider.role);

    let err = ctx
        .service
        .change_status(appointment.id, &ctx.provider, AppointmentAction::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_transition");
    assert_eq!(err.status(), Some(AppointmentStatus::PendingRequesterApproval));

    let declined = ctx
        .service
        .change_status(
            appointment.id,
            &ctx.requester,
            AppointmentAction::Decline,
            Some("  Travelling that week ".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(declined.status, AppointmentStatus::Cancelled);
    assert_eq!(declined.cancellation_reason.as_deref(), Some("Travelling that week"));
}

#[tokio::test]
async fn requester_cannot_approve_own_request() {
    let ctx = TestContext::new();
    let appointment = ctx.book_as_requester(monday_at(9, 30)).await;

    let err = ctx
        .service
        .change_status(appointment.id, &ctx.requester, AppointmentAction::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "invalid_transition");

    let unchanged = ctx.service.get_appointment(&ctx.requester, appointment.id).await.unwrap();
    assert_eq!(unchanged, appointment);
}

#[tokio::test]
async fn terminal_appointments_are_immutable() {
    let ctx = TestContext::new();
    let appointment = ctx.book_as_requester(monday_at(11, 0)).await;
    ctx.service
        .change_status(appointment.id, &ctx.provider, AppointmentAction::Approve, None)
        .await
        .unwrap();
    let cancelled = ctx
        .service
        .change_status(
            appointment.id,
            &ctx.requester,
            AppointmentAction::Cancel,
            Some("Feeling better".to_string()),
        )
        .await
        .unwrap();

    for (actor, action) in [
        (&ctx.provider, AppointmentAction::Approve),
        (&ctx.provider, AppointmentAction::Complete),
        (&ctx.provider, AppointmentAction::Cancel),
        (&ctx.requester, AppointmentAction::Decline),
    ] {
        let err = ctx
            .service
            .change_status(appointment.id, actor, action, Some("again".to_string()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_transition");
        assert_eq!(err.status(), Some(AppointmentStatus::Cancelled));
    }

    let stored = ctx.service.get_appointment(&ctx.provider, appointment.id).await.unwrap();
    assert_eq!(stored, cancelled);
    assert_eq!(stored.cancellation_reason.as_deref(), Some("Feeling better"));
}

#[tokio::test]
async fn reason_is_only_recorded_on_cancellation() {
    let ctx = TestContext::new();
    let appointment = ctx.book_as_requester(monday_at(9, 0)).await;
    let approved = ctx
        .service
        .change_status(
            appointment.id,
            &ctx.provider,
            AppointmentAction::Approve,
            Some("ignored".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(approved.cancellation_reason, None);
}

#[tokio::test]
async fn request_validation() {
    let ctx = TestContext::new();

    let mut blank_title = ctx.request(monday_at(10, 0));
    blank_title.title = "   ".to_string();
    let mut zero_length = ctx.request(monday_at(10, 0));
    zero_length.duration_minutes = 0;
    let past = ctx.request(now() - chrono::Duration::minutes(1));
    let mut self_booking = ctx.request(monday_at(10, 0));
    self_booking.provider_id = ctx.requester.id;

    for request in [blank_title, zero_length, past, self_booking] {
        let err = ctx
            .service
            .request_appointment(&ctx.requester, request)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "validation_error", "{err}");
    }

    // Starting exactly now is allowed.
    ctx.service
        .request_appointment(&ctx.requester, ctx.request(now()))
        .await
        .unwrap();
}

#[tokio::test]
async fn actors_cannot_act_for_other_parties() {
    let ctx = TestContext::new();
    let outsider = Actor::requester(Uuid::new_v4());

    let err = ctx
        .service
        .request_appointment(&outsider, ctx.request(monday_at(10, 0)))
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Authorization(_)));

    let appointment = ctx.book_as_requester(monday_at(10, 0)).await;
    let err = ctx
        .service
        .change_status(appointment.id, &outsider, AppointmentAction::Cancel, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Authorization(_)));

    let err = ctx
        .service
        .set_availability(&outsider, ctx.provider.id, 1, t(9, 0), t(12, 0), true)
        .await
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Authorization(_)));
}

#[tokio::test]
async fn unknown_appointment_is_not_found() {
    let ctx = TestContext::new();
    let err = ctx
        .service
        .change_status(Uuid::new_v4(), &ctx.provider, AppointmentAction::Approve, None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "not_found");
}

#[tokio::test]
async fn touching_appointments_do_not_conflict() {
    let ctx = TestContext::new();
    ctx.book_as_requester(monday_at(10, 0)).await;
    ctx.book_as_requester(monday_at(10, 30)).await;
    ctx.book_as_requester(monday_at(9, 30)).await;

    let mut overlapping = ctx.request(monday_at(10, 15));
    overlapping.duration_minutes = 10;
    let err = ctx
        .service
        .request_appointment(&ctx.requester, overlapping)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "slot_unavailable");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_for_same_slot_book_exactly_once() {
    let ctx = TestContext::new();
    let attempts = 16;

    let mut handles = Vec::with_capacity(attempts);
    for _ in 0..attempts {
        let service = ctx.service.clone();
        let requester = Actor::requester(Uuid::new_v4());
        let mut request = ctx.request(monday_at(10, 0));
        request.requester_id = requester.id;
        handles.push(tokio::spawn(async move {
            service.request_appointment(&requester, request).await
        }));
    }

    let mut booked = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(SchedulingError::SlotUnavailable { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(booked, 1);
    assert_eq!(rejected, attempts - 1);
    let listed = ctx.service.list_appointments(&ctx.provider).await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn slot_generation_is_deterministic() {
    let ctx = TestContext::new();
    ctx.open_monday_morning().await;
    ctx.book_as_requester(monday_at(9, 30)).await;

    let first = ctx.service.available_slots(ctx.provider.id, monday()).await.unwrap().to_vec();
    let second = ctx.service.available_slots(ctx.provider.id, monday()).await.unwrap().to_vec();
    assert_eq!(first, second);

    let times: Vec<_> = first.iter().map(|slot| slot.time).collect();
    assert_eq!(
        times,
        vec![t(9, 0), t(9, 30), t(10, 0), t(10, 30), t(11, 0), t(11, 30)]
    );
    let booked: Vec<_> = first.iter().filter(|slot| !slot.is_available).map(|slot| slot.time).collect();
    assert_eq!(booked, vec![t(9, 30)]);
}

#[tokio::test]
async fn slots_agree_with_conflict_checker_when_window_ends_off_step() {
    let ctx = TestContext::new();
    ctx.service
        .set_availability(&ctx.provider, ctx.provider.id, 1, t(9, 0), t(9, 45), true)
        .await
        .unwrap();
    ctx.book_as_requester(monday_at(9, 45)).await;

    let slots = ctx
        .service
        .available_slots(ctx.provider.id, monday())
        .await
        .unwrap()
        .to_vec();
    let times: Vec<NaiveTime> = slots.iter().map(|slot| slot.time).collect();
    assert_eq!(times, vec![t(9, 0), t(9, 30)]);

    for slot in &slots {
        let free = ctx
            .service
            .conflicts()
            .is_free(ctx.provider.id, monday().and_time(slot.time), 30)
            .await
            .unwrap();
        assert_eq!(slot.is_available, free, "slot at {}", slot.time);
    }
    assert!(slots[0].is_available);
    assert!(!slots[1].is_available);
}

#[tokio::test]
async fn disabled_or_missing_rule_yields_no_slots() {
    let ctx = TestContext::new();
    assert_eq!(ctx.service.available_slots(ctx.provider.id, monday()).await.unwrap().iter().count(), 0);

    ctx.service
        .set_availability(&ctx.provider, ctx.provider.id, 1, t(9, 0), t(12, 0), false)
        .await
        .unwrap();
    assert_eq!(ctx.service.available_slots(ctx.provider.id, monday()).await.unwrap().iter().count(), 0);

    let tuesday = monday().succ_opt().unwrap();
    ctx.open_monday_morning().await;
    assert_eq!(ctx.service.available_slots(ctx.provider.id, tuesday).await.unwrap().iter().count(), 0);
}

#[tokio::test]
async fn set_availability_upserts_one_rule_per_weekday() {
    let ctx = TestContext::new();
    ctx.open_monday_morning().await;
    ctx.service
        .set_availability(&ctx.provider, ctx.provider.id, 1, t(13, 0), t(17, 0), true)
        .await
        .unwrap();

    let rules = ctx.service.get_availability(ctx.provider.id).await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!((rules[0].start_time, rules[0].end_time), (t(13, 0), t(17, 0)));

    let err = ctx
        .service
        .set_availability(&ctx.provider, ctx.provider.id, 2, t(17, 0), t(9, 0), true)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "validation_error");
}

#[tokio::test]
async fn calendar_reports_weekday_matches_even_when_booked() {
    let ctx = TestContext::new();
    ctx.open_monday_morning().await;
    for hour in 9..12 {
        ctx.book_as_requester(monday_at(hour, 0)).await;
        ctx.book_as_requester(monday_at(hour, 30)).await;
    }

    // Today is Saturday 2025-03-01.
    let dates = ctx.service.available_dates(ctx.provider.id, Some(14)).await.unwrap();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        ]
    );
    assert!(
        ctx.service
            .available_slots(ctx.provider.id, monday())
            .await
            .unwrap()
            .iter()
            .all(|slot| !slot.is_available)
    );

    let default_window = ctx.service.available_dates(ctx.provider.id, None).await.unwrap();
    assert_eq!(default_window.len(), 4);
}

#[tokio::test]
async fn listing_is_ordered_and_names_the_counterparty() {
    let provider = Actor::provider(Uuid::new_v4());
    let requester = Actor::requester(Uuid::new_v4());
    let stranger = Actor::requester(Uuid::new_v4());

    let names = HashMap::from([
        (provider.id, "Dr. Okafor".to_string()),
        (requester.id, "Sam Lee".to_string()),
    ]);
    let mut profiles = MockProfileLookup::new();
    profiles
        .expect_display_name()
        .returning(move |id| Ok(names.get(&id).cloned()));

    let service = SchedulingService::with_store(
        Arc::new(InMemoryStore::new()),
        Arc::new(profiles),
        Arc::new(LoggingNotifier),
        Arc::new(FixedClock(now())),
    );

    for (who, hour) in [(requester, 11), (stranger, 9), (requester, 10)] {
        service
            .request_appointment(
                &who,
                AppointmentRequest {
                    provider_id: provider.id,
                    requester_id: who.id,
                    title: "Consultation".to_string(),
                    description: None,
                    start_time: monday_at(hour, 0),
                    duration_minutes: 30,
                    location: None,
                },
            )
            .await
            .unwrap();
    }

    let for_provider = service.list_appointments(&provider).await.unwrap();
    let summary: Vec<_> = for_provider
        .iter()
        .map(|view| (view.appointment.start_time, view.counterparty_name.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (monday_at(9, 0), UNKNOWN_PARTY_NAME),
            (monday_at(10, 0), "Sam Lee"),
            (monday_at(11, 0), "Sam Lee"),
        ]
    );

    let for_requester = service.list_appointments(&requester).await.unwrap();
    assert_eq!(for_requester.len(), 2);
    assert!(for_requester.iter().all(|view| view.counterparty_name == "Dr. Okafor"));
}

#[tokio::test]
async fn transitions_are_reported_to_the_notifier() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let ctx = TestContext::with_notifier(Arc::new(ChannelNotifier(tx)));
    let appointment = ctx.book_as_requester(monday_at(10, 0)).await;

    ctx.service
        .change_status(appointment.id, &ctx.provider, AppointmentAction::Approve, None)
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("notification was not delivered")
        .unwrap();
    assert_eq!(
        event,
        (
            appointment.id,
            AppointmentStatus::PendingProviderApproval,
            AppointmentStatus::Scheduled
        )
    );
}

#[test_log::test(tokio::test)]
async fn notifier_failure_does_not_undo_transition() {
    let (called_tx, called_rx) = oneshot::channel();
    let called_tx = Mutex::new(Some(called_tx));
    let mut notifier = MockNotifier::new();
    notifier
        .expect_notify()
        .times(1)
        .returning(move |_, _, _| {
            if let Some(tx) = called_tx.lock().unwrap().take() {
                let _ = tx.send(());
            }
            Err(eyre::eyre!("notification gateway unavailable"))
        });
    let ctx = TestContext::with_notifier(Arc::new(notifier));
    let appointment = ctx.book_as_requester(monday_at(10, 0)).await;

    let approved = ctx
        .service
        .change_status(appointment.id, &ctx.provider, AppointmentAction::Approve, None)
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), called_rx)
        .await
        .expect("notifier was not called")
        .unwrap();

    let stored = ctx.service.get_appointment(&ctx.provider, appointment.id).await.unwrap();
    assert_eq!(approved.status, AppointmentStatus::Scheduled);
    assert_eq!(stored.status, AppointmentStatus::Scheduled);
}
