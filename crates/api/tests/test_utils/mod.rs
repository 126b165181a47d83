#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use careslot_api::{ApiState, app};
use careslot_core::{
    models::appointment::Actor,
    ports::{FixedClock, LoggingNotifier, StaticProfiles},
    service::SchedulingService,
    store::InMemoryStore,
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

/// Saturday 2025-03-01 08:00; the following Monday is 2025-03-03.
pub fn now() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

pub struct TestContext {
    pub app: Router,
    pub provider: Actor,
    pub requester: Actor,
}

impl TestContext {
    pub fn new() -> Self {
        let provider = Actor::provider(Uuid::new_v4());
        let requester = Actor::requester(Uuid::new_v4());

        let profiles = StaticProfiles::new([
            (provider.id, "Dr. Rivera"),
            (requester.id, "Sam Patel"),
        ]);

        let service = SchedulingService::with_store(
            Arc::new(InMemoryStore::new()),
            Arc::new(profiles),
            Arc::new(LoggingNotifier),
            Arc::new(FixedClock(now())),
        );

        Self {
            app: app(Arc::new(ApiState::new(service))),
            provider,
            requester,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, body)
    }

    /// Gives the provider a Monday 09:00-17:00 rule.
    pub async fn open_mondays(&self) {
        let (status, _) = self
            .send(request(
                Method::PUT,
                &format!("/api/providers/{}/availability/1", self.provider.id),
                Some(&self.provider),
                Some(json!({ "start_time": "09:00:00", "end_time": "17:00:00" })),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Requests a 30 minute appointment on Monday 2025-03-03 as the requester.
    pub async fn book_monday(&self, time: &str) -> (StatusCode, Value) {
        self.send(request(
            Method::POST,
            "/api/appointments",
            Some(&self.requester),
            Some(json!({
                "provider_id": self.provider.id,
                "requester_id": self.requester.id,
                "title": "Annual check-up",
                "start_time": format!("2025-03-03T{}", time),
            })),
        ))
        .await
    }
}

pub fn request(method: Method, uri: &str, actor: Option<&Actor>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(actor) = actor {
        builder = builder
            .header("x-actor-id", actor.id.to_string())
            .header("x-actor-role", actor.role.as_str());
    }

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
