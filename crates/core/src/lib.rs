//! # CareSlot Core
//!
//! Appointment scheduling for provider/requester collaboration: weekly
//! availability rules, 30-minute slot generation, double-booking prevention
//! and the role-gated approval workflow.
//!
//! Storage and the surrounding portal (profiles, notifications, the clock)
//! are reached through the traits in [`ports`], so the same
//! [`service::SchedulingService`] runs over Postgres in production and over
//! [`store::InMemoryStore`] in tests.

pub mod calendar;
pub mod conflict;
pub mod errors;
pub mod lifecycle;
pub mod mock;
pub mod models;
pub mod ports;
pub mod service;
pub mod slots;
pub mod store;
