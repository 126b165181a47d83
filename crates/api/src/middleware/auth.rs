//! # Authentication Module
//!
//! Resolves the calling actor from headers set by the identity layer in
//! front of the API. Credentials are verified upstream; this module only
//! parses what was forwarded.
//!
//! - `X-Actor-Id`: UUID of the provider or requester
//! - `X-Actor-Role`: `provider` or `requester`

use axum::{extract::FromRequestParts, http::request::Parts};
use careslot_core::{
    errors::SchedulingError,
    models::appointment::{Actor, ActorRole},
};
use uuid::Uuid;

use crate::middleware::error_handling::AppError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// Extractor for the authenticated actor of a request.
///
/// # Example
///
/// ```ignore
/// async fn whoami(AuthenticatedActor(actor): AuthenticatedActor) -> String {
///     format!("{} ({})", actor.id, actor.role)
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Result<&'a str, SchedulingError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| SchedulingError::Authentication(format!("missing {} header", name)))?
        .to_str()
        .map_err(|_| SchedulingError::Authentication(format!("{} header is not valid text", name)))
}

/// Parses the actor headers of a request.
pub fn actor_from_parts(parts: &Parts) -> Result<Actor, SchedulingError> {
    let id = header(parts, ACTOR_ID_HEADER)?;
    let id = Uuid::parse_str(id.trim())
        .map_err(|_| SchedulingError::Authentication(format!("invalid actor id '{}'", id)))?;

    let role = header(parts, ACTOR_ROLE_HEADER)?
        .parse::<ActorRole>()
        .map_err(SchedulingError::Authentication)?;

    Ok(Actor::new(id, role))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedActor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = actor_from_parts(parts)?;
        tracing::debug!(actor_id = %actor.id, role = %actor.role, "Resolved request actor");
        Ok(AuthenticatedActor(actor))
    }
}
